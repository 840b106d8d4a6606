//! Image classification adapter.

use std::sync::Arc;

use crate::engine::{EngineFactory, ImageClassifierEngine};
use crate::error::Result;
use crate::fetch::{FileResolver, FileSource};
use crate::media::MediaDecoder;
use crate::module::ModuleCache;
use crate::tasks::options::{ClassifierConfig, ClassifierOptions};
use crate::tasks::results::ClassificationResult;

/// Classifies still images into scored categories.
pub struct ImageClassifier<F>
where
    F: EngineFactory<ClassifierConfig>,
{
    module: ModuleCache<F::Module, ClassifierOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
    decoder: Arc<dyn MediaDecoder>,
}

impl<F> ImageClassifier<F>
where
    F: EngineFactory<ClassifierConfig>,
    F::Module: ImageClassifierEngine,
{
    const TASK: &'static str = "ImageClassifier";

    pub fn new(
        resolver: Arc<FileResolver>,
        factory: Arc<F>,
        decoder: Arc<dyn MediaDecoder>,
    ) -> Self {
        Self {
            module: ModuleCache::new(Self::TASK),
            resolver,
            factory,
            decoder,
        }
    }

    pub async fn initialize(
        &self,
        source: FileSource,
        options: ClassifierOptions,
    ) -> Result<()> {
        let factory = self.factory.clone();
        self.module
            .initialize_with_caching(&self.resolver, source, options, move |path, options| {
                async move {
                    factory
                        .create_from_options(&path, &options.resolved())
                        .await
                }
            })
            .await
    }

    pub async fn unload(&self) {
        self.module.unload().await;
    }

    /// Classify the image at `image`. Oversized frames are subsampled before
    /// reaching the engine.
    pub async fn classify(&self, image: &FileSource) -> Result<ClassificationResult> {
        let module = self.module.require_module().await?;
        let frame =
            super::load_normalized_frame(&self.resolver, &*self.decoder, Self::TASK, image)
                .await?;
        let categories = module
            .classify(&frame)
            .await
            .map_err(|e| super::inference_error(Self::TASK, e))?;
        Ok(ClassificationResult::from_native(categories))
    }
}
