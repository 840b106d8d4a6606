//! Audio classification adapter.

use std::sync::Arc;

use crate::engine::{AudioClassifierEngine, EngineFactory};
use crate::error::Result;
use crate::fetch::{FileResolver, FileSource};
use crate::media::MediaDecoder;
use crate::module::ModuleCache;
use crate::tasks::options::{ClassifierConfig, ClassifierOptions};
use crate::tasks::results::ClassificationResult;

/// Classifies audio clips into scored categories.
pub struct AudioClassifier<F>
where
    F: EngineFactory<ClassifierConfig>,
{
    module: ModuleCache<F::Module, ClassifierOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
    decoder: Arc<dyn MediaDecoder>,
}

impl<F> AudioClassifier<F>
where
    F: EngineFactory<ClassifierConfig>,
    F::Module: AudioClassifierEngine,
{
    const TASK: &'static str = "AudioClassifier";

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

    /// Classify the clip at `audio`, decoded to interleaved float PCM first.
    pub async fn classify(&self, audio: &FileSource) -> Result<ClassificationResult> {
        let module = self.module.require_module().await?;
        let buffer = super::load_audio(&self.resolver, &*self.decoder, Self::TASK, audio).await?;
        let categories = module
            .classify(&buffer)
            .await
            .map_err(|e| super::inference_error(Self::TASK, e))?;
        Ok(ClassificationResult::from_native(categories))
    }
}
