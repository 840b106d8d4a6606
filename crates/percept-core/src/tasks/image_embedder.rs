//! Image embedding adapter.

use std::sync::Arc;

use crate::engine::{EngineFactory, ImageEmbedderEngine};
use crate::error::Result;
use crate::fetch::{FileResolver, FileSource};
use crate::media::MediaDecoder;
use crate::module::ModuleCache;
use crate::tasks::options::{EmbedderConfig, EmbedderOptions};
use crate::tasks::results::Embedding;

/// Produces embedding vectors from still images.
pub struct ImageEmbedder<F>
where
    F: EngineFactory<EmbedderConfig>,
{
    module: ModuleCache<F::Module, EmbedderOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
    decoder: Arc<dyn MediaDecoder>,
}

impl<F> ImageEmbedder<F>
where
    F: EngineFactory<EmbedderConfig>,
    F::Module: ImageEmbedderEngine,
{
    const TASK: &'static str = "ImageEmbedder";

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

    pub async fn initialize(&self, source: FileSource, options: EmbedderOptions) -> Result<()> {
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

    pub async fn embed(&self, image: &FileSource) -> Result<Embedding> {
        let module = self.module.require_module().await?;
        let frame =
            super::load_normalized_frame(&self.resolver, &*self.decoder, Self::TASK, image)
                .await?;
        let embedding = module
            .embed(&frame)
            .await
            .map_err(|e| super::inference_error(Self::TASK, e))?;
        Ok(Embedding::from(embedding))
    }
}
