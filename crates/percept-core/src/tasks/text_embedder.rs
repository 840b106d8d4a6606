//! Text embedding adapter.

use std::sync::Arc;

use crate::engine::{EngineFactory, TextEmbedderEngine};
use crate::error::Result;
use crate::fetch::{FileResolver, FileSource};
use crate::module::ModuleCache;
use crate::tasks::options::{EmbedderConfig, EmbedderOptions};
use crate::tasks::results::Embedding;

/// Produces embedding vectors from free text.
pub struct TextEmbedder<F>
where
    F: EngineFactory<EmbedderConfig>,
{
    module: ModuleCache<F::Module, EmbedderOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
}

impl<F> TextEmbedder<F>
where
    F: EngineFactory<EmbedderConfig>,
    F::Module: TextEmbedderEngine,
{
    const TASK: &'static str = "TextEmbedder";

    pub fn new(resolver: Arc<FileResolver>, factory: Arc<F>) -> Self {
        Self {
            module: ModuleCache::new(Self::TASK),
            resolver,
            factory,
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

    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let module = self.module.require_module().await?;
        let embedding = module
            .embed(text)
            .await
            .map_err(|e| super::inference_error(Self::TASK, e))?;
        Ok(Embedding::from(embedding))
    }
}
