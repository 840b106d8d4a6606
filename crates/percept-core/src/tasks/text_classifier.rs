//! Text classification adapter.

use std::sync::Arc;

use crate::engine::{EngineFactory, TextClassifierEngine};
use crate::error::Result;
use crate::fetch::{FileResolver, FileSource};
use crate::module::ModuleCache;
use crate::tasks::options::{ClassifierConfig, ClassifierOptions};
use crate::tasks::results::ClassificationResult;

/// Classifies free text into scored categories.
///
/// The adapter owns a single-slot module cache: `initialize` with the same
/// source and options is a no-op, and a changed configuration tears down the
/// loaded module before building its replacement.
pub struct TextClassifier<F>
where
    F: EngineFactory<ClassifierConfig>,
{
    module: ModuleCache<F::Module, ClassifierOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
}

impl<F> TextClassifier<F>
where
    F: EngineFactory<ClassifierConfig>,
    F::Module: TextClassifierEngine,
{
    const TASK: &'static str = "TextClassifier";

    pub fn new(resolver: Arc<FileResolver>, factory: Arc<F>) -> Self {
        Self {
            module: ModuleCache::new(Self::TASK),
            resolver,
            factory,
        }
    }

    /// Load (or reuse) the classifier model described by `source`.
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

    /// Release the loaded module, if any.
    pub async fn unload(&self) {
        self.module.unload().await;
    }

    /// Classify `text`. Categories arrive in the order the engine produced
    /// them, already filtered and truncated per the configured options.
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let module = self.module.require_module().await?;
        let categories = module
            .classify(text)
            .await
            .map_err(|e| super::inference_error(Self::TASK, e))?;
        Ok(ClassificationResult::from_native(categories))
    }
}
