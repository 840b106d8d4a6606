//! Hand landmarking adapter.

use std::sync::Arc;

use crate::engine::{EngineFactory, HandLandmarkerEngine};
use crate::error::Result;
use crate::fetch::{FileResolver, FileSource};
use crate::media::MediaDecoder;
use crate::module::ModuleCache;
use crate::tasks::options::{LandmarkerConfig, LandmarkerOptions};
use crate::tasks::results::{Hand, LandmarkerResult};

/// Locates hand landmarks in still images.
pub struct HandLandmarker<F>
where
    F: EngineFactory<LandmarkerConfig>,
{
    module: ModuleCache<F::Module, LandmarkerOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
    decoder: Arc<dyn MediaDecoder>,
}

impl<F> HandLandmarker<F>
where
    F: EngineFactory<LandmarkerConfig>,
    F::Module: HandLandmarkerEngine,
{
    const TASK: &'static str = "HandLandmarker";

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

    pub async fn initialize(&self, source: FileSource, options: LandmarkerOptions) -> Result<()> {
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

    /// Detect hands and their landmarks in the image at `image`. Normalized
    /// coordinates are relative to the frame handed to the engine.
    pub async fn detect(&self, image: &FileSource) -> Result<LandmarkerResult> {
        let module = self.module.require_module().await?;
        let frame =
            super::load_normalized_frame(&self.resolver, &*self.decoder, Self::TASK, image)
                .await?;
        let hands = module
            .detect(&frame)
            .await
            .map_err(|e| super::inference_error(Self::TASK, e))?;
        Ok(LandmarkerResult {
            hands: hands.into_iter().map(Hand::from).collect(),
        })
    }
}
