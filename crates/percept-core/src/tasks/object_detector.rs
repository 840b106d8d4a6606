//! Object detection adapter.

use std::sync::Arc;

use crate::engine::{EngineFactory, ObjectDetectorEngine};
use crate::error::Result;
use crate::fetch::{FileResolver, FileSource};
use crate::media::MediaDecoder;
use crate::module::ModuleCache;
use crate::tasks::options::{DetectorConfig, DetectorOptions};
use crate::tasks::results::{Detection, DetectionResult};

/// Locates objects in still images, returning bounding boxes with scored
/// categories.
pub struct ObjectDetector<F>
where
    F: EngineFactory<DetectorConfig>,
{
    module: ModuleCache<F::Module, DetectorOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
    decoder: Arc<dyn MediaDecoder>,
}

impl<F> ObjectDetector<F>
where
    F: EngineFactory<DetectorConfig>,
    F::Module: ObjectDetectorEngine,
{
    const TASK: &'static str = "ObjectDetector";

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

    pub async fn initialize(&self, source: FileSource, options: DetectorOptions) -> Result<()> {
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

    /// Detect objects in the image at `image`. Box coordinates are in the
    /// (possibly subsampled) frame handed to the engine.
    pub async fn detect(&self, image: &FileSource) -> Result<DetectionResult> {
        let module = self.module.require_module().await?;
        let frame =
            super::load_normalized_frame(&self.resolver, &*self.decoder, Self::TASK, image)
                .await?;
        let detections = module
            .detect(&frame)
            .await
            .map_err(|e| super::inference_error(Self::TASK, e))?;
        Ok(DetectionResult {
            detections: detections.into_iter().map(Detection::from).collect(),
        })
    }
}
