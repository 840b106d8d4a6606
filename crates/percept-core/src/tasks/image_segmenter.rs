//! Image segmentation adapter.
//!
//! Masks can be megabytes of raster data; returning them inline would drag
//! large buffers across the host boundary on every call. Instead each mask
//! is written to a freshly created file under the asset cache and returned
//! by path. The files are never deleted here; the cache directory is
//! reclaimable storage and mask lifetime belongs to the caller.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::{EngineFactory, ImageSegmenterEngine};
use crate::error::{PerceptError, Result};
use crate::fetch::{FileResolver, FileSource};
use crate::media::MediaDecoder;
use crate::module::ModuleCache;
use crate::tasks::options::{SegmenterConfig, SegmenterOptions};
use crate::tasks::results::{SegmentationMask, SegmentationResult};

/// Segments still images into per-pixel masks.
pub struct ImageSegmenter<F>
where
    F: EngineFactory<SegmenterConfig>,
{
    module: ModuleCache<F::Module, SegmenterOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
    decoder: Arc<dyn MediaDecoder>,
}

impl<F> ImageSegmenter<F>
where
    F: EngineFactory<SegmenterConfig>,
    F::Module: ImageSegmenterEngine,
{
    const TASK: &'static str = "ImageSegmenter";

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

    pub async fn initialize(&self, source: FileSource, options: SegmenterOptions) -> Result<()> {
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

    /// Segment the image at `image`, writing each returned mask to disk.
    pub async fn segment(&self, image: &FileSource) -> Result<SegmentationResult> {
        let module = self.module.require_module().await?;
        let frame =
            super::load_normalized_frame(&self.resolver, &*self.decoder, Self::TASK, image)
                .await?;
        let native_masks = module
            .segment(&frame)
            .await
            .map_err(|e| super::inference_error(Self::TASK, e))?;

        let masks_dir = self.resolver.masks_dir().await?;
        let mut masks = Vec::with_capacity(native_masks.len());
        for mask in native_masks {
            let path = write_mask(&masks_dir, mask.pixels).await?;
            masks.push(SegmentationMask {
                path,
                width: mask.width,
                height: mask.height,
            });
        }
        Ok(SegmentationResult { masks })
    }
}

/// Write mask bytes to a uniquely named file in `dir` and persist it.
async fn write_mask(dir: &Path, pixels: Vec<u8>) -> Result<PathBuf> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix("mask-")
            .suffix(".bin")
            .tempfile_in(&dir)
            .map_err(|e| PerceptError::io_with_path(e, &dir))?;
        file.write_all(&pixels)
            .map_err(|e| PerceptError::io_with_path(e, &dir))?;
        let (_, path) = file
            .keep()
            .map_err(|e| PerceptError::io_with_path(e.error, &dir))?;
        Ok(path)
    })
    .await
    .map_err(|e| PerceptError::Other(format!("mask writer task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_mask_persists_unique_files() {
        let dir = TempDir::new().unwrap();
        let a = write_mask(dir.path(), vec![1, 2, 3]).await.unwrap();
        let b = write_mask(dir.path(), vec![4, 5, 6]).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).unwrap(), vec![1, 2, 3]);
        assert_eq!(std::fs::read(&b).unwrap(), vec![4, 5, 6]);
    }
}
