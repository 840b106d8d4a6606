//! Task adapters.
//!
//! One adapter per inference capability, all the same shape: `initialize`
//! and `unload` delegate to the adapter's [`ModuleCache`]; the inference
//! method requires the cached module, resolves and normalizes its input,
//! calls the engine, and maps the native result into the public shape.
//!
//! [`ModuleCache`]: crate::module::ModuleCache

pub mod options;
pub mod results;

mod audio_classifier;
mod hand_landmarker;
mod image_classifier;
mod image_embedder;
mod image_segmenter;
mod object_detector;
mod text_classifier;
mod text_embedder;

pub use audio_classifier::AudioClassifier;
pub use hand_landmarker::HandLandmarker;
pub use image_classifier::ImageClassifier;
pub use image_embedder::ImageEmbedder;
pub use image_segmenter::ImageSegmenter;
pub use object_detector::ObjectDetector;
pub use text_classifier::TextClassifier;
pub use text_embedder::TextEmbedder;

use crate::error::{PerceptError, Result};
use crate::fetch::{CachePurpose, FileResolver, FileSource};
use crate::media::{AudioBuffer, ImageFrame, MediaDecoder};

/// Wrap an engine failure as an inference error unless it already carries
/// task context.
fn inference_error(task: &'static str, err: PerceptError) -> PerceptError {
    match err {
        tagged @ (PerceptError::Inference { .. } | PerceptError::NotInitialized { .. }) => tagged,
        other => PerceptError::inference(task, other),
    }
}

/// Resolve an image asset, decode it, and downscale to the engine's working
/// resolution. Resolution failures surface verbatim; decode failures are
/// inference errors for `task`.
async fn load_normalized_frame(
    resolver: &FileResolver,
    decoder: &dyn MediaDecoder,
    task: &'static str,
    image: &FileSource,
) -> Result<ImageFrame> {
    let path = resolver.resolve(image, CachePurpose::Assets).await?;
    let frame = decoder
        .decode_image(&path)
        .await
        .map_err(|e| inference_error(task, e))?;
    Ok(frame.normalized())
}

/// Resolve and decode an audio asset.
async fn load_audio(
    resolver: &FileResolver,
    decoder: &dyn MediaDecoder,
    task: &'static str,
    audio: &FileSource,
) -> Result<AudioBuffer> {
    let path = resolver.resolve(audio, CachePurpose::Assets).await?;
    decoder
        .decode_audio(&path)
        .await
        .map_err(|e| inference_error(task, e))
}
