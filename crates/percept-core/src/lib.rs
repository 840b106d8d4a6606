//! Percept Core - Headless library for on-device inference task lifecycle.
//!
//! This crate manages everything around an on-device inference engine except
//! the inference itself: resolving model and asset sources to local files
//! (with download and copy caching), caching at most one loaded engine
//! module per task adapter, and LLM session state. The engine is supplied by
//! the integrator behind the traits in [`engine`].
//!
//! # Example
//!
//! ```rust,ignore
//! use percept_library::{FileResolver, FileSource, TextClassifier};
//! use percept_library::tasks::options::ClassifierOptions;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> percept_library::Result<()> {
//!     let resolver = Arc::new(
//!         FileResolver::with_default_cache_root()?.with_bundle_root("./assets"),
//!     );
//!     let classifier = TextClassifier::new(resolver, Arc::new(MyEngineFactory));
//!
//!     classifier
//!         .initialize(
//!             FileSource::bundle("classifier.tflite"),
//!             ClassifierOptions {
//!                 max_results: Some(3),
//!                 ..Default::default()
//!             },
//!         )
//!         .await?;
//!
//!     let result = classifier.classify("hello world").await?;
//!     println!("{} categories", result.categories.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod media;
pub mod module;
pub mod tasks;

// Re-export commonly used types
pub use error::{PerceptError, Result};
pub use fetch::{CachePurpose, FileResolver, FileSource};
pub use llm::{
    GenerationResult, GenerationStats, LlmEngine, LlmOptions, LlmSession, SessionOptions,
};
pub use media::{AudioBuffer, ImageFrame, MediaDecoder};
pub use module::ModuleCache;
pub use tasks::results::{
    BoundingBox, Category, ClassificationResult, Detection, DetectionResult, Embedding, Hand,
    Landmark, LandmarkerResult, SegmentationMask, SegmentationResult,
};
pub use tasks::{
    AudioClassifier, HandLandmarker, ImageClassifier, ImageEmbedder, ImageSegmenter,
    ObjectDetector, TextClassifier, TextEmbedder,
};
