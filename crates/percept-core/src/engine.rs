//! The inference engine collaborator boundary.
//!
//! Percept does not implement inference. Every task adapter is generic over a
//! factory supplied by the integrator, which builds an opaque engine module
//! from a resolved model path and a fully-populated config. The traits here
//! are the entire contract: construction, task-specific inference calls, and
//! explicit release.
//!
//! Native result types mirror what an engine hands back. Adapters map them
//! into the public result shapes without re-ordering.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::media::{AudioBuffer, ImageFrame};

/// A loaded native task handle.
///
/// Release is explicit and called exactly once by the owning module cache
/// (or session). Implementations must tolerate inference calls racing a
/// release only to the extent of failing cleanly; callers are documented to
/// drain in-flight work before unloading.
#[async_trait]
pub trait EngineModule: Send + Sync + 'static {
    async fn release(&self) -> Result<()>;
}

/// Builds engine modules from a resolved model file and a task config.
#[async_trait]
pub trait EngineFactory<C>: Send + Sync + 'static {
    type Module: EngineModule;

    async fn create_from_options(&self, model_path: &Path, config: &C) -> Result<Self::Module>;
}

// Native result structures, as returned by engines.

#[derive(Debug, Clone)]
pub struct NativeCategory {
    pub index: i32,
    pub score: f32,
    pub label: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NativeDetection {
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    pub categories: Vec<NativeCategory>,
}

#[derive(Debug, Clone)]
pub struct NativeEmbedding {
    pub values: Vec<f32>,
    pub head_index: i32,
    pub head_name: Option<String>,
}

/// A single-channel raster mask, one byte per pixel.
#[derive(Debug, Clone)]
pub struct NativeMask {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct NativePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone)]
pub struct NativeHand {
    pub handedness: Vec<NativeCategory>,
    /// Image-space landmarks, normalized to `[0,1]`.
    pub landmarks: Vec<NativePoint>,
    /// Real-world landmarks in meters, origin at the hand's geometric center.
    pub world_landmarks: Vec<NativePoint>,
}

// Per-task inference capabilities.

#[async_trait]
pub trait TextClassifierEngine: EngineModule {
    async fn classify(&self, text: &str) -> Result<Vec<NativeCategory>>;
}

#[async_trait]
pub trait ImageClassifierEngine: EngineModule {
    async fn classify(&self, frame: &ImageFrame) -> Result<Vec<NativeCategory>>;
}

#[async_trait]
pub trait AudioClassifierEngine: EngineModule {
    async fn classify(&self, audio: &AudioBuffer) -> Result<Vec<NativeCategory>>;
}

#[async_trait]
pub trait ObjectDetectorEngine: EngineModule {
    async fn detect(&self, frame: &ImageFrame) -> Result<Vec<NativeDetection>>;
}

#[async_trait]
pub trait TextEmbedderEngine: EngineModule {
    async fn embed(&self, text: &str) -> Result<NativeEmbedding>;
}

#[async_trait]
pub trait ImageEmbedderEngine: EngineModule {
    async fn embed(&self, frame: &ImageFrame) -> Result<NativeEmbedding>;
}

#[async_trait]
pub trait ImageSegmenterEngine: EngineModule {
    async fn segment(&self, frame: &ImageFrame) -> Result<Vec<NativeMask>>;
}

#[async_trait]
pub trait HandLandmarkerEngine: EngineModule {
    async fn detect(&self, frame: &ImageFrame) -> Result<Vec<NativeHand>>;
}
