//! Centralized configuration for the Percept library.
//!
//! Network tuning, cache layout, and the per-task option defaults live here
//! as data. Adapters never hard-code a default inline; the option-to-config
//! mapping reads this table so the documented defaults and the applied
//! defaults cannot drift apart.

use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DOWNLOAD_TEMP_SUFFIX: &'static str = ".part";
    pub const USER_AGENT: &'static str = "Percept-Library/1.0";
}

/// Cache directory layout under the resolver's private cache root.
pub struct PathsConfig;

impl PathsConfig {
    pub const MODELS_DIR_NAME: &'static str = "models";
    pub const ASSETS_DIR_NAME: &'static str = "assets";
    pub const MASKS_DIR_NAME: &'static str = "masks";
    pub const CACHE_ROOT_DIR_NAME: &'static str = "percept";
}

/// Defaults applied when a classification option field is absent.
pub struct ClassifierDefaults;

impl ClassifierDefaults {
    /// Unlimited results when unset; the engine returns everything it scored.
    pub const MAX_RESULTS: i32 = -1;
    pub const SCORE_THRESHOLD: f32 = 0.0;
    pub const DISPLAY_NAMES_LOCALE: &'static str = "en";
}

/// Defaults for object detection.
pub struct DetectorDefaults;

impl DetectorDefaults {
    pub const MAX_RESULTS: i32 = -1;
    pub const SCORE_THRESHOLD: f32 = 0.0;
}

/// Defaults for text and image embedding.
pub struct EmbedderDefaults;

impl EmbedderDefaults {
    pub const L2_NORMALIZE: bool = false;
    pub const QUANTIZE: bool = false;
}

/// Defaults for image segmentation.
pub struct SegmenterDefaults;

impl SegmenterDefaults {
    pub const OUTPUT_CATEGORY_MASK: bool = true;
    pub const OUTPUT_CONFIDENCE_MASKS: bool = false;
}

/// Defaults for hand landmarking.
pub struct LandmarkerDefaults;

impl LandmarkerDefaults {
    pub const NUM_HANDS: u32 = 1;
    pub const MIN_DETECTION_CONFIDENCE: f32 = 0.5;
    pub const MIN_PRESENCE_CONFIDENCE: f32 = 0.5;
    pub const MIN_TRACKING_CONFIDENCE: f32 = 0.5;
}

/// Defaults for the LLM engine.
pub struct LlmDefaults;

impl LlmDefaults {
    pub const MAX_TOKENS: u32 = 512;
    pub const MAX_NUM_IMAGES: u32 = 1;
}

/// Defaults for LLM sessions.
pub struct SessionDefaults;

impl SessionDefaults {
    pub const TEMPERATURE: f32 = 0.8;
    pub const TOP_K: u32 = 40;
    pub const TOP_P: f32 = 1.0;
    pub const RANDOM_SEED: u64 = 0;
}

/// Image input normalization limits.
pub struct ImageDefaults;

impl ImageDefaults {
    /// Frames wider or taller than this are subsampled before inference.
    pub const MAX_DIMENSION: u32 = 1024;
}
