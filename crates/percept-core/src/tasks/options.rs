//! Task option records and their resolved engine configs.
//!
//! Options are what callers hand in: every field optional, compared
//! structurally by the module cache to detect no-op re-initialization.
//! Configs are what factories receive: every field populated, defaults drawn
//! from the tables in [`crate::config`]. `resolved()` is the only place that
//! mapping happens.

use serde::{Deserialize, Serialize};

use crate::config::{
    ClassifierDefaults, DetectorDefaults, EmbedderDefaults, LandmarkerDefaults, SegmenterDefaults,
};

/// Which compute unit the engine should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    #[default]
    Cpu,
    Gpu,
}

/// How inputs arrive at a vision task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningMode {
    #[default]
    Image,
    Video,
    LiveStream,
}

/// Options shared by the text, image, and audio classifiers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifierOptions {
    pub max_results: Option<i32>,
    pub score_threshold: Option<f32>,
    pub category_allowlist: Option<Vec<String>>,
    pub category_denylist: Option<Vec<String>>,
    pub display_names_locale: Option<String>,
    pub delegate: Option<Delegate>,
    pub running_mode: Option<RunningMode>,
}

/// Fully-populated classifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub max_results: i32,
    pub score_threshold: f32,
    pub category_allowlist: Vec<String>,
    pub category_denylist: Vec<String>,
    pub display_names_locale: String,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
}

impl ClassifierOptions {
    pub fn resolved(&self) -> ClassifierConfig {
        ClassifierConfig {
            max_results: self.max_results.unwrap_or(ClassifierDefaults::MAX_RESULTS),
            score_threshold: self
                .score_threshold
                .unwrap_or(ClassifierDefaults::SCORE_THRESHOLD),
            category_allowlist: self.category_allowlist.clone().unwrap_or_default(),
            category_denylist: self.category_denylist.clone().unwrap_or_default(),
            display_names_locale: self
                .display_names_locale
                .clone()
                .unwrap_or_else(|| ClassifierDefaults::DISPLAY_NAMES_LOCALE.to_string()),
            delegate: self.delegate.unwrap_or_default(),
            running_mode: self.running_mode.unwrap_or_default(),
        }
    }
}

/// Options for object detection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectorOptions {
    pub max_results: Option<i32>,
    pub score_threshold: Option<f32>,
    pub category_allowlist: Option<Vec<String>>,
    pub category_denylist: Option<Vec<String>>,
    pub delegate: Option<Delegate>,
    pub running_mode: Option<RunningMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub max_results: i32,
    pub score_threshold: f32,
    pub category_allowlist: Vec<String>,
    pub category_denylist: Vec<String>,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
}

impl DetectorOptions {
    pub fn resolved(&self) -> DetectorConfig {
        DetectorConfig {
            max_results: self.max_results.unwrap_or(DetectorDefaults::MAX_RESULTS),
            score_threshold: self
                .score_threshold
                .unwrap_or(DetectorDefaults::SCORE_THRESHOLD),
            category_allowlist: self.category_allowlist.clone().unwrap_or_default(),
            category_denylist: self.category_denylist.clone().unwrap_or_default(),
            delegate: self.delegate.unwrap_or_default(),
            running_mode: self.running_mode.unwrap_or_default(),
        }
    }
}

/// Options for text and image embedding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbedderOptions {
    /// L2-normalize the returned vector.
    pub l2_normalize: Option<bool>,
    /// Quantize the returned vector to bytes via scalar quantization.
    pub quantize: Option<bool>,
    pub delegate: Option<Delegate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    pub l2_normalize: bool,
    pub quantize: bool,
    pub delegate: Delegate,
}

impl EmbedderOptions {
    pub fn resolved(&self) -> EmbedderConfig {
        EmbedderConfig {
            l2_normalize: self.l2_normalize.unwrap_or(EmbedderDefaults::L2_NORMALIZE),
            quantize: self.quantize.unwrap_or(EmbedderDefaults::QUANTIZE),
            delegate: self.delegate.unwrap_or_default(),
        }
    }
}

/// Options for image segmentation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmenterOptions {
    pub output_category_mask: Option<bool>,
    pub output_confidence_masks: Option<bool>,
    pub delegate: Option<Delegate>,
    pub running_mode: Option<RunningMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    pub output_category_mask: bool,
    pub output_confidence_masks: bool,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
}

impl SegmenterOptions {
    pub fn resolved(&self) -> SegmenterConfig {
        SegmenterConfig {
            output_category_mask: self
                .output_category_mask
                .unwrap_or(SegmenterDefaults::OUTPUT_CATEGORY_MASK),
            output_confidence_masks: self
                .output_confidence_masks
                .unwrap_or(SegmenterDefaults::OUTPUT_CONFIDENCE_MASKS),
            delegate: self.delegate.unwrap_or_default(),
            running_mode: self.running_mode.unwrap_or_default(),
        }
    }
}

/// Options for hand landmarking.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkerOptions {
    pub num_hands: Option<u32>,
    pub min_detection_confidence: Option<f32>,
    pub min_presence_confidence: Option<f32>,
    pub min_tracking_confidence: Option<f32>,
    pub delegate: Option<Delegate>,
    pub running_mode: Option<RunningMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkerConfig {
    pub num_hands: u32,
    pub min_detection_confidence: f32,
    pub min_presence_confidence: f32,
    pub min_tracking_confidence: f32,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
}

impl LandmarkerOptions {
    pub fn resolved(&self) -> LandmarkerConfig {
        LandmarkerConfig {
            num_hands: self.num_hands.unwrap_or(LandmarkerDefaults::NUM_HANDS),
            min_detection_confidence: self
                .min_detection_confidence
                .unwrap_or(LandmarkerDefaults::MIN_DETECTION_CONFIDENCE),
            min_presence_confidence: self
                .min_presence_confidence
                .unwrap_or(LandmarkerDefaults::MIN_PRESENCE_CONFIDENCE),
            min_tracking_confidence: self
                .min_tracking_confidence
                .unwrap_or(LandmarkerDefaults::MIN_TRACKING_CONFIDENCE),
            delegate: self.delegate.unwrap_or_default(),
            running_mode: self.running_mode.unwrap_or_default(),
        }
    }
}
