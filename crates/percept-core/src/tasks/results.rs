//! Public result shapes produced by the task adapters.
//!
//! These are one-to-one mappings of the engine's native structures. Order is
//! preserved exactly as the engine returned it; the adapters never re-sort.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::{
    NativeCategory, NativeDetection, NativeEmbedding, NativeHand, NativePoint,
};

/// One scored category. Scores are in `[0,1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub index: i32,
    pub score: f32,
    pub category_name: String,
    pub display_name: Option<String>,
}

impl From<NativeCategory> for Category {
    fn from(native: NativeCategory) -> Self {
        Category {
            index: native.index,
            score: native.score,
            category_name: native.label,
            display_name: native.display_name,
        }
    }
}

/// Result of a classification call (text, image, or audio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub categories: Vec<Category>,
}

impl ClassificationResult {
    pub(crate) fn from_native(categories: Vec<NativeCategory>) -> Self {
        ClassificationResult {
            categories: categories.into_iter().map(Category::from).collect(),
        }
    }
}

/// Axis-aligned bounding box in image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub categories: Vec<Category>,
}

impl From<NativeDetection> for Detection {
    fn from(native: NativeDetection) -> Self {
        Detection {
            bounding_box: BoundingBox {
                origin_x: native.origin_x,
                origin_y: native.origin_y,
                width: native.width,
                height: native.height,
            },
            categories: native.categories.into_iter().map(Category::from).collect(),
        }
    }
}

/// Result of an object detection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

/// One embedding vector. Components are unbounded floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    pub head_index: i32,
    pub head_name: Option<String>,
}

impl From<NativeEmbedding> for Embedding {
    fn from(native: NativeEmbedding) -> Self {
        Embedding {
            values: native.values,
            head_index: native.head_index,
            head_name: native.head_name,
        }
    }
}

/// A point in normalized image space or world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<NativePoint> for Landmark {
    fn from(native: NativePoint) -> Self {
        Landmark {
            x: native.x,
            y: native.y,
            z: native.z,
        }
    }
}

/// Landmarks for one detected hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub handedness: Vec<Category>,
    /// Normalized image-space landmarks, coordinates in `[0,1]`.
    pub landmarks: Vec<Landmark>,
    /// World-space landmarks in meters.
    pub world_landmarks: Vec<Landmark>,
}

impl From<NativeHand> for Hand {
    fn from(native: NativeHand) -> Self {
        Hand {
            handedness: native.handedness.into_iter().map(Category::from).collect(),
            landmarks: native.landmarks.into_iter().map(Landmark::from).collect(),
            world_landmarks: native
                .world_landmarks
                .into_iter()
                .map(Landmark::from)
                .collect(),
        }
    }
}

/// Result of a hand landmarking call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkerResult {
    pub hands: Vec<Hand>,
}

/// One segmentation mask, written to disk rather than returned inline.
///
/// The file holds `width * height` bytes, row-major, one byte per pixel. Its
/// lifetime is the caller's responsibility; the cache directory it lives in
/// is reclaimable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Result of a segmentation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub masks: Vec<SegmentationMask>,
}
