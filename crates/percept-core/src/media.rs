//! Raw media types and input normalization.
//!
//! Engines consume decoded frames and sample buffers, never compressed
//! files. Decoding is platform work and lives behind [`MediaDecoder`], an
//! injected capability like the engine itself. What stays here is the
//! normalization the adapters own: subsampling oversized frames down to the
//! engine's working resolution.

use async_trait::async_trait;
use std::path::Path;

use crate::config::ImageDefaults;
use crate::error::Result;

/// A decoded raster frame in row-major interleaved layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    /// Interleaved channels per pixel (3 = RGB, 4 = RGBA).
    pub channels: u32,
    pub pixels: Vec<u8>,
}

impl ImageFrame {
    /// The sample stride needed to fit both dimensions under `max_dimension`:
    /// the smallest power of two such that `dim / stride <= max_dimension`.
    pub fn sample_stride_for(width: u32, height: u32, max_dimension: u32) -> u32 {
        let mut stride = 1u32;
        while width.div_ceil(stride) > max_dimension || height.div_ceil(stride) > max_dimension {
            stride *= 2;
        }
        stride
    }

    /// Subsample this frame until both dimensions fit
    /// [`ImageDefaults::MAX_DIMENSION`], preserving aspect ratio.
    ///
    /// Frames that already fit are returned unchanged.
    pub fn downscaled_to_fit(self, max_dimension: u32) -> ImageFrame {
        let stride = Self::sample_stride_for(self.width, self.height, max_dimension);
        if stride == 1 {
            return self;
        }

        let new_width = self.width.div_ceil(stride);
        let new_height = self.height.div_ceil(stride);
        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;

        let mut pixels = Vec::with_capacity(new_width as usize * new_height as usize * channels);
        for y in 0..new_height {
            let src_y = (y * stride) as usize;
            for x in 0..new_width {
                let src_x = (x * stride) as usize;
                let offset = src_y * row_len + src_x * channels;
                pixels.extend_from_slice(&self.pixels[offset..offset + channels]);
            }
        }

        ImageFrame {
            width: new_width,
            height: new_height,
            channels: self.channels,
            pixels,
        }
    }

    /// Normalize for inference with the default dimension cap.
    pub fn normalized(self) -> ImageFrame {
        self.downscaled_to_fit(ImageDefaults::MAX_DIMENSION)
    }
}

/// Decoded audio samples, interleaved float PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

/// Decodes compressed media files into the raw formats engines expect.
///
/// Implementations typically wrap a platform codec or an external tool; the
/// library itself ships none.
#[async_trait]
pub trait MediaDecoder: Send + Sync + 'static {
    async fn decode_image(&self, path: &Path) -> Result<ImageFrame>;

    async fn decode_audio(&self, path: &Path) -> Result<AudioBuffer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> ImageFrame {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 0]);
            }
        }
        ImageFrame {
            width,
            height,
            channels: 3,
            pixels,
        }
    }

    #[test]
    fn test_stride_is_identity_for_small_frames() {
        assert_eq!(ImageFrame::sample_stride_for(640, 480, 1024), 1);
        assert_eq!(ImageFrame::sample_stride_for(1024, 1024, 1024), 1);
    }

    #[test]
    fn test_stride_doubles_until_fit() {
        assert_eq!(ImageFrame::sample_stride_for(2048, 1024, 1024), 2);
        assert_eq!(ImageFrame::sample_stride_for(4096, 100, 1024), 4);
        assert_eq!(ImageFrame::sample_stride_for(5000, 5000, 1024), 8);
    }

    #[test]
    fn test_downscale_preserves_aspect_ratio() {
        let frame = gradient_frame(4000, 2000);
        let scaled = frame.downscaled_to_fit(1024);
        assert_eq!(scaled.width, 1000);
        assert_eq!(scaled.height, 500);
        assert_eq!(
            scaled.pixels.len(),
            (scaled.width * scaled.height * scaled.channels) as usize
        );
    }

    #[test]
    fn test_downscale_samples_source_pixels() {
        let frame = gradient_frame(2048, 8);
        let scaled = frame.downscaled_to_fit(1024);
        assert_eq!(scaled.width, 1024);
        // Pixel (1, 0) of the scaled frame is source pixel (2, 0).
        let px = &scaled.pixels[3..6];
        assert_eq!(px[0], 2);
    }

    #[test]
    fn test_small_frame_returned_unchanged() {
        let frame = gradient_frame(64, 64);
        let copy = frame.clone();
        assert_eq!(frame.downscaled_to_fit(1024), copy);
    }
}
