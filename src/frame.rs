use crate::error::{FacewatchError, Result};
use image::{GrayImage, Luma, RgbImage};
use std::sync::Arc;
use std::time::SystemTime;

/// Frame format enumeration supporting different video formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// RGB24 format - uncompressed RGB data
    Rgb24,
    /// Motion JPEG format - compressed JPEG frames
    Mjpeg,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Rgb24 => 3,
            FrameFormat::Mjpeg => 0, // Variable size, compressed
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// Frame data structure containing raw frame data and metadata
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier within a session
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true, // Compressed formats have variable size
        }
    }

    /// Decode the frame into an RGB image for annotation/encoding
    pub fn to_rgb(&self) -> Result<RgbImage> {
        match self.format {
            FrameFormat::Rgb24 => {
                RgbImage::from_raw(self.width, self.height, self.data.to_vec()).ok_or_else(|| {
                    FacewatchError::camera(format!(
                        "RGB frame {} has {} bytes, expected {}",
                        self.id,
                        self.data.len(),
                        self.expected_size().unwrap_or(0)
                    ))
                })
            }
            FrameFormat::Mjpeg => {
                let dynamic = image::load_from_memory(&self.data).map_err(|e| {
                    FacewatchError::camera(format!("MJPEG decode failed for frame {}: {}", self.id, e))
                })?;
                Ok(dynamic.to_rgb8())
            }
        }
    }

    /// Convert the frame to grayscale for detection
    pub fn to_luma(&self) -> Result<GrayImage> {
        match self.format {
            FrameFormat::Rgb24 => {
                let rgb = self.to_rgb()?;
                let mut gray = GrayImage::new(self.width, self.height);
                for (x, y, pixel) in rgb.enumerate_pixels() {
                    let value = (0.299 * pixel[0] as f32
                        + 0.587 * pixel[1] as f32
                        + 0.114 * pixel[2] as f32) as u8;
                    gray.put_pixel(x, y, Luma([value]));
                }
                Ok(gray)
            }
            FrameFormat::Mjpeg => {
                let dynamic = image::load_from_memory(&self.data).map_err(|e| {
                    FacewatchError::camera(format!("MJPEG decode failed for frame {}: {}", self.id, e))
                })?;
                Ok(dynamic.to_luma8())
            }
        }
    }
}
