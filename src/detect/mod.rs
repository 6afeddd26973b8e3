pub mod box_detector;
pub mod landmark;

use crate::config::{DetectorConfig, DetectorVariant};
use crate::error::Result;
use crate::frame::FrameData;

use serde::Serialize;

pub use box_detector::BoxDetector;
pub use landmark::LandmarkDetector;

/// Axis-aligned bounding region in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Center point of the region
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// A single detected target within a frame
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub region: Region,
    /// Landmark points (present only for the landmark detector variant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Vec<(u32, u32)>>,
}

/// Result of running a detector over one frame
#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }
}

/// Face/target detector over decoded frames.
///
/// Implementations are stateful (background models accumulate across
/// frames) and are driven sequentially by the pipeline, one frame at
/// a time.
pub trait Detector: Send {
    /// Short identifier for audit entries
    fn name(&self) -> &'static str;

    /// Run detection over a single frame
    fn detect(&mut self, frame: &FrameData) -> Result<DetectionResult>;
}

/// Construct the detector selected by configuration
pub fn build_detector(config: &DetectorConfig) -> Box<dyn Detector> {
    match config.variant {
        DetectorVariant::Box => Box::new(BoxDetector::new(config.clone())),
        DetectorVariant::Landmark => Box::new(LandmarkDetector::new(config.clone())),
    }
}
