use crate::config::DetectorConfig;
use crate::detect::{box_detector::BoxDetector, Detection, DetectionResult, Detector, Region};
use crate::error::Result;
use crate::frame::FrameData;

use image::GrayImage;
use tracing::debug;

/// Landmark-mesh detector.
///
/// Runs the same background-difference pass as the box variant, then
/// refines the strongest regions (capped at `max_targets`) with a
/// five-point landmark estimate derived from the luma mass
/// distribution inside each region: two eye points, a nose center,
/// and two mouth corners.
pub struct LandmarkDetector {
    inner: BoxDetector,
    max_targets: usize,
}

impl LandmarkDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let max_targets = config.max_targets;
        Self {
            inner: BoxDetector::new(config),
            max_targets,
        }
    }

    /// Estimate five landmark points inside a region from its luma
    /// centroid. Rows are weighted by intensity so the mesh leans
    /// toward the brighter (foreground) mass.
    fn estimate_landmarks(gray: &GrayImage, region: &Region) -> Vec<(u32, u32)> {
        let (img_w, img_h) = gray.dimensions();
        let x_end = (region.x + region.width).min(img_w);
        let y_end = (region.y + region.height).min(img_h);

        let mut sum_x: u64 = 0;
        let mut sum_y: u64 = 0;
        let mut mass: u64 = 0;

        for y in region.y..y_end {
            for x in region.x..x_end {
                let weight = gray.get_pixel(x, y)[0] as u64;
                sum_x += x as u64 * weight;
                sum_y += y as u64 * weight;
                mass += weight;
            }
        }

        let (cx, cy) = if mass > 0 {
            ((sum_x / mass) as u32, (sum_y / mass) as u32)
        } else {
            region.center()
        };

        let dx = (region.width / 4).max(1);
        let dy = (region.height / 4).max(1);

        let clamp = |x: u32, y: u32| -> (u32, u32) {
            (x.min(img_w.saturating_sub(1)), y.min(img_h.saturating_sub(1)))
        };

        vec![
            clamp(cx.saturating_sub(dx), cy.saturating_sub(dy)), // left eye
            clamp(cx + dx, cy.saturating_sub(dy)),               // right eye
            clamp(cx, cy),                                       // nose
            clamp(cx.saturating_sub(dx), cy + dy),               // left mouth corner
            clamp(cx + dx, cy + dy),                             // right mouth corner
        ]
    }
}

impl Detector for LandmarkDetector {
    fn name(&self) -> &'static str {
        "landmark"
    }

    fn detect(&mut self, frame: &FrameData) -> Result<DetectionResult> {
        let regions = self.inner.detect_regions(frame)?;
        if regions.is_empty() {
            return Ok(DetectionResult::default());
        }

        let gray = frame.to_luma()?;

        // Regions arrive largest-first; keep only the strongest targets
        let detections: Vec<Detection> = regions
            .into_iter()
            .take(self.max_targets)
            .map(|region| {
                let landmarks = Self::estimate_landmarks(&gray, &region);
                Detection {
                    region,
                    landmarks: Some(landmarks),
                }
            })
            .collect();

        debug!(
            "Frame {}: refined {} target(s) with landmark meshes",
            frame.id,
            detections.len()
        );
        Ok(DetectionResult { detections })
    }
}
