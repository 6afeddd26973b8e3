use crate::config::DetectorConfig;
use crate::detect::{Detection, DetectionResult, Detector, Region};
use crate::error::Result;
use crate::frame::FrameData;

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::{
    contrast::threshold,
    distance_transform::Norm,
    filter::gaussian_blur_f32,
    morphology::{dilate, erode},
    region_labelling::{connected_components, Connectivity},
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Coarse bounding-box detector built on background differencing.
///
/// Pipeline per frame: grayscale, gaussian blur, difference against a
/// running-average background model, binary threshold, morphological
/// open, connected components. Components larger than the configured
/// minimum area become detections with their bounding boxes.
pub struct BoxDetector {
    config: DetectorConfig,
    background_model: Option<GrayImage>,
    frame_count: u64,
}

impl BoxDetector {
    pub fn new(config: DetectorConfig) -> Self {
        info!(
            "Initializing box detector (delta_threshold={}, min_region_area={})",
            config.delta_threshold, config.min_region_area
        );
        Self {
            config,
            background_model: None,
            frame_count: 0,
        }
    }

    pub(crate) fn background_initialized(&self) -> bool {
        self.background_model.is_some()
    }

    /// Per-pixel absolute difference against the background model
    fn frame_difference(background: &GrayImage, current: &GrayImage) -> GrayImage {
        let (width, height) = background.dimensions();
        let mut diff = GrayImage::new(width, height);

        for (x, y, bg_pixel) in background.enumerate_pixels() {
            if let Some(curr_pixel) = current.get_pixel_checked(x, y) {
                let delta = (bg_pixel[0] as i16 - curr_pixel[0] as i16).unsigned_abs() as u8;
                diff.put_pixel(x, y, Luma([delta]));
            }
        }

        diff
    }

    /// Bounding boxes of connected components, filtered by minimum area
    fn component_regions(
        &self,
        components: &ImageBuffer<Luma<u32>, Vec<u32>>,
    ) -> Vec<Region> {
        // component id -> (min_x, min_y, max_x, max_y, pixel count)
        let mut bounds: HashMap<u32, (u32, u32, u32, u32, u64)> = HashMap::new();

        for (x, y, pixel) in components.enumerate_pixels() {
            let id = pixel[0];
            if id == 0 {
                continue;
            }
            bounds
                .entry(id)
                .and_modify(|b| {
                    b.0 = b.0.min(x);
                    b.1 = b.1.min(y);
                    b.2 = b.2.max(x);
                    b.3 = b.3.max(y);
                    b.4 += 1;
                })
                .or_insert((x, y, x, y, 1));
        }

        let mut regions: Vec<Region> = bounds
            .into_values()
            .filter(|(_, _, _, _, count)| *count as f64 >= self.config.min_region_area)
            .map(|(min_x, min_y, max_x, max_y, _)| Region {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            })
            .collect();

        // Largest first so downstream target caps keep the dominant regions
        regions.sort_by(|a, b| b.area().cmp(&a.area()));
        regions
    }

    /// Update background model using a simple running average
    fn update_background_model(&mut self, current: &GrayImage) {
        if let Some(ref mut background) = self.background_model {
            let learning_rate = 0.05;

            for (bg_pixel, curr_pixel) in background.pixels_mut().zip(current.pixels()) {
                let bg_val = bg_pixel[0] as f32;
                let curr_val = curr_pixel[0] as f32;
                bg_pixel[0] = (bg_val * (1.0 - learning_rate) + curr_val * learning_rate) as u8;
            }
        }
    }

    pub(crate) fn detect_regions(&mut self, frame: &FrameData) -> Result<Vec<Region>> {
        debug!(
            "Analyzing frame {} ({}x{}, {:?})",
            frame.id, frame.width, frame.height, frame.format
        );

        let gray = frame.to_luma()?;
        let blurred = gaussian_blur_f32(&gray, 2.0);

        // First frame seeds the background model; nothing to compare yet
        if self.background_model.is_none() {
            info!("Initializing background model with first frame");
            self.background_model = Some(blurred);
            self.frame_count = 1;
            return Ok(Vec::new());
        }

        let regions = {
            let background = match self.background_model.as_ref() {
                Some(bg) => bg,
                None => return Ok(Vec::new()),
            };

            let diff = Self::frame_difference(background, &blurred);
            let binary = threshold(&diff, self.config.delta_threshold as u8);

            let kernel_size = 3u8;
            let cleaned = dilate(
                &erode(&binary, Norm::LInf, kernel_size),
                Norm::LInf,
                kernel_size,
            );

            let components = connected_components(&cleaned, Connectivity::Eight, Luma([0u8]));
            self.component_regions(&components)
        };

        self.update_background_model(&blurred);
        self.frame_count += 1;

        debug!(
            "Frame {} analysis complete: {} region(s) above threshold ({} frames modeled)",
            frame.id,
            regions.len(),
            self.frame_count
        );
        Ok(regions)
    }
}

impl Detector for BoxDetector {
    fn name(&self) -> &'static str {
        "box"
    }

    fn detect(&mut self, frame: &FrameData) -> Result<DetectionResult> {
        let detections = self
            .detect_regions(frame)?
            .into_iter()
            .map(|region| Detection {
                region,
                landmarks: None,
            })
            .collect();

        Ok(DetectionResult { detections })
    }
}
