use crate::config::VaultConfig;
use crate::detect::Detection;
use crate::error::{FacewatchError, Result};
use crate::frame::FrameData;
use crate::presence::SecurityEvent;

use chrono::{DateTime, Utc};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MARKER_RADIUS: i32 = 4;
const CROSSHAIR_LEN: f32 = 12.0;

/// Metadata for one persisted evidence snapshot
#[derive(Debug, Clone, Serialize)]
pub struct VaultEntry {
    pub filename: String,
    pub absolute_path: PathBuf,
    pub event_id: String,
    pub created_at: DateTime<Utc>,
}

/// Evidence vault: annotates frames and persists them as JPEG files
/// named `<prefix>_<event_id>.jpg` inside a flat directory.
pub struct EvidenceVault {
    config: VaultConfig,
    root: PathBuf,
    label_font: Option<Font<'static>>,
}

impl EvidenceVault {
    /// Open the vault, creating its directory if needed. Reopening an
    /// existing directory is not an error.
    pub fn open(config: VaultConfig) -> Result<Self> {
        let root = PathBuf::from(&config.path);
        fs::create_dir_all(&root)
            .map_err(|e| FacewatchError::vault(format!("Failed to create vault directory '{}': {}", root.display(), e)))?;

        let label_font = if config.annotate {
            Self::load_font(&config.label_font_path)
        } else {
            None
        };

        info!("Evidence vault ready at '{}'", root.display());
        Ok(Self {
            config,
            root,
            label_font,
        })
    }

    /// Load the label font; annotation degrades to shapes only when
    /// the font is unavailable.
    fn load_font(path: &str) -> Option<Font<'static>> {
        match fs::read(path) {
            Ok(data) => match Font::try_from_vec(data) {
                Some(font) => Some(font),
                None => {
                    warn!("Failed to parse font file '{}', labels disabled", path);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read font file '{}': {}, labels disabled", path, e);
                None
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Annotate and persist one frame for the given event
    pub fn persist(
        &self,
        frame: &FrameData,
        detections: &[Detection],
        event: &SecurityEvent,
    ) -> Result<VaultEntry> {
        let mut img = frame.to_rgb()?;

        if self.config.annotate {
            self.annotate(&mut img, detections, &event.event_id);
        }

        let filename = format!("{}_{}.jpg", self.config.prefix, event.event_id);
        let absolute_path = self.root.join(&filename);

        let mut encoded = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut encoded), ImageFormat::Jpeg)
            .map_err(|e| FacewatchError::vault(format!("JPEG encode failed: {}", e)))?;

        fs::write(&absolute_path, &encoded).map_err(|e| {
            FacewatchError::vault(format!(
                "Failed to write snapshot '{}': {}",
                absolute_path.display(),
                e
            ))
        })?;

        let entry = VaultEntry {
            filename,
            absolute_path: absolute_path.clone(),
            event_id: event.event_id.clone(),
            created_at: Utc::now(),
        };

        // The snapshot is already durable at this point; a sidecar
        // fault degrades metadata, it does not undo the capture
        if self.config.write_metadata {
            if let Err(e) = self.write_sidecar(&entry) {
                warn!("Metadata sidecar write failed for '{}': {}", entry.filename, e);
            }
        }

        debug!(
            "Persisted evidence snapshot '{}' ({} bytes)",
            absolute_path.display(),
            encoded.len()
        );
        Ok(entry)
    }

    /// Draw region boxes, center markers, crosshairs, and the
    /// target-lock label onto the image.
    fn annotate(&self, img: &mut RgbImage, detections: &[Detection], event_id: &str) {
        let (width, height) = img.dimensions();

        for detection in detections {
            let region = detection.region;
            if region.width == 0 || region.height == 0 {
                continue;
            }

            draw_hollow_rect_mut(
                img,
                Rect::at(region.x as i32, region.y as i32)
                    .of_size(region.width, region.height),
                REGION_COLOR,
            );

            let (cx, cy) = region.center();
            let cx = cx.min(width.saturating_sub(1));
            let cy = cy.min(height.saturating_sub(1));

            draw_filled_circle_mut(img, (cx as i32, cy as i32), MARKER_RADIUS, MARKER_COLOR);

            let (fx, fy) = (cx as f32, cy as f32);
            draw_line_segment_mut(
                img,
                (fx - CROSSHAIR_LEN, fy),
                (fx + CROSSHAIR_LEN, fy),
                MARKER_COLOR,
            );
            draw_line_segment_mut(
                img,
                (fx, fy - CROSSHAIR_LEN),
                (fx, fy + CROSSHAIR_LEN),
                MARKER_COLOR,
            );

            if let Some(landmarks) = &detection.landmarks {
                for &(lx, ly) in landmarks {
                    draw_filled_circle_mut(img, (lx as i32, ly as i32), 2, MARKER_COLOR);
                }
            }
        }

        if let Some(font) = &self.label_font {
            let label = format!("TGT_LOCKED_{}", event_id);
            let scale = Scale::uniform(self.config.label_font_size);
            draw_text_mut(img, LABEL_COLOR, 10, 10, scale, font, &label);
        }
    }

    fn write_sidecar(&self, entry: &VaultEntry) -> Result<()> {
        let sidecar = self
            .root
            .join(format!("{}_{}.json", self.config.prefix, entry.event_id));
        let json = serde_json::to_string_pretty(entry)
            .map_err(|e| FacewatchError::vault(format!("Metadata serialization failed: {}", e)))?;
        fs::write(&sidecar, json).map_err(|e| {
            FacewatchError::vault(format!(
                "Failed to write metadata '{}': {}",
                sidecar.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Region;
    use crate::frame::FrameFormat;
    use crate::presence::EventKind;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> VaultConfig {
        VaultConfig {
            path: dir.path().join("vault").to_string_lossy().into_owned(),
            prefix: "capture".to_string(),
            annotate: true,
            label_font_path: "/nonexistent/font.ttf".to_string(),
            label_font_size: 16.0,
            write_metadata: false,
        }
    }

    fn test_frame() -> FrameData {
        FrameData::new(
            1,
            SystemTime::now(),
            vec![64u8; 96 * 96 * 3],
            96,
            96,
            FrameFormat::Rgb24,
        )
    }

    fn test_event(id: &str) -> SecurityEvent {
        SecurityEvent {
            event_id: id.to_string(),
            kind: EventKind::Acquired,
            timestamp: Utc::now(),
        }
    }

    fn test_detection() -> Detection {
        Detection {
            region: Region {
                x: 10,
                y: 10,
                width: 40,
                height: 40,
            },
            landmarks: None,
        }
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let vault = EvidenceVault::open(config.clone()).unwrap();
        assert!(vault.root().is_dir());

        // Reopening an existing vault is fine
        let reopened = EvidenceVault::open(config);
        assert!(reopened.is_ok());
    }

    #[test]
    fn test_persist_writes_named_snapshot() {
        let dir = TempDir::new().unwrap();
        let vault = EvidenceVault::open(test_config(&dir)).unwrap();

        let entry = vault
            .persist(&test_frame(), &[test_detection()], &test_event("20260823_101500_000"))
            .unwrap();

        assert_eq!(entry.filename, "capture_20260823_101500_000.jpg");
        assert!(entry.absolute_path.is_file());
        assert_eq!(entry.event_id, "20260823_101500_000");

        // The written file must be decodable JPEG
        let bytes = fs::read(&entry.absolute_path).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgb8().dimensions(), (96, 96));
    }

    #[test]
    fn test_missing_font_degrades_to_shapes_only() {
        let dir = TempDir::new().unwrap();
        let vault = EvidenceVault::open(test_config(&dir)).unwrap();
        assert!(vault.label_font.is_none());

        // Persist still succeeds with shapes-only annotation
        let result = vault.persist(
            &test_frame(),
            &[test_detection()],
            &test_event("20260823_101501_000"),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_annotation_marks_region_pixels() {
        let dir = TempDir::new().unwrap();
        let vault = EvidenceVault::open(test_config(&dir)).unwrap();

        let mut img = test_frame().to_rgb().unwrap();
        vault.annotate(&mut img, &[test_detection()], "20260823_101502_000");

        // Top-left corner of the region box must be green
        assert_eq!(*img.get_pixel(10, 10), REGION_COLOR);
        // Region center carries the red marker
        assert_eq!(*img.get_pixel(30, 30), MARKER_COLOR);
    }

    #[test]
    fn test_sidecar_failure_does_not_undo_persist() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.write_metadata = true;
        let vault = EvidenceVault::open(config).unwrap();

        // A directory squatting on the sidecar path makes its write fail
        fs::create_dir_all(vault.root().join("capture_20260823_101504_000.json")).unwrap();

        let entry = vault
            .persist(&test_frame(), &[], &test_event("20260823_101504_000"))
            .unwrap();
        assert!(entry.absolute_path.is_file());
    }

    #[test]
    fn test_metadata_sidecar_written_when_enabled() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.write_metadata = true;
        let vault = EvidenceVault::open(config).unwrap();

        let entry = vault
            .persist(&test_frame(), &[], &test_event("20260823_101503_000"))
            .unwrap();

        let sidecar = vault.root().join("capture_20260823_101503_000.json");
        assert!(sidecar.is_file());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(json["filename"], entry.filename);
        assert_eq!(json["event_id"], "20260823_101503_000");
    }
}
