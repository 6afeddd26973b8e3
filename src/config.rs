use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FacewatchConfig {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub capture: CaptureConfig,
    pub vault: VaultConfig,
    pub audit: AuditConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 1 for /dev/video1)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Upper bound on a single frame read before the session is
    /// treated as stalled
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

/// Detector variant selected at pipeline start. The presence tracker
/// only ever sees empty vs non-empty results, so either variant is a
/// drop-in substitute.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectorVariant {
    /// Coarse bounding-box detector (fast, lower fidelity)
    Box,
    /// Landmark-mesh detector (slower, richer geometry, capped targets)
    Landmark,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_variant")]
    pub variant: DetectorVariant,

    /// Per-pixel delta threshold against the background model
    #[serde(default = "default_delta_threshold")]
    pub delta_threshold: u32,

    /// Minimum connected-component area (pixels) to count as a target
    #[serde(default = "default_min_region_area")]
    pub min_region_area: f64,

    /// Maximum simultaneous targets for the landmark variant
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Minimum seconds between persisted evidence snapshots
    #[serde(default = "default_capture_interval")]
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VaultConfig {
    /// Evidence vault directory (auto-created)
    #[serde(default = "default_vault_path")]
    pub path: String,

    /// Snapshot filename prefix: <prefix>_<event_id>.jpg
    #[serde(default = "default_vault_prefix")]
    pub prefix: String,

    /// Overlay detected regions/landmarks on persisted snapshots
    #[serde(default = "default_annotate")]
    pub annotate: bool,

    /// Path to TrueType font for the target-lock label; annotation
    /// degrades to shapes only when the font cannot be loaded
    #[serde(default = "default_label_font_path")]
    pub label_font_path: String,

    /// Font size for the target-lock label
    #[serde(default = "default_label_font_size")]
    pub label_font_size: f32,

    /// Write a JSON sidecar with the vault entry metadata
    #[serde(default = "default_write_metadata")]
    pub write_metadata: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuditConfig {
    /// Audit log directory (auto-created)
    #[serde(default = "default_audit_path")]
    pub path: String,

    /// Daily log file prefix: <file_prefix>.<YYYY-MM-DD>
    #[serde(default = "default_audit_prefix")]
    pub file_prefix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RegistryConfig {
    /// SQLite database path; absent disables the registry sink entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl FacewatchConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("facewatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.read_timeout_secs", default_read_timeout_secs())?
            .set_default("detector.variant", "box")?
            .set_default("detector.delta_threshold", default_delta_threshold())?
            .set_default("detector.min_region_area", default_min_region_area())?
            .set_default("detector.max_targets", default_max_targets() as i64)?
            .set_default("capture.interval_seconds", default_capture_interval())?
            .set_default("vault.path", default_vault_path())?
            .set_default("vault.prefix", default_vault_prefix())?
            .set_default("vault.annotate", default_annotate())?
            .set_default("vault.label_font_path", default_label_font_path())?
            .set_default("vault.label_font_size", default_label_font_size() as f64)?
            .set_default("vault.write_metadata", default_write_metadata())?
            .set_default("audit.path", default_audit_path())?
            .set_default("audit.file_prefix", default_audit_prefix())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with FACEWATCH_ prefix
            .add_source(Environment::with_prefix("FACEWATCH").separator("_"))
            .build()?;

        let config: FacewatchConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.read_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Camera read_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.capture.interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Capture interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.detector.max_targets == 0 {
            return Err(ConfigError::Message(
                "Detector max_targets must be greater than 0".to_string(),
            ));
        }

        if self.vault.prefix.is_empty() {
            return Err(ConfigError::Message(
                "Vault prefix must not be empty".to_string(),
            ));
        }

        if self.audit.file_prefix.is_empty() {
            return Err(ConfigError::Message(
                "Audit file_prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FacewatchConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                read_timeout_secs: default_read_timeout_secs(),
            },
            detector: DetectorConfig {
                variant: default_detector_variant(),
                delta_threshold: default_delta_threshold(),
                min_region_area: default_min_region_area(),
                max_targets: default_max_targets(),
            },
            capture: CaptureConfig {
                interval_seconds: default_capture_interval(),
            },
            vault: VaultConfig {
                path: default_vault_path(),
                prefix: default_vault_prefix(),
                annotate: default_annotate(),
                label_font_path: default_label_font_path(),
                label_font_size: default_label_font_size(),
                write_metadata: default_write_metadata(),
            },
            audit: AuditConfig {
                path: default_audit_path(),
                file_prefix: default_audit_prefix(),
            },
            registry: RegistryConfig::default(),
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    1
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    15
}
fn default_read_timeout_secs() -> u64 {
    10
}

fn default_detector_variant() -> DetectorVariant {
    DetectorVariant::Box
}
fn default_delta_threshold() -> u32 {
    25
}
fn default_min_region_area() -> f64 {
    900.0
}
fn default_max_targets() -> usize {
    1
}

fn default_capture_interval() -> u64 {
    5
}

fn default_vault_path() -> String {
    "evidence_vault".to_string()
}
fn default_vault_prefix() -> String {
    "capture".to_string()
}
fn default_annotate() -> bool {
    true
}
fn default_label_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}
fn default_label_font_size() -> f32 {
    16.0
}
fn default_write_metadata() -> bool {
    false
}

fn default_audit_path() -> String {
    "audit_logs".to_string()
}
fn default_audit_prefix() -> String {
    "vision_audit".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FacewatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.index, 1);
        assert_eq!(config.capture.interval_seconds, 5);
        assert_eq!(config.detector.variant, DetectorVariant::Box);
        assert!(config.registry.database.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = FacewatchConfig::default();

        config.capture.interval_seconds = 0;
        assert!(config.validate().is_err());
        config.capture.interval_seconds = 5;
        assert!(config.validate().is_ok());

        config.camera.resolution = (0, 480);
        assert!(config.validate().is_err());
        config.camera.resolution = (640, 480);

        config.detector.max_targets = 0;
        assert!(config.validate().is_err());
        config.detector.max_targets = 1;

        config.vault.prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_detector_variant_parses_lowercase() {
        let variant: DetectorVariant = serde_json::from_str("\"landmark\"").unwrap();
        assert_eq!(variant, DetectorVariant::Landmark);
        let variant: DetectorVariant = serde_json::from_str("\"box\"").unwrap();
        assert_eq!(variant, DetectorVariant::Box);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = FacewatchConfig::load_from_file("does_not_exist.toml").unwrap();
        assert_eq!(config.vault.path, "evidence_vault");
        assert_eq!(config.audit.path, "audit_logs");
    }
}
