pub mod audit;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod limiter;
pub mod pipeline;
pub mod presence;
pub mod registry;
pub mod source;
pub mod vault;

pub use audit::{AuditLevel, AuditLog};
pub use config::{
    AuditConfig, CameraConfig, CaptureConfig, DetectorConfig, DetectorVariant, FacewatchConfig,
    RegistryConfig, VaultConfig,
};
pub use detect::{build_detector, BoxDetector, Detection, DetectionResult, Detector, LandmarkDetector, Region};
pub use error::{FacewatchError, Result};
pub use frame::{FrameData, FrameFormat};
pub use limiter::CaptureRateLimiter;
pub use pipeline::FacewatchOrchestrator;
pub use presence::{EventKind, PresenceState, PresenceTracker, SecurityEvent};
pub use registry::{RegistrySink, SqliteRegistry};
pub use source::{CaptureSource, SyntheticSource};
pub use vault::{EvidenceVault, VaultEntry};

#[cfg(all(target_os = "linux", feature = "camera"))]
pub use source::GstCameraSource;
