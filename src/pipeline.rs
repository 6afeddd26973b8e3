use crate::audit::{AuditLevel, AuditLog};
use crate::config::FacewatchConfig;
use crate::detect::{build_detector, Detection, Detector};
use crate::error::Result;
use crate::frame::FrameData;
use crate::limiter::CaptureRateLimiter;
use crate::presence::{EventKind, PresenceTracker, SecurityEvent};
use crate::registry::{RegistrySink, SqliteRegistry};
use crate::source::CaptureSource;
use crate::vault::EvidenceVault;

use chrono::Local;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why the frame loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Interrupted,
    EndOfStream,
    ReadStall,
    ReadError,
}

impl SessionEnd {
    fn describe(&self) -> &'static str {
        match self {
            SessionEnd::Interrupted => "manual interrupt",
            SessionEnd::EndOfStream => "end of stream",
            SessionEnd::ReadStall => "frame read stall",
            SessionEnd::ReadError => "stream fault",
        }
    }
}

/// Owns every pipeline component and drives the sequential frame
/// loop: read, detect, track presence, gate captures, persist, sync.
///
/// All work for one frame completes before the next read; the
/// cancellation token is checked once per cycle. On every exit path
/// the source is released and a final session-ended audit entry is
/// written.
pub struct FacewatchOrchestrator {
    config: FacewatchConfig,
    audit: AuditLog,
    source: Box<dyn CaptureSource>,
    detector: Box<dyn Detector>,
    tracker: PresenceTracker,
    limiter: CaptureRateLimiter,
    vault: EvidenceVault,
    registry: Option<Box<dyn RegistrySink>>,
    shutdown: CancellationToken,
}

impl FacewatchOrchestrator {
    /// Assemble the pipeline with the configured detector variant
    pub fn new<F>(config: FacewatchConfig, bind_source: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn CaptureSource>>,
    {
        let detector = build_detector(&config.detector);
        Self::with_detector(config, bind_source, detector)
    }

    /// Assemble the pipeline with an explicit detector.
    ///
    /// The audit log opens first so a capture device that fails to
    /// bind leaves a fatal entry as the sole record of the attempt.
    pub fn with_detector<F>(
        config: FacewatchConfig,
        bind_source: F,
        detector: Box<dyn Detector>,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn CaptureSource>>,
    {
        let mut audit = AuditLog::open(&config.audit)?;

        let source = match bind_source() {
            Ok(source) => source,
            Err(e) => {
                error!("Capture source bind failed: {}", e);
                audit.append(
                    AuditLevel::Error,
                    &format!("Critical failure: capture source unavailable: {}", e),
                )?;
                audit.close()?;
                return Err(e);
            }
        };
        audit.append(
            AuditLevel::Info,
            "Camera stream initialized. Hardware channel established.",
        )?;

        let vault = EvidenceVault::open(config.vault.clone())?;

        // Registry is strictly additive; a broken database disables
        // the sink instead of failing startup
        let registry: Option<Box<dyn RegistrySink>> = match &config.registry.database {
            Some(database) => match SqliteRegistry::open(database) {
                Ok(registry) => Some(Box::new(registry)),
                Err(e) => {
                    warn!("Registry unavailable, sink disabled: {}", e);
                    audit.append(
                        AuditLevel::Warning,
                        &format!("Registry unavailable, sink disabled: {}", e),
                    )?;
                    None
                }
            },
            None => None,
        };

        let limiter =
            CaptureRateLimiter::new(Duration::from_secs(config.capture.interval_seconds));

        Ok(Self {
            config,
            audit,
            source,
            detector,
            tracker: PresenceTracker::new(),
            limiter,
            vault,
            registry,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token observed once per frame cycle; cancel it to stop the loop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register SIGINT and SIGTERM handlers that cancel the token
    pub fn install_signal_handlers(&self) {
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received SIGINT signal (Ctrl+C)");
                token.cancel();
            }
        });

        #[cfg(unix)]
        {
            let token = self.shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        if sigterm.recv().await.is_some() {
                            info!("Received SIGTERM signal");
                            token.cancel();
                        }
                    }
                    Err(e) => error!("Failed to register SIGTERM handler: {}", e),
                }
            });
        }
    }

    /// Drive the frame loop until the stream ends, a stall is
    /// detected, or the shutdown token fires. Returns the process
    /// exit code. The capture source is released on every exit path,
    /// including an audit write failing mid-session.
    pub async fn run(&mut self) -> Result<i32> {
        let outcome = self.session_loop().await;

        if let Err(e) = self.source.release().await {
            warn!("Capture source release failed: {}", e);
        }

        match outcome {
            Ok(reason) => {
                self.audit.append(
                    AuditLevel::Info,
                    &format!("Hardware released. End of session ({}).", reason.describe()),
                )?;
                self.audit.close()?;
                info!("Facewatch session ended: {}", reason.describe());
                Ok(0)
            }
            Err(e) => {
                // The audit sink is the usual failure here, so the
                // final entry is best effort
                let _ = self.audit.append(
                    AuditLevel::Error,
                    &format!("Hardware released. Session aborted: {}", e),
                );
                let _ = self.audit.close();
                error!("Facewatch session aborted: {}", e);
                Err(e)
            }
        }
    }

    /// The per-frame loop proper; any error here still flows through
    /// the release path in `run`
    async fn session_loop(&mut self) -> Result<SessionEnd> {
        self.audit.append(
            AuditLevel::Info,
            &format!(
                "Surveillance session started (detector={})",
                self.detector.name()
            ),
        )?;
        info!("Facewatch pipeline is running");

        let read_timeout = Duration::from_secs(self.config.camera.read_timeout_secs);
        let shutdown = self.shutdown.clone();

        let reason = loop {
            // Split borrows so the audit log stays writable while the
            // read future holds the source
            let source = &mut self.source;
            let audit = &mut self.audit;

            let frame = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    audit.append(AuditLevel::Info, "Manual shutdown protocol initiated.")?;
                    break SessionEnd::Interrupted;
                }
                read = timeout(read_timeout, source.read_frame()) => match read {
                    Err(_) => {
                        warn!("Frame read exceeded {:?}", read_timeout);
                        audit.append(
                            AuditLevel::Warning,
                            "Frame read stalled beyond timeout. Ending session.",
                        )?;
                        break SessionEnd::ReadStall;
                    }
                    Ok(Err(e)) => {
                        warn!("Stream fault: {}", e);
                        audit.append(
                            AuditLevel::Warning,
                            &format!("Frame drop detected in primary stream: {}", e),
                        )?;
                        break SessionEnd::ReadError;
                    }
                    Ok(Ok(None)) => {
                        warn!("Capture source reported end of stream");
                        audit.append(
                            AuditLevel::Warning,
                            "Frame drop detected in primary stream. Stream ended.",
                        )?;
                        break SessionEnd::EndOfStream;
                    }
                    Ok(Ok(Some(frame))) => frame,
                }
            };

            let result = match self.detector.detect(&frame) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Detector fault on frame {}: {}", frame.id, e);
                    self.audit.append(
                        AuditLevel::Warning,
                        &format!("Detector fault on frame {}: {}", frame.id, e),
                    )?;
                    continue;
                }
            };

            if let Some(event) = self.tracker.observe(!result.is_empty(), Local::now()) {
                match event.kind {
                    EventKind::Acquired => {
                        self.audit.append(
                            AuditLevel::Info,
                            &format!(
                                "SECURITY EVENT: Target acquired. Event ID: {}",
                                event.event_id
                            ),
                        )?;
                        self.handle_capture(&frame, &result.detections, &event)?;
                    }
                    EventKind::Lost => {
                        self.audit.append(
                            AuditLevel::Info,
                            &format!(
                                "SECURITY EVENT: Target lost. Event ID: {}",
                                event.event_id
                            ),
                        )?;
                    }
                }
            }
        };

        Ok(reason)
    }

    /// Rate-limited persist plus best-effort registry sync for one
    /// acquired event
    fn handle_capture(
        &mut self,
        frame: &FrameData,
        detections: &[Detection],
        event: &SecurityEvent,
    ) -> Result<()> {
        let now = Instant::now();
        if !self.limiter.should_capture(now) {
            debug!(
                "Capture suppressed by rate limit for event {}",
                event.event_id
            );
            self.audit.append(
                AuditLevel::Info,
                &format!(
                    "Capture suppressed by rate limit. Event ID: {}",
                    event.event_id
                ),
            )?;
            return Ok(());
        }

        let entry = match self.vault.persist(frame, detections, event) {
            Ok(entry) => entry,
            Err(e) => {
                error!("Evidence write failed for event {}: {}", event.event_id, e);
                self.audit.append(
                    AuditLevel::Error,
                    &format!("Evidence write failed for event {}: {}", event.event_id, e),
                )?;
                return Ok(());
            }
        };
        self.limiter.mark_captured(now);
        self.audit.append(
            AuditLevel::Info,
            &format!("Evidence consolidated at: {}", entry.absolute_path.display()),
        )?;

        if let Some(registry) = &self.registry {
            match registry.record(&entry) {
                Ok(()) => {
                    self.audit.append(
                        AuditLevel::Info,
                        &format!("Registry sync complete: {}", entry.filename),
                    )?;
                }
                Err(e) => {
                    warn!("Registry sync failed for {}: {}", entry.filename, e);
                    self.audit.append(
                        AuditLevel::Warning,
                        &format!("Registry sync failed for {}: {}", entry.filename, e),
                    )?;
                }
            }
        }

        Ok(())
    }

}
