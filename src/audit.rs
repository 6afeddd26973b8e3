use crate::config::AuditConfig;
use crate::error::{FacewatchError, Result};

use chrono::Local;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Severity of an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditLevel::Info => write!(f, "INFO"),
            AuditLevel::Warning => write!(f, "WARNING"),
            AuditLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Append-only audit trail, one file per calendar day.
///
/// Entries are plain text lines, `[LEVEL] timestamp - message`, and
/// every append is flushed so the trail survives an abrupt exit. The
/// daily rollover is handled by the underlying rolling appender.
pub struct AuditLog {
    writer: Box<dyn Write + Send>,
    directory: PathBuf,
}

impl AuditLog {
    /// Open the audit log, creating its directory if needed
    pub fn open(config: &AuditConfig) -> Result<Self> {
        let directory = PathBuf::from(&config.path);
        fs::create_dir_all(&directory).map_err(|e| {
            FacewatchError::system(format!(
                "Failed to create audit directory '{}': {}",
                directory.display(),
                e
            ))
        })?;

        let writer = RollingFileAppender::new(Rotation::DAILY, &directory, &config.file_prefix);

        info!("Audit log opened in '{}'", directory.display());
        Ok(Self {
            writer: Box::new(writer),
            directory,
        })
    }

    /// Trail backed by an arbitrary writer, for exercising sink faults
    #[cfg(test)]
    pub(crate) fn from_writer(writer: Box<dyn Write + Send>, directory: PathBuf) -> Self {
        Self { writer, directory }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }

    /// Append one entry and flush it to disk
    pub fn append(&mut self, level: AuditLevel, message: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        writeln!(self.writer, "[{}] {} - {}", level, timestamp, message)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Final flush before the session ends
    pub fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> AuditConfig {
        AuditConfig {
            path: dir.path().join("audit").to_string_lossy().into_owned(),
            file_prefix: "vision_audit".to_string(),
        }
    }

    fn read_log(log: &AuditLog) -> String {
        let mut content = String::new();
        for entry in fs::read_dir(log.directory()).unwrap() {
            let path = entry.unwrap().path();
            if path.is_file() {
                content.push_str(&fs::read_to_string(path).unwrap());
            }
        }
        content
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let log = AuditLog::open(&config).unwrap();
        assert!(log.directory().is_dir());

        // Reopening is not an error
        assert!(AuditLog::open(&config).is_ok());
    }

    #[test]
    fn test_append_writes_formatted_line() {
        let dir = TempDir::new().unwrap();
        let mut log = AuditLog::open(&test_config(&dir)).unwrap();

        log.append(AuditLevel::Info, "Surveillance session started")
            .unwrap();
        log.append(AuditLevel::Warning, "Registry sync failed").unwrap();
        log.close().unwrap();

        let content = read_log(&log);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[INFO] "));
        assert!(lines[0].ends_with(" - Surveillance session started"));
        assert!(lines[1].starts_with("[WARNING] "));
    }

    #[test]
    fn test_daily_file_carries_prefix() {
        let dir = TempDir::new().unwrap();
        let mut log = AuditLog::open(&test_config(&dir)).unwrap();
        log.append(AuditLevel::Error, "Camera bind failed").unwrap();
        log.close().unwrap();

        let names: Vec<String> = fs::read_dir(log.directory())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("vision_audit."));
    }

    #[test]
    fn test_entries_preserve_append_order() {
        let dir = TempDir::new().unwrap();
        let mut log = AuditLog::open(&test_config(&dir)).unwrap();

        for i in 0..5 {
            log.append(AuditLevel::Info, &format!("entry {}", i)).unwrap();
        }
        log.close().unwrap();

        let content = read_log(&log);
        let suffixes: Vec<String> = content
            .lines()
            .map(|l| l.rsplit(" - ").next().unwrap().to_string())
            .collect();
        assert_eq!(suffixes, vec!["entry 0", "entry 1", "entry 2", "entry 3", "entry 4"]);
    }
}
