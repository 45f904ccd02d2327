//! The JSON Lines writer.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};
use warden_core::SoftOutcome;
use warden_core::fs::{create_private_dir, open_private_append};

use crate::entry::AuditLogEntry;
use crate::error::{AuditError, AuditResult};

const OPERATION: &str = "audit.append";

/// Append-only audit trail.
///
/// The file is opened lazily on the first append (created `0o600`, parent
/// directory `0o700` if missing) and the handle is reused for every later
/// append. Failures never propagate: they are logged and returned as
/// [`SoftOutcome::Degraded`], and the next append tries to open the file
/// again.
#[derive(Debug)]
pub struct AuditLog {
    path: Option<PathBuf>,
    handle: Mutex<Option<File>>,
}

impl AuditLog {
    /// Audit trail written to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            handle: Mutex::new(None),
        }
    }

    /// A log that records nothing. Every append is [`SoftOutcome::Skipped`].
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            path: None,
            handle: Mutex::new(None),
        }
    }

    /// The log file path, if enabled.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one entry as a single line.
    pub fn append(&self, entry: &AuditLogEntry) -> SoftOutcome {
        let Some(path) = self.path.as_deref() else {
            return SoftOutcome::Skipped;
        };

        let mut line = match entry.to_line() {
            Ok(line) => line,
            Err(e) => return SoftOutcome::degraded(OPERATION, e).log(),
        };
        line.push('\n');

        let mut handle = self.handle.lock().unwrap_or_else(|e| {
            warn!("audit log lock poisoned, recovering");
            e.into_inner()
        });

        if handle.is_none() {
            match open_log(path) {
                Ok(file) => {
                    debug!(path = %path.display(), "opened audit log");
                    *handle = Some(file);
                },
                Err(e) => {
                    return SoftOutcome::degraded(
                        OPERATION,
                        format!("cannot open {}: {e}", path.display()),
                    )
                    .log();
                },
            }
        }

        let Some(file) = handle.as_mut() else {
            return SoftOutcome::degraded(OPERATION, "audit log handle unavailable").log();
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            // Drop the handle so the next append reopens the file.
            *handle = None;
            return SoftOutcome::degraded(
                OPERATION,
                format!("write to {} failed: {e}", path.display()),
            )
            .log();
        }
        SoftOutcome::Completed
    }

    /// Close the cached handle. The next append reopens the file.
    pub fn reset(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(|e| {
            warn!("audit log lock poisoned, recovering");
            e.into_inner()
        });
        *handle = None;
    }
}

fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        create_private_dir(parent)?;
    }
    open_private_append(path)
}

/// Read every entry from an audit file. A missing file yields no entries.
///
/// # Errors
///
/// Returns [`AuditError::IoError`] if the file cannot be read, or
/// [`AuditError::MalformedEntry`] for the first line that does not parse.
pub fn read_entries(path: &Path) -> AuditResult<Vec<AuditLogEntry>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|e| AuditError::MalformedEntry {
            line: index.saturating_add(1),
            reason: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{BlockReason, MAX_CONTENT_CHARS};

    #[test]
    fn test_two_appends_two_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbound.jsonl");
        let log = AuditLog::new(&path);

        assert_eq!(
            log.append(&AuditLogEntry::sent("telegram", "alice", "first")),
            SoftOutcome::Completed
        );
        assert_eq!(
            log.append(&AuditLogEntry::blocked(
                "telegram",
                "alice",
                "second",
                BlockReason::RateLimit
            )),
            SoftOutcome::Completed
        );

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries[0].content, "first");
        assert_eq!(entries[1].block_reason, Some(BlockReason::RateLimit));
    }

    #[test]
    fn test_long_content_truncated_to_exact_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbound.jsonl");
        let log = AuditLog::new(&path);

        let _ = log.append(&AuditLogEntry::sent("sms", "bob", "x".repeat(25_000)));
        let entries = read_entries(&path).unwrap();
        assert_eq!(entries[0].content.chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn test_broken_path_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let log = AuditLog::new(blocker.join("outbound.jsonl"));

        let outcome = log.append(&AuditLogEntry::sent("sms", "bob", "hi"));
        assert!(outcome.is_degraded());
        // Still degraded, never panics.
        assert!(log.append(&AuditLogEntry::sent("sms", "bob", "hi")).is_degraded());
    }

    #[test]
    fn test_disabled_log_skips() {
        let log = AuditLog::disabled();
        assert!(log.path().is_none());
        assert_eq!(
            log.append(&AuditLogEntry::sent("sms", "bob", "hi")),
            SoftOutcome::Skipped
        );
    }

    #[test]
    fn test_creates_private_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("outbound.jsonl");
        let log = AuditLog::new(&path);
        let _ = log.append(&AuditLogEntry::sent("sms", "bob", "hi"));
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let file_mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(file_mode & 0o777, 0o600);
            let dir_mode = std::fs::metadata(path.parent().unwrap())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(dir_mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_reset_reopens_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbound.jsonl");
        let log = AuditLog::new(&path);
        let _ = log.append(&AuditLogEntry::sent("sms", "bob", "one"));

        std::fs::remove_file(&path).unwrap();
        log.reset();
        let _ = log.append(&AuditLogEntry::sent("sms", "bob", "two"));

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "two");
    }

    #[test]
    fn test_read_entries_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_entries(&dir.path().join("missing")).unwrap().is_empty());

        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"not\":\"an entry\"}\n").unwrap();
        let err = read_entries(&path).unwrap_err();
        assert!(matches!(err, AuditError::MalformedEntry { line: 1, .. }));
    }
}
