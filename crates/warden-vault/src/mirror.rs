//! Plaintext mirror in a memory-backed directory.
//!
//! Some collaborators need the decrypted document as a file path. The mirror
//! writes it owner-only under a tmpfs directory (`/dev/shm` by default) so
//! the plaintext never touches persistent storage, and wipes it on shutdown.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;
use warden_core::SoftOutcome;
use warden_core::fs::write_private;
use warden_crypto::secure_erase;

/// A single mirrored file.
#[derive(Debug)]
pub struct MemoryMirror {
    path: PathBuf,
    written: AtomicBool,
}

impl MemoryMirror {
    /// Mirror named `file_name` inside `dir`, scoped to this process.
    #[must_use]
    pub fn new(dir: &Path, file_name: &str) -> Self {
        let path = dir.join(format!("warden-{}-{file_name}", std::process::id()));
        Self {
            path,
            written: AtomicBool::new(false),
        }
    }

    /// Where the mirror lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the mirror currently holds plaintext.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.written.load(Ordering::Acquire)
    }

    /// Write `contents` to the mirror.
    pub fn write(&self, contents: &[u8]) -> SoftOutcome {
        match write_private(&self.path, contents) {
            Ok(()) => {
                self.written.store(true, Ordering::Release);
                debug!(path = %self.path.display(), "mirrored document to memory");
                SoftOutcome::Completed
            },
            Err(e) => SoftOutcome::degraded(
                "vault.mirror",
                format!("cannot write {}: {e}", self.path.display()),
            )
            .log(),
        }
    }

    /// Securely erase the mirror, if written.
    pub fn wipe(&self) -> SoftOutcome {
        if !self.written.swap(false, Ordering::AcqRel) {
            return SoftOutcome::Skipped;
        }
        match secure_erase(&self.path) {
            Ok(()) => SoftOutcome::Completed,
            Err(e) => SoftOutcome::degraded("vault.mirror_wipe", e).log(),
        }
    }
}
