//! Secure erase of plaintext files.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{CryptoError, CryptoResult};

const CHUNK: usize = 8192;

/// Overwrite a file with zeros, flush it to disk, then unlink it.
///
/// A missing file is not an error. Symlinks are unlinked without touching
/// their target.
///
/// # Errors
///
/// Returns [`CryptoError::IoError`] if the overwrite or the unlink fails.
pub fn secure_erase(path: &Path) -> CryptoResult<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CryptoError::IoError(e.to_string())),
    };

    if meta.is_file() {
        overwrite_with_zeros(path, meta.len()).map_err(|e| CryptoError::IoError(e.to_string()))?;
    }
    std::fs::remove_file(path).map_err(|e| CryptoError::IoError(e.to_string()))
}

fn overwrite_with_zeros(path: &Path, len: u64) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    let zeros = [0u8; CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = usize::try_from(remaining).map_or(CHUNK, |r| r.min(CHUNK));
        file.write_all(&zeros[..n])?;
        remaining = remaining.saturating_sub(n as u64);
    }
    file.sync_all()
}
