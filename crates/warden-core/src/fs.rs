//! Owner-only filesystem helpers.
//!
//! Every file Warden writes (audit trail, vault blobs, plaintext mirrors)
//! is created with mode `0o600` at open time so there is no world-readable
//! window between creation and a later `chmod`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Create a directory (and parents) and restrict it to the owner (`0o700`).
///
/// # Errors
///
/// Returns an error if creation or permission setting fails.
pub fn create_private_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Open a file for appending, creating it owner-only if absent.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn open_private_append(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Write `contents` to `path`, replacing any previous content. The file is
/// created owner-only and flushed to disk before returning.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    // `mode` only applies on creation; tighten pre-existing files too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Read a file, refusing to follow symlinks.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the path is a symlink or cannot be read.
pub fn read_regular(path: &Path) -> io::Result<Option<Vec<u8>>> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if meta.file_type().is_symlink() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to read {}: path is a symlink", path.display()),
        ));
    }
    std::fs::read(path).map(Some)
}
