//! Tarball extraction into a package directory.
//!
//! Registry tarballs wrap their contents in a single top-level directory
//! (conventionally `package/`, but not always; `@types/*` packages use
//! the bare package name). The first path segment of every entry is
//! stripped regardless of its literal value.

use crate::error::InstallError;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Extract a gzipped tarball into `dest`.
///
/// Entries are processed sequentially in archive order; tar does not
/// allow random access of a streaming reader. The cancellation token is
/// checked at every entry boundary.
///
/// # Errors
/// Returns `ARCHIVE_MALFORMED` for gzip/tar decode failures and
/// short/long writes, `FS_ERROR` for directory and file creation
/// failures, and `CANCELLED` if the token trips.
pub fn extract_tarball(
    bytes: &[u8],
    dest: &Path,
    cancel: &CancellationToken,
) -> Result<(), InstallError> {
    let gz = GzDecoder::new(bytes);
    let mut archive = Archive::new(gz);

    let entries = archive
        .entries()
        .map_err(|e| InstallError::archive(format!("failed to read tarball entries: {e}")))?;

    let mut count = 0usize;
    for entry in entries {
        if cancel.is_cancelled() {
            return Err(InstallError::cancelled());
        }

        let mut entry =
            entry.map_err(|e| InstallError::archive(format!("failed to read tarball entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| InstallError::archive(format!("failed to read entry path: {e}")))?
            .into_owned();

        let Some(stripped) = strip_wrapper(&path)? else {
            // The wrapper directory itself.
            continue;
        };
        let target = dest.join(&stripped);
        let header = entry.header();
        let mode = header.mode().ok();

        if header.entry_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                InstallError::fs(format!("unable to make directory {}: {e}", target.display()))
            })?;
            set_mode(&target, mode);
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                InstallError::fs(format!(
                    "unable to make directory for {}: {e}",
                    target.display()
                ))
            })?;
        }

        let size = header.size().unwrap_or(0);
        let mut file = File::create(&target)
            .map_err(|e| InstallError::fs(format!("unable to open {}: {e}", target.display())))?;
        let written = io::copy(&mut entry, &mut file)
            .map_err(|e| InstallError::archive(format!("unable to copy {}: {e}", target.display())))?;
        if written != size {
            return Err(InstallError::archive(format!(
                "unable to copy {}: wrote {written} bytes, expected {size}",
                target.display()
            )));
        }
        set_mode(&target, mode);
        count += 1;
    }

    debug!(dest = %dest.display(), files = count, "extracted tarball");
    Ok(())
}

/// Strip the first path segment of a tar entry, rejecting absolute paths
/// and `..` components. Returns `None` when nothing remains (the wrapper
/// directory entry itself).
fn strip_wrapper(path: &Path) -> Result<Option<PathBuf>, InstallError> {
    if path.is_absolute() {
        return Err(InstallError::archive(format!(
            "tarball contains absolute path: {}",
            path.display()
        )));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(InstallError::archive(format!(
            "tarball contains path traversal: {}",
            path.display()
        )));
    }

    let stripped: PathBuf = path.components().skip(1).collect();
    if stripped.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(stripped))
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Option<u32>) {}
