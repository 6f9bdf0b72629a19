//! Filesystem adapter: existence probe and file writes.

use std::path::Path;

use crate::error::{ActionError, ProbeError};

/// Whether the path exists (file, directory, or symlink).
///
/// Uses `symlink_metadata` so a dangling symlink still counts as present.
///
/// # Errors
///
/// Returns [`ProbeError::Unavailable`] for I/O errors other than
/// not-found (e.g. permission denied on a parent directory): those mean the
/// state cannot be determined, which is different from "absent".
pub(super) fn exists(path: &Path) -> Result<bool, ProbeError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProbeError::Unavailable(format!(
            "cannot stat {}: {e}",
            path.display()
        ))),
    }
}

/// Write `content` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ActionError::Io`] when a directory cannot be created or the
/// file cannot be written.
pub(super) fn write(path: &Path, content: &str) -> Result<(), ActionError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            ActionError::Io(format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    std::fs::write(path, content)
        .map_err(|e| ActionError::Io(format!("cannot write {}: {e}", path.display())))
}
