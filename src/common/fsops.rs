use std::path::Path;

use crate::common::errors::ExecutionFailure;

/// Delete a single file or directory permanently.
///
/// Symlinks are removed themselves, never followed. A path that is already
/// gone counts as removed.
pub fn remove_path(path: &Path) -> Result<(), ExecutionFailure> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ExecutionFailure::from_io(path, e)),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ExecutionFailure::from_io(path, e)),
    }
}
