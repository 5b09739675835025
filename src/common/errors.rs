use std::path::{Path, PathBuf};
use thiserror::Error;

// Typed errors for TidyGuard operations.
// `anyhow` stays at the top level for CLI error handling; these let the guard,
// privilege and executor layers be precise about why a removal did not happen.

/// A path-policy violation. Raised before any filesystem mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardViolation {
    /// One or more paths are structurally unsafe (empty or filesystem root).
    /// The whole batch is rejected.
    #[error("Refusing to touch restricted path(s): {}", join_paths(.paths))]
    RestrictedPath { paths: Vec<PathBuf> },

    /// Every candidate path is protected by the user's exclusion list.
    #[error("All candidate paths are excluded by your preferences: {}", join_paths(.paths))]
    ExcludedPath { paths: Vec<PathBuf> },
}

/// Why a privileged removal did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrivilegeDenial {
    /// The user declined or dismissed an administrator prompt
    #[error("administrator authorization was cancelled")]
    Cancelled,

    /// Helper missing, not installed, or failed to install
    #[error("privileged helper unavailable: {0}")]
    Unavailable(String),

    #[error("timed out")]
    Timeout,

    /// IPC or shell failure with the captured message
    #[error("{0}")]
    ChannelFailure(String),
}

/// A filesystem error while removing one specific item.
#[derive(Debug, Error)]
pub enum ExecutionFailure {
    #[error("Permission denied: '{}'", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Not found: '{}'", .path.display())]
    NotFound { path: PathBuf },

    #[error("Resource busy: '{}'", .path.display())]
    Busy { path: PathBuf },

    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// errno for "device or resource busy" on both Darwin and Linux
const EBUSY: i32 = 16;

impl ExecutionFailure {
    /// Classify an I/O error raised while removing `path`
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => ExecutionFailure::PermissionDenied { path },
            std::io::ErrorKind::NotFound => ExecutionFailure::NotFound { path },
            _ if err.raw_os_error() == Some(EBUSY) => ExecutionFailure::Busy { path },
            _ => ExecutionFailure::Io { path, source: err },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ExecutionFailure::PermissionDenied { path }
            | ExecutionFailure::NotFound { path }
            | ExecutionFailure::Busy { path }
            | ExecutionFailure::Io { path, .. } => path,
        }
    }

    /// Whether an administrator-level removal might succeed where this failed
    pub fn needs_privilege(&self) -> bool {
        matches!(self, ExecutionFailure::PermissionDenied { .. })
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_from_io_classifies_kinds() {
        let p = Path::new("/tmp/x");
        assert!(matches!(
            ExecutionFailure::from_io(p, io::Error::from(io::ErrorKind::PermissionDenied)),
            ExecutionFailure::PermissionDenied { .. }
        ));
        assert!(matches!(
            ExecutionFailure::from_io(p, io::Error::from(io::ErrorKind::NotFound)),
            ExecutionFailure::NotFound { .. }
        ));
        assert!(matches!(
            ExecutionFailure::from_io(p, io::Error::from_raw_os_error(EBUSY)),
            ExecutionFailure::Busy { .. }
        ));
    }

    #[test]
    fn test_only_permission_denied_needs_privilege() {
        let p = PathBuf::from("/tmp/x");
        assert!(ExecutionFailure::PermissionDenied { path: p.clone() }.needs_privilege());
        assert!(!ExecutionFailure::Busy { path: p }.needs_privilege());
    }

    #[test]
    fn test_restricted_message_lists_every_path() {
        let err = GuardViolation::RestrictedPath {
            paths: vec![PathBuf::from("/"), PathBuf::new()],
        };
        assert_eq!(
            err.to_string(),
            "Refusing to touch restricted path(s): '/', ''"
        );
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(PrivilegeDenial::Timeout.to_string(), "timed out");
    }
}
