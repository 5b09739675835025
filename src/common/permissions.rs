use std::path::Path;

use crate::common::errors::{ExecutionFailure, PrivilegeDenial};

/// Known SIP-protected paths that cannot be modified, even as root
const SIP_PATHS: &[&str] = &[
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/Applications/Utilities",
];

/// Paths requiring Full Disk Access
const FDA_PATHS: &[&str] = &[
    "Library/Mail",
    "Library/Messages",
    "Library/Safari",
    "Library/Cookies",
    "Library/HomeKit",
    "Library/IdentityServices",
    "Library/Metadata/CoreSpotlight",
    "Library/PersonalizationPortrait",
    "Library/Suggestions",
    "Library/Containers/com.apple.",
];

/// Check if a path is SIP-protected
pub fn is_sip_protected(path: &Path) -> bool {
    SIP_PATHS.iter().any(|p| path.starts_with(p))
}

/// Check if a path likely requires Full Disk Access
pub fn requires_full_disk_access(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    FDA_PATHS.iter().any(|p| path_str.contains(p))
}

/// Get a helpful message for permission issues
pub fn permission_hint(path: &Path) -> String {
    if is_sip_protected(path) {
        "This path is protected by System Integrity Protection (SIP) and cannot be modified."
            .to_string()
    } else if requires_full_disk_access(path) {
        "Grant Full Disk Access in System Settings > Privacy & Security > Full Disk Access, then retry."
            .to_string()
    } else {
        format!(
            "Check file permissions for '{}', or approve the administrator prompt when asked.",
            path.display()
        )
    }
}

/// Recovery suggestion for an item-level failure, if there is one worth showing
pub fn execution_hint(failure: &ExecutionFailure) -> Option<String> {
    match failure {
        ExecutionFailure::PermissionDenied { path } => Some(permission_hint(path)),
        ExecutionFailure::Busy { .. } => {
            Some("Quit the application using these files and run the cleanup again.".to_string())
        }
        ExecutionFailure::NotFound { .. } | ExecutionFailure::Io { .. } => None,
    }
}

/// Recovery suggestion after a privileged removal did not go through
pub fn privilege_hint(denial: &PrivilegeDenial) -> String {
    match denial {
        PrivilegeDenial::Cancelled => {
            "Approve the administrator prompt to remove protected items.".to_string()
        }
        PrivilegeDenial::Unavailable(_) => {
            "Reinstall the TidyGuard helper, or run the cleanup again and approve the administrator prompt."
                .to_string()
        }
        PrivilegeDenial::Timeout => {
            "The privileged helper did not respond. Try again in a moment.".to_string()
        }
        PrivilegeDenial::ChannelFailure(_) => {
            "Try again, or remove the remaining items manually from Finder.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_sip_protected_paths() {
        assert!(is_sip_protected(Path::new("/System/Library")));
        assert!(is_sip_protected(Path::new("/usr/bin/ls")));
        assert!(!is_sip_protected(Path::new("/usr2/thing")));
        assert!(!is_sip_protected(Path::new("/tmp/test")));
    }

    #[test]
    fn test_fda_hint() {
        let hint = permission_hint(Path::new("/Users/x/Library/Mail/V10"));
        assert!(hint.contains("Full Disk Access"));
    }

    #[test]
    fn test_execution_hint_only_for_actionable_failures() {
        let missing = ExecutionFailure::NotFound { path: PathBuf::from("/tmp/a") };
        assert!(execution_hint(&missing).is_none());
        let busy = ExecutionFailure::Busy { path: PathBuf::from("/tmp/a") };
        assert!(execution_hint(&busy).unwrap().contains("Quit"));
    }
}
