use std::path::{Path, PathBuf};

use crate::guard::normalize;

/// Paths that must NEVER be deleted under any circumstances.
/// This is a critical safety net against bugs in category executors.
const PROTECTED_PATHS: &[&str] = &[
    "/",
    "/System",
    "/Applications",
    "/Users",
    "/Library",
    "/usr",
    "/bin",
    "/sbin",
    "/var",
    "/etc",
    "/opt",
    "/private",
    "/cores",
    "/Volumes",
];

/// Paths under home that must never be deleted entirely
const PROTECTED_HOME_DIRS: &[&str] = &[
    "", // home dir itself
    "Desktop",
    "Documents",
    "Downloads",
    "Pictures",
    "Music",
    "Movies",
    "Library",
    "Applications",
    ".ssh",
    ".gnupg",
];

/// Per-user locations that only hold regenerable data
const USER_SAFE_ROOTS: &[&str] = &[
    "Library/Caches",
    "Library/Logs",
    "Library/Application Support",
];

/// Shared system-level equivalents
const SYSTEM_SAFE_ROOTS: &[&str] = &[
    "/tmp",
    "/private/tmp",
    "/var/folders",
    "/private/var/folders",
    "/var/log",
    "/private/var/log",
    "/Library/Caches",
    "/Library/Logs",
];

/// Check if a path is protected and should NEVER be deleted
pub fn is_protected(path: &Path) -> bool {
    if PROTECTED_PATHS.iter().any(|p| path == Path::new(p)) {
        return true;
    }

    if let Some(home) = dirs::home_dir() {
        return PROTECTED_HOME_DIRS.iter().any(|dir| {
            let protected_path = if dir.is_empty() {
                home.clone()
            } else {
                home.join(dir)
            };
            path == protected_path
        });
    }

    false
}

/// The allow-list of directories cleanup candidates must live under.
///
/// This is a second, independent layer next to [`crate::guard::PathGuard`]:
/// a candidate is kept only if both agree.
#[derive(Debug, Clone)]
pub struct SafeRoots {
    roots: Vec<PathBuf>,
}

impl SafeRoots {
    /// Build from explicit roots (normalized here)
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut roots: Vec<PathBuf> = roots
            .into_iter()
            .map(normalize)
            .filter(|p| !p.as_os_str().is_empty() && p != Path::new("/"))
            .collect();
        roots.sort();
        roots.dedup();
        Self { roots }
    }

    /// Built-in user cache/log/temp/support locations plus system equivalents
    pub fn system_default() -> Self {
        let mut roots = Self::system_roots();
        if let Some(home) = dirs::home_dir() {
            roots.extend(USER_SAFE_ROOTS.iter().map(|r| home.join(r)));
        }
        roots.push(std::env::temp_dir());
        Self::new(roots)
    }

    /// System locations plus the user locations under `home`.
    /// Used by the helper, which runs as root and serves someone else's home.
    pub fn for_home(home: &Path) -> Self {
        let mut roots = Self::system_roots();
        roots.extend(USER_SAFE_ROOTS.iter().map(|r| home.join(r)));
        Self::new(roots)
    }

    fn system_roots() -> Vec<PathBuf> {
        SYSTEM_SAFE_ROOTS.iter().map(PathBuf::from).collect()
    }

    /// Defaults plus additional roots
    pub fn with_extra<I, P>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut all = std::mem::take(&mut self.roots);
        all.extend(extra.into_iter().map(|p| p.as_ref().to_path_buf()));
        Self::new(all)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// True if `path` lies strictly inside one of the roots and is not itself
    /// a protected location. The root directories themselves are never candidates.
    pub fn contains(&self, path: &Path) -> bool {
        let path = normalize(path);
        if is_protected(&path) {
            return false;
        }
        self.roots
            .iter()
            .any(|root| path != *root && path.starts_with(root))
    }
}
