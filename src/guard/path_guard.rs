use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::exclusions::{ExclusionStore, MemoryExclusions};
use crate::common::errors::GuardViolation;

/// Classification of a path before anything is allowed to touch it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    /// Protected by the user's exclusion list
    Excluded,
    /// Structurally unsafe (empty or the filesystem root). Never executed upon.
    Restricted,
}

/// Result of classifying a batch that contained no restricted path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardFilter {
    pub permitted: Vec<PathBuf>,
    pub excluded: Vec<PathBuf>,
}

/// Normalize a path into the absolute, canonical form used for every guard
/// comparison.
///
/// Expands a leading `~`, anchors relative paths at the current directory and
/// resolves `.`, `..`, duplicate separators and trailing slashes lexically.
/// Symlinks are never followed, so the result is the same whether or not the
/// path exists. Blank input yields the empty path.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let raw = path.to_string_lossy();
    if raw.trim().is_empty() {
        return PathBuf::new();
    }

    let expanded = match (&*raw, dirs::home_dir()) {
        ("~", Some(home)) => home,
        (s, Some(home)) if s.starts_with("~/") => home.join(&s[2..]),
        _ => path.to_path_buf(),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(expanded)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // popping at the root leaves the root in place
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

fn is_root(path: &Path) -> bool {
    path.parent().is_none() && path.has_root()
}

/// Decides whether a path may be touched.
///
/// Stateless apart from the injected exclusion store, which is read on every
/// decision so a toggle in preferences takes effect immediately.
#[derive(Clone)]
pub struct PathGuard {
    store: Arc<dyn ExclusionStore>,
}

impl std::fmt::Debug for PathGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathGuard")
            .field("exclusions", &self.store.exclusions())
            .finish()
    }
}

impl PathGuard {
    pub fn new(store: Arc<dyn ExclusionStore>) -> Self {
        Self { store }
    }

    /// A guard with an empty in-memory exclusion set
    pub fn without_exclusions() -> Self {
        Self::new(Arc::new(MemoryExclusions::default()))
    }

    fn exclusion_set(&self) -> HashSet<PathBuf> {
        self.store
            .exclusions()
            .iter()
            .map(normalize)
            .filter(|p| !p.as_os_str().is_empty())
            .collect()
    }

    fn classify(normalized: &Path, exclusions: &HashSet<PathBuf>) -> GuardDecision {
        if normalized.as_os_str().is_empty() || is_root(normalized) {
            GuardDecision::Restricted
        } else if exclusions.contains(normalized) {
            GuardDecision::Excluded
        } else {
            GuardDecision::Allow
        }
    }

    pub fn decision(&self, path: impl AsRef<Path>) -> GuardDecision {
        Self::classify(&normalize(path), &self.exclusion_set())
    }

    /// Classify a batch. Any restricted path rejects the whole batch;
    /// otherwise paths are split into permitted and excluded, normalized.
    pub fn filter<I, P>(&self, paths: I) -> Result<GuardFilter, GuardViolation>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let exclusions = self.exclusion_set();
        let mut result = GuardFilter::default();
        let mut restricted = Vec::new();

        for path in paths {
            let normalized = normalize(path);
            match Self::classify(&normalized, &exclusions) {
                GuardDecision::Allow => result.permitted.push(normalized),
                GuardDecision::Excluded => result.excluded.push(normalized),
                GuardDecision::Restricted => restricted.push(normalized),
            }
        }

        if !restricted.is_empty() {
            tracing::warn!(count = restricted.len(), "guard rejected batch with restricted paths");
            return Err(GuardViolation::RestrictedPath { paths: restricted });
        }
        Ok(result)
    }

    /// Normalized path if it may be touched
    pub fn ensure_allowed(&self, path: impl AsRef<Path>) -> Result<PathBuf, GuardViolation> {
        let filtered = self.filter([path])?;
        filtered
            .permitted
            .into_iter()
            .next()
            .ok_or(GuardViolation::ExcludedPath {
                paths: filtered.excluded,
            })
    }

    /// Add or remove a user exclusion. The path is normalized before it is stored.
    pub fn set_excluded(&self, path: impl AsRef<Path>, excluded: bool) -> anyhow::Result<()> {
        let normalized = normalize(path);
        if normalized.as_os_str().is_empty() {
            anyhow::bail!("Cannot exclude an empty path");
        }
        self.store
            .set_excluded(&normalized.to_string_lossy(), excluded)
    }

    /// Current exclusions, normalized and sorted
    pub fn exclusions(&self) -> Vec<PathBuf> {
        let mut list: Vec<PathBuf> = self.exclusion_set().into_iter().collect();
        list.sort();
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_with(paths: &[&str]) -> PathGuard {
        PathGuard::new(Arc::new(MemoryExclusions::with_paths(paths.iter().copied())))
    }

    #[test]
    fn test_normalize_resolves_dots_and_slashes() {
        assert_eq!(normalize("/a/./b//c/"), PathBuf::from("/a/b/c"));
        assert_eq!(normalize("/a/b/../c"), PathBuf::from("/a/c"));
        assert_eq!(normalize("/../.."), PathBuf::from("/"));
        assert_eq!(normalize("/a/.."), PathBuf::from("/"));
    }

    #[test]
    fn test_normalize_blank_is_empty() {
        assert_eq!(normalize(""), PathBuf::new());
        assert_eq!(normalize("   "), PathBuf::new());
    }

    #[test]
    fn test_normalize_relative_is_absolute() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(normalize("x/y"), cwd.join("x/y"));
    }

    #[test]
    fn test_normalize_expands_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(normalize("~/Library/Caches"), home.join("Library/Caches"));
            assert_eq!(normalize("~"), home);
        }
    }

    #[test]
    fn test_restricted_inputs() {
        let guard = PathGuard::without_exclusions();
        assert_eq!(guard.decision(""), GuardDecision::Restricted);
        assert_eq!(guard.decision("/"), GuardDecision::Restricted);
        assert_eq!(guard.decision("//"), GuardDecision::Restricted);
        assert_eq!(guard.decision("/tmp/.."), GuardDecision::Restricted);
        assert_eq!(guard.decision("/tmp"), GuardDecision::Allow);
    }

    #[test]
    fn test_restricted_wins_over_exclusion() {
        let guard = guard_with(&["/"]);
        assert_eq!(guard.decision("/"), GuardDecision::Restricted);
    }

    #[test]
    fn test_exclusion_is_exact_not_prefix() {
        let guard = guard_with(&["/Users/x/Library/Caches/app"]);
        assert_eq!(
            guard.decision("/Users/x/Library/Caches/app/"),
            GuardDecision::Excluded
        );
        assert_eq!(
            guard.decision("/Users/x/Library/Caches/app/../app"),
            GuardDecision::Excluded
        );
        assert_eq!(
            guard.decision("/Users/x/Library/Caches/app/sub"),
            GuardDecision::Allow
        );
        assert_eq!(
            guard.decision("/Users/x/Library/Caches/application"),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_unnormalized_exclusion_entries_still_match() {
        let guard = guard_with(&["/Users/x/Library/Caches/./app//"]);
        assert_eq!(
            guard.decision("/Users/x/Library/Caches/app"),
            GuardDecision::Excluded
        );
    }

    #[test]
    fn test_filter_partitions() {
        let guard = guard_with(&["/Users/x/Library/Caches/app"]);
        let result = guard
            .filter(["/Users/x/Library/Caches/app", "/Users/x/tmp/a"])
            .unwrap();
        assert_eq!(result.permitted, vec![PathBuf::from("/Users/x/tmp/a")]);
        assert_eq!(
            result.excluded,
            vec![PathBuf::from("/Users/x/Library/Caches/app")]
        );
    }

    #[test]
    fn test_filter_fails_closed_on_any_restricted() {
        let guard = PathGuard::without_exclusions();
        let err = guard.filter(["/tmp/a", "/", "", "/tmp/b"]).unwrap_err();
        assert_eq!(
            err,
            GuardViolation::RestrictedPath {
                paths: vec![PathBuf::from("/"), PathBuf::new()]
            }
        );
    }

    #[test]
    fn test_ensure_allowed() {
        let guard = guard_with(&["/tmp/keep"]);
        assert_eq!(
            guard.ensure_allowed("/tmp/./a").unwrap(),
            PathBuf::from("/tmp/a")
        );
        assert!(matches!(
            guard.ensure_allowed("/tmp/keep"),
            Err(GuardViolation::ExcludedPath { .. })
        ));
        assert!(matches!(
            guard.ensure_allowed("/"),
            Err(GuardViolation::RestrictedPath { .. })
        ));
    }

    #[test]
    fn test_set_excluded_takes_effect_immediately() {
        let guard = PathGuard::without_exclusions();
        assert_eq!(guard.decision("/tmp/a"), GuardDecision::Allow);
        guard.set_excluded("/tmp/./a/", true).unwrap();
        assert_eq!(guard.decision("/tmp/a"), GuardDecision::Excluded);
        assert_eq!(guard.exclusions(), vec![PathBuf::from("/tmp/a")]);
        guard.set_excluded("/tmp/a", false).unwrap();
        assert_eq!(guard.decision("/tmp/a"), GuardDecision::Allow);
        assert!(guard.set_excluded("", true).is_err());
    }
}
