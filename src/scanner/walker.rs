use rayon::prelude::*;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

use super::targets::ScanTarget;
use crate::common::permissions;

/// One direct child of a target root
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

/// What walking a target produced
#[derive(Debug, Default)]
pub struct TargetListing {
    pub entries: Vec<FileEntry>,
    pub errors: Vec<String>,
}

/// List the cleanup candidates of a target: every direct child of each of its
/// roots, sized in parallel.
pub fn walk_target(target: &ScanTarget) -> TargetListing {
    let mut listing = TargetListing::default();
    let mut children = Vec::new();

    for base_path in expand_paths(&target.paths) {
        if !base_path.exists() {
            continue;
        }
        if permissions::is_sip_protected(&base_path) {
            listing
                .errors
                .push(format!("Skipped SIP-protected: {}", base_path.display()));
            continue;
        }

        for entry in WalkDir::new(&base_path)
            .follow_links(false)
            .min_depth(1)
            .max_depth(1)
        {
            match entry {
                Ok(entry) => {
                    let name = entry.file_name().to_string_lossy();
                    if target.skip_names.iter().any(|s| s.as_str() == name) {
                        continue;
                    }
                    children.push(entry.into_path());
                }
                Err(e) => listing.errors.push(format!("{}: {}", base_path.display(), e)),
            }
        }
    }

    let min_age = target
        .min_age_days
        .map(|days| Duration::from_secs(days as u64 * 86400));

    listing.entries = children
        .par_iter()
        .filter_map(|path| describe(path, min_age))
        .collect();
    listing.entries.sort_by(|a, b| a.path.cmp(&b.path));
    listing.entries.dedup_by(|a, b| a.path == b.path);
    listing
}

fn describe(path: &Path, min_age: Option<Duration>) -> Option<FileEntry> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    let modified = metadata.modified().ok();

    if let (Some(min_age), Some(mod_time)) = (min_age, modified) {
        let age = SystemTime::now()
            .duration_since(mod_time)
            .unwrap_or_default();
        if age < min_age {
            return None;
        }
    }

    let is_dir = metadata.is_dir();
    // Use actual physical disk usage (not logical size) for sparse files
    let size_bytes = if is_dir {
        dir_size(path)
    } else {
        metadata.blocks() * 512
    };

    Some(FileEntry {
        path: path.to_path_buf(),
        size_bytes,
        modified,
        is_dir,
    })
}

/// Expand `~`, `$TMPDIR` and glob patterns in paths
pub fn expand_paths(paths: &[String]) -> Vec<PathBuf> {
    let home = dirs::home_dir();
    let tmpdir = std::env::temp_dir();
    let mut expanded = Vec::new();

    for path_str in paths {
        let resolved = if path_str == "$TMPDIR" {
            tmpdir.to_string_lossy().into_owned()
        } else if let Some(rest) = path_str.strip_prefix("~/") {
            match &home {
                Some(home) => home.join(rest).to_string_lossy().into_owned(),
                None => continue,
            }
        } else {
            path_str.clone()
        };

        // Handle glob patterns
        if resolved.contains('*') {
            if let Ok(entries) = glob::glob(&resolved) {
                expanded.extend(entries.filter_map(|e| e.ok()));
            }
        } else {
            expanded.push(PathBuf::from(resolved));
        }
    }

    expanded.sort();
    expanded.dedup();
    expanded
}

/// Calculate total size of a directory (physical disk usage)
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.metadata().map(|m| m.blocks() * 512).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::CategoryStep;
    use crate::scanner::targets::SafetyLevel;
    use tempfile::TempDir;

    fn target_at(root: &Path) -> ScanTarget {
        ScanTarget {
            name: "test".into(),
            step: CategoryStep::UserCaches,
            paths: vec![root.to_string_lossy().into_owned()],
            safety: SafetyLevel::Safe,
            reason: "test".into(),
            skip_names: vec!["skipme".into()],
            min_age_days: None,
        }
    }

    #[test]
    fn test_lists_direct_children_only() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("app/deep/er")).unwrap();
        std::fs::write(dir.path().join("app/deep/er/blob"), vec![0u8; 8192]).unwrap();
        std::fs::write(dir.path().join("loose.log"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("skipme")).unwrap();

        let listing = walk_target(&target_at(dir.path()));
        let names: Vec<_> = listing
            .entries
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["app", "loose.log"]);

        let app = &listing.entries[0];
        assert!(app.is_dir);
        assert!(app.size_bytes >= 8192);
    }

    #[test]
    fn test_min_age_filters_fresh_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fresh.log"), b"x").unwrap();
        let mut target = target_at(dir.path());
        target.min_age_days = Some(1);
        assert!(walk_target(&target).entries.is_empty());
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let listing = walk_target(&target_at(&dir.path().join("nope")));
        assert!(listing.entries.is_empty());
        assert!(listing.errors.is_empty());
    }

    #[test]
    fn test_expand_paths_globs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("A/Caches")).unwrap();
        std::fs::create_dir_all(dir.path().join("B/Caches")).unwrap();
        let pattern = format!("{}/*/Caches", dir.path().display());
        let expanded = expand_paths(&[pattern]);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expand_paths(&["$TMPDIR".into()]), vec![std::env::temp_dir()]);
    }
}
