use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use tidyguard::cleaner::{CategoryStep, CleanupExecutor, ProgressTracker};
use tidyguard::common::config::Config;
use tidyguard::common::errors::{ExecutionFailure, PrivilegeDenial};
use tidyguard::common::{format, permissions};
use tidyguard::privilege::{AdminShellChannel, DenyAll, HelperClient, PrivilegeEscalator};
use tidyguard::scanner::executor::TargetExecutor;
use tidyguard::scanner::targets::{self, SafetyLevel, ScanTarget};
use tidyguard::scanner::walker;

// ─── Format tests ─────────────────────────────────────────────────────────────

#[test]
fn test_format_size_boundaries() {
    assert_eq!(format::format_size(0), "0 B");
    assert_eq!(format::format_size(1023), "1023 B");
    assert_eq!(format::format_size(1024), "1.0 KB");
    assert_eq!(format::format_size(1024 * 1024), "1.00 MB");
    assert!(format::format_size(u64::MAX).contains("TB"));
}

#[test]
fn test_format_count_plural() {
    assert_eq!(format::format_count(0), "0 items");
    assert_eq!(format::format_count(1), "1 item");
    assert_eq!(format::format_count(12), "12 items");
}

#[test]
fn test_truncate_edge_cases() {
    assert_eq!(format::truncate("", 5), "");
    assert_eq!(format::truncate("abc", 3), "abc");
    assert_eq!(format::truncate("abcd", 3), "...");
    assert_eq!(format::truncate("abcde", 4), "a...");
}

// ─── Permissions tests ────────────────────────────────────────────────────────

#[test]
fn test_sip_protected_paths() {
    assert!(permissions::is_sip_protected(Path::new("/System/Library")));
    assert!(permissions::is_sip_protected(Path::new("/usr/bin/ls")));
    assert!(!permissions::is_sip_protected(Path::new("/tmp/test")));
}

#[test]
fn test_recovery_hints() {
    let denied = ExecutionFailure::PermissionDenied {
        path: PathBuf::from("/Users/test/Library/Safari/History.db"),
    };
    assert!(permissions::execution_hint(&denied)
        .unwrap()
        .contains("Full Disk Access"));

    let missing = ExecutionFailure::NotFound {
        path: PathBuf::from("/tmp/gone"),
    };
    assert!(permissions::execution_hint(&missing).is_none());

    assert!(permissions::privilege_hint(&PrivilegeDenial::Cancelled).contains("administrator prompt"));
}

// ─── Config tests ─────────────────────────────────────────────────────────────

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert!(config.exclude_paths.is_empty());
    assert!(config.helper.allow_admin_prompt);
    assert!(!config.select_caution_items);
}

#[test]
fn test_config_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let mut config = Config::default();
    config.set("helper.allow_admin_prompt", "false").unwrap();
    config.set("output_format", "json").unwrap();
    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), config);
    assert!(config.set("output_format", "yaml").is_err());
}

// ─── Target tests ─────────────────────────────────────────────────────────────

#[test]
fn test_every_category_has_a_target() {
    let all = targets::all_targets();
    for step in CategoryStep::ALL {
        assert!(
            all.iter().any(|t| t.step == step),
            "no target for {}",
            step
        );
    }
    for t in &all {
        assert!(!t.name.is_empty());
        assert!(!t.paths.is_empty());
        assert!(!t.reason.is_empty());
    }
}

// ─── Walker tests ─────────────────────────────────────────────────────────────

#[test]
fn test_expand_paths_tilde() {
    let expanded = walker::expand_paths(&["~/Library/Caches".to_string()]);
    assert_eq!(expanded.len(), 1);
    assert!(!expanded[0].to_string_lossy().contains('~'));
    if let Some(home) = dirs::home_dir() {
        assert!(expanded[0].starts_with(&home));
    }
}

#[test]
fn test_dir_size_nested() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("subdir");
    std::fs::create_dir_all(&sub).unwrap();
    std::fs::write(dir.path().join("root.txt"), "abc").unwrap();
    std::fs::write(sub.join("nested.txt"), "defgh").unwrap();

    // Physical disk usage is block-aligned
    let size = walker::dir_size(dir.path());
    assert!(size >= 8, "Should include nested files, got {}", size);
    assert_eq!(walker::dir_size(Path::new("/nonexistent/path/xyz")), 0);
}

fn target_at(dir: &Path, safety: SafetyLevel) -> ScanTarget {
    ScanTarget {
        name: "Test Cache".into(),
        step: CategoryStep::UserCaches,
        paths: vec![dir.to_string_lossy().into_owned()],
        safety,
        reason: "Test data".into(),
        skip_names: vec!["keep-me".into()],
        min_age_days: None,
    }
}

#[test]
fn test_walk_target_lists_direct_children() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("app/deep/deeper")).unwrap();
    std::fs::write(dir.path().join("app/deep/deeper/blob"), "x".repeat(100)).unwrap();
    std::fs::write(dir.path().join("loose.log"), "log").unwrap();
    std::fs::create_dir_all(dir.path().join("keep-me")).unwrap();

    let listing = walker::walk_target(&target_at(dir.path(), SafetyLevel::Safe));
    let names: Vec<_> = listing
        .entries
        .iter()
        .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["app", "loose.log"]);
    assert!(listing.entries[0].is_dir);
    assert!(listing.entries[0].size_bytes >= 100);
}

// ─── Executor tests ──────────────────────────────────────────────────────────

fn escalator(dir: &Path) -> Arc<PrivilegeEscalator> {
    Arc::new(PrivilegeEscalator::new(
        Arc::new(DenyAll),
        Arc::new(HelperClient::new(dir.join("missing.sock"))),
        Some(Arc::new(AdminShellChannel::default())),
    ))
}

#[tokio::test]
async fn test_caution_items_start_unselected() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("Caches");
    std::fs::create_dir_all(root.join("shared")).unwrap();

    let executor = TargetExecutor::new(
        CategoryStep::UserCaches,
        vec![target_at(&root, SafetyLevel::Caution)],
        escalator(dir.path()),
    );
    let category = executor.scan().await.unwrap();
    assert_eq!(category.items.len(), 1);
    assert!(!category.items[0].selected);
    assert_eq!(category.items[0].detail.as_deref(), Some("Test data"));
}

#[tokio::test]
async fn test_executor_removes_and_tracks_every_item() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("Caches");
    std::fs::create_dir_all(root.join("a/inner")).unwrap();
    std::fs::write(root.join("a/inner/blob"), "data").unwrap();
    std::fs::write(root.join("b.cache"), "data").unwrap();

    let executor = TargetExecutor::new(
        CategoryStep::UserCaches,
        vec![target_at(&root, SafetyLevel::Safe)],
        escalator(dir.path()),
    );
    let category = executor.scan().await.unwrap();
    let items: Vec<_> = category.selected_items().cloned().collect();
    assert_eq!(items.len(), 2);

    let tracker = ProgressTracker::new(items.len());
    let outcome = executor.execute(&items, false, &tracker, &|_| {}).await;
    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.message.starts_with("Removed 2 items"));
    assert_eq!(tracker.fraction(), 1.0);
    assert!(!root.join("a").exists());
    assert!(!root.join("b.cache").exists());
    assert!(root.exists());
}
