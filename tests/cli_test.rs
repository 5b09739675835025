use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary with HOME pointed at a scratch directory
fn tidyguard(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tidyguard").unwrap();
    cmd.env("HOME", home.path())
        .env("TMPDIR", home.path().join("tmp"))
        .env_remove("TIDYGUARD_LOG");
    cmd
}

// ─── Help & version ──────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    tidyguard(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("exclude"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("helper").not());
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    tidyguard(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tidyguard"));
}

// ─── Scan ────────────────────────────────────────────────────────────────────

#[test]
fn test_scan_json_output() {
    let home = TempDir::new().unwrap();
    tidyguard(&home)
        .args(["scan", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"categories\""));
}

#[test]
fn test_scan_lists_user_caches() {
    let home = TempDir::new().unwrap();
    let cache = home.path().join("Library/Caches/com.example.app");
    std::fs::create_dir_all(&cache).unwrap();
    std::fs::write(cache.join("blob"), vec![0u8; 4096]).unwrap();

    tidyguard(&home)
        .args(["scan", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.app"));
}

#[test]
fn test_excluded_cache_is_not_listed() {
    let home = TempDir::new().unwrap();
    let cache = home.path().join("Library/Caches/com.example.keep");
    std::fs::create_dir_all(&cache).unwrap();
    std::fs::write(cache.join("blob"), b"keep").unwrap();

    tidyguard(&home)
        .args(["exclude", "add"])
        .arg(&cache)
        .assert()
        .success();

    tidyguard(&home)
        .args(["scan", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.keep").not());
}

// ─── Clean ───────────────────────────────────────────────────────────────────

#[test]
fn test_clean_rejects_unknown_category() {
    let home = TempDir::new().unwrap();
    tidyguard(&home)
        .args(["clean", "--category", "downloads"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("downloads"));
}

#[test]
fn test_clean_dry_run_keeps_files() {
    let home = TempDir::new().unwrap();
    let cache = home.path().join("Library/Caches/com.example.app");
    std::fs::create_dir_all(&cache).unwrap();
    std::fs::write(cache.join("blob"), b"data").unwrap();

    tidyguard(&home)
        .args(["clean", "--dry-run", "--category", "user_caches", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove"));

    assert!(cache.join("blob").exists());
}

#[test]
fn test_clean_with_yes_removes_user_cache() {
    let home = TempDir::new().unwrap();
    let cache = home.path().join("Library/Caches/com.example.app");
    std::fs::create_dir_all(&cache).unwrap();
    std::fs::write(cache.join("blob"), b"data").unwrap();

    tidyguard(&home)
        .args(["clean", "--yes", "--category", "user_caches", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"));

    assert!(!cache.exists());
}

#[test]
fn test_clean_without_confirmation_is_refused_when_piped() {
    let home = TempDir::new().unwrap();
    let cache = home.path().join("Library/Caches/com.example.app");
    std::fs::create_dir_all(&cache).unwrap();
    std::fs::write(cache.join("blob"), b"data").unwrap();

    tidyguard(&home)
        .args(["clean", "--category", "user_caches"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    assert!(cache.exists());
}

// ─── Exclusions ──────────────────────────────────────────────────────────────

#[test]
fn test_exclude_add_list_remove() {
    let home = TempDir::new().unwrap();
    let target = home.path().join("Library/Caches/com.example.keep");

    tidyguard(&home)
        .args(["exclude", "add"])
        .arg(format!("{}/", target.display()))
        .assert()
        .success();

    tidyguard(&home)
        .args(["exclude", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.keep"));

    tidyguard(&home)
        .args(["exclude", "remove"])
        .arg(&target)
        .assert()
        .success();

    tidyguard(&home)
        .args(["exclude", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No excluded paths"));
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_and_show() {
    let home = TempDir::new().unwrap();
    tidyguard(&home)
        .args(["config", "init"])
        .assert()
        .success();

    assert!(home.path().join(".tidyguard/config.toml").exists());

    tidyguard(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allow_admin_prompt"));
}

#[test]
fn test_config_set_known_and_unknown_keys() {
    let home = TempDir::new().unwrap();
    tidyguard(&home)
        .args(["config", "set", "select_caution_items", "true"])
        .assert()
        .success();

    tidyguard(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("select_caution_items = true"));

    tidyguard(&home)
        .args(["config", "set", "no_such_key", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

// ─── Completions ─────────────────────────────────────────────────────────────

#[test]
fn test_bash_completions() {
    let home = TempDir::new().unwrap();
    tidyguard(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tidyguard"));
}
