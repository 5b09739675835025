//! # TidyGuard
//!
//! The guarded deletion and cleanup-orchestration engine behind a macOS
//! cleanup utility.
//!
//! - **PathGuard**: classifies every path as allowed, user-excluded, or
//!   structurally restricted before anything is touched
//! - **Privilege escalation**: one confirmation, a privileged helper daemon,
//!   and an administrator-prompt fallback when the helper is unavailable
//! - **Orchestration**: pluggable per-category executors, selection that
//!   survives rescans, weighted progress, and partial-failure run summaries

pub mod cleaner;
pub mod cli;
pub mod common;
pub mod guard;
pub mod privilege;
pub mod scanner;
