use serde::{Deserialize, Serialize};

use crate::cleaner::CategoryStep;

/// Safety level for a deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    /// Regenerated automatically, pre-selected
    Safe,
    /// Review recommended, not pre-selected
    Caution,
}

/// A scan target defines where to look and how to classify what's found.
///
/// Each direct child of a target path is one cleanup candidate.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub name: String,
    pub step: CategoryStep,
    pub paths: Vec<String>, // `~`, `$TMPDIR` and globs are expanded
    pub safety: SafetyLevel,
    pub reason: String,
    /// Child names never offered from this target
    pub skip_names: Vec<String>,
    pub min_age_days: Option<u32>, // only flag if older than N days
}

/// Per-user targets
pub fn user_targets() -> Vec<ScanTarget> {
    vec![
        ScanTarget {
            name: "User Cache Files".into(),
            step: CategoryStep::UserCaches,
            paths: vec!["~/Library/Caches".into()],
            safety: SafetyLevel::Safe,
            reason: "Application cache, regenerated automatically".into(),
            skip_names: vec!["TemporaryItems".into()],
            min_age_days: None,
        },
        ScanTarget {
            name: "User Log Files".into(),
            step: CategoryStep::UserLogs,
            paths: vec!["~/Library/Logs".into()],
            safety: SafetyLevel::Safe,
            reason: "Application log, safe to remove".into(),
            skip_names: vec!["DiagnosticReports".into()],
            min_age_days: None,
        },
        ScanTarget {
            name: "Crash Reports".into(),
            step: CategoryStep::CrashReports,
            paths: vec![
                "~/Library/Logs/DiagnosticReports".into(),
                "/Library/Logs/DiagnosticReports".into(),
            ],
            safety: SafetyLevel::Safe,
            reason: "Crash report, safe to remove unless debugging".into(),
            skip_names: Vec::new(),
            min_age_days: None,
        },
        ScanTarget {
            name: "Temporary Files".into(),
            step: CategoryStep::TemporaryFiles,
            paths: vec!["/tmp".into(), "$TMPDIR".into()],
            safety: SafetyLevel::Safe,
            reason: "Temporary file left behind by the system or an app".into(),
            skip_names: Vec::new(),
            min_age_days: Some(1),
        },
        ScanTarget {
            name: "Application Support Caches".into(),
            step: CategoryStep::ApplicationSupport,
            paths: vec![
                "~/Library/Application Support/CrashReporter".into(),
                "~/Library/Application Support/*/Cache".into(),
                "~/Library/Application Support/*/Caches".into(),
            ],
            safety: SafetyLevel::Caution,
            reason: "Cached data kept by an application, may need re-downloading".into(),
            skip_names: Vec::new(),
            min_age_days: Some(30),
        },
    ]
}

/// Shared, system-level targets. Most items here need administrator rights.
pub fn system_targets() -> Vec<ScanTarget> {
    vec![
        ScanTarget {
            name: "System Cache Files".into(),
            step: CategoryStep::SystemCaches,
            paths: vec!["/Library/Caches".into()],
            safety: SafetyLevel::Caution,
            reason: "Shared cache, regenerated by the system".into(),
            skip_names: Vec::new(),
            min_age_days: Some(7),
        },
        ScanTarget {
            name: "System Log Files".into(),
            step: CategoryStep::SystemLogs,
            paths: vec!["/var/log".into(), "/Library/Logs".into()],
            safety: SafetyLevel::Caution,
            reason: "System log, old entries are safe to remove".into(),
            skip_names: vec!["DiagnosticReports".into()],
            min_age_days: Some(7),
        },
    ]
}

/// Get all default scan targets
pub fn all_targets() -> Vec<ScanTarget> {
    let mut targets = Vec::new();
    targets.extend(user_targets());
    targets.extend(system_targets());
    targets
}
