use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::guard::{normalize, GuardDecision};

// ─── Categories ──────────────────────────────────────────────────────────────

/// Built-in cleanup categories. Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStep {
    UserCaches,
    UserLogs,
    CrashReports,
    TemporaryFiles,
    ApplicationSupport,
    SystemCaches,
    SystemLogs,
}

impl CategoryStep {
    pub const ALL: [CategoryStep; 7] = [
        CategoryStep::UserCaches,
        CategoryStep::UserLogs,
        CategoryStep::CrashReports,
        CategoryStep::TemporaryFiles,
        CategoryStep::ApplicationSupport,
        CategoryStep::SystemCaches,
        CategoryStep::SystemLogs,
    ];

    /// Identifier used on the command line and in JSON
    pub fn key(&self) -> &'static str {
        match self {
            CategoryStep::UserCaches => "user_caches",
            CategoryStep::UserLogs => "user_logs",
            CategoryStep::CrashReports => "crash_reports",
            CategoryStep::TemporaryFiles => "temporary_files",
            CategoryStep::ApplicationSupport => "application_support",
            CategoryStep::SystemCaches => "system_caches",
            CategoryStep::SystemLogs => "system_logs",
        }
    }
}

impl std::fmt::Display for CategoryStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryStep::UserCaches => write!(f, "User Caches"),
            CategoryStep::UserLogs => write!(f, "User Logs"),
            CategoryStep::CrashReports => write!(f, "Crash Reports"),
            CategoryStep::TemporaryFiles => write!(f, "Temporary Files"),
            CategoryStep::ApplicationSupport => write!(f, "Application Support"),
            CategoryStep::SystemCaches => write!(f, "System Caches"),
            CategoryStep::SystemLogs => write!(f, "System Logs"),
        }
    }
}

impl FromStr for CategoryStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        CategoryStep::ALL
            .into_iter()
            .find(|step| step.key() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = CategoryStep::ALL.iter().map(|s| s.key()).collect();
                format!("unknown category '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// One removable path. Identity within a scan is `(category step, path)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupItem {
    /// Absolute, normalized
    pub path: PathBuf,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub selected: bool,
    pub guard_decision: GuardDecision,
}

impl CleanupItem {
    /// Selected by default; the name is the last path component
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = normalize(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            size: None,
            detail: None,
            selected: true,
            guard_decision: GuardDecision::Allow,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupCategory {
    pub step: CategoryStep,
    pub items: Vec<CleanupItem>,
    pub enabled: bool,
}

impl CleanupCategory {
    /// Enabled iff it has items
    pub fn new(step: CategoryStep, items: Vec<CleanupItem>) -> Self {
        let enabled = !items.is_empty();
        Self {
            step,
            items,
            enabled,
        }
    }

    pub fn selected_items(&self) -> impl Iterator<Item = &CleanupItem> {
        self.items.iter().filter(|i| i.selected)
    }

    pub fn selected_count(&self) -> usize {
        self.selected_items().count()
    }

    /// Has at least one selected item and takes part in the next run
    pub fn is_active(&self) -> bool {
        self.enabled && self.selected_count() > 0
    }

    pub fn total_size(&self) -> u64 {
        self.items.iter().filter_map(|i| i.size).sum()
    }

    pub fn selected_size(&self) -> u64 {
        self.selected_items().filter_map(|i| i.size).sum()
    }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What one category's execution reports back. Exactly one per active category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_suggestion: Option<String>,
}

impl CleanupOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            recovery_suggestion: None,
        }
    }

    pub fn failure(message: impl Into<String>, recovery: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            recovery_suggestion: recovery.filter(|r| !r.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub success: bool,
    pub headline: String,
    /// One line per active category, in processing order
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded {
        message: String,
    },
    Failed {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recovery: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRunState {
    pub step: CategoryStep,
    #[serde(flatten)]
    pub status: RunStatus,
}

/// Snapshot published to subscribers after every change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorState {
    pub categories: Vec<CleanupCategory>,
    pub scanning: bool,
    pub running: bool,
    /// Weighted fraction of the current (or last) run, 0.0 to 1.0
    pub progress: f64,
    pub run_states: Vec<CategoryRunState>,
    pub last_summary: Option<RunSummary>,
    pub scan_warnings: Vec<String>,
}

impl OrchestratorState {
    pub fn category(&self, step: CategoryStep) -> Option<&CleanupCategory> {
        self.categories.iter().find(|c| c.step == step)
    }

    pub fn active_categories(&self) -> impl Iterator<Item = &CleanupCategory> {
        self.categories.iter().filter(|c| c.is_active())
    }
}

/// Result of one `scan()`
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub duration_secs: f64,
    pub categories: Vec<CleanupCategory>,
    /// Items a safety layer removed from the executors' results
    pub dropped: usize,
    pub warnings: Vec<String>,
}

impl ScanReport {
    pub fn total_items(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.categories.iter().map(|c| c.total_size()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_and_parse() {
        let mut steps = vec![CategoryStep::SystemLogs, CategoryStep::UserCaches, CategoryStep::CrashReports];
        steps.sort();
        assert_eq!(
            steps,
            vec![CategoryStep::UserCaches, CategoryStep::CrashReports, CategoryStep::SystemLogs]
        );
        assert_eq!("user-logs".parse::<CategoryStep>(), Ok(CategoryStep::UserLogs));
        assert_eq!("System_Caches".parse::<CategoryStep>(), Ok(CategoryStep::SystemCaches));
        assert!("trash".parse::<CategoryStep>().is_err());
    }

    #[test]
    fn test_item_defaults() {
        let item = CleanupItem::new("/tmp/a/../b/");
        assert_eq!(item.path, PathBuf::from("/tmp/b"));
        assert_eq!(item.name, "b");
        assert!(item.selected);
    }

    #[test]
    fn test_category_activity() {
        let empty = CleanupCategory::new(CategoryStep::UserLogs, vec![]);
        assert!(!empty.enabled);
        assert!(!empty.is_active());

        let cat = CleanupCategory::new(
            CategoryStep::UserLogs,
            vec![
                CleanupItem::new("/tmp/a").with_size(10),
                CleanupItem::new("/tmp/b").with_size(5).with_selected(false),
            ],
        );
        assert!(cat.is_active());
        assert_eq!(cat.selected_count(), 1);
        assert_eq!(cat.selected_size(), 10);
        assert_eq!(cat.total_size(), 15);
    }

    #[test]
    fn test_blank_recovery_is_dropped() {
        let outcome = CleanupOutcome::failure("boom", Some("  ".into()));
        assert_eq!(outcome.recovery_suggestion, None);
    }
}
