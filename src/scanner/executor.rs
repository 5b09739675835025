use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::targets::{SafetyLevel, ScanTarget};
use super::walker;
use crate::cleaner::{
    CategoryStep, CleanupCategory, CleanupExecutor, CleanupItem, CleanupOutcome, ProgressFn,
    ProgressTracker,
};
use crate::common::errors::{ExecutionFailure, PrivilegeDenial};
use crate::common::{format, fsops, permissions};
use crate::privilege::{PrivilegeEscalator, PrivilegedResult};

/// Unprivileged removal of one path; runs on the blocking pool
pub type Remover = Arc<dyn Fn(&Path) -> Result<(), ExecutionFailure> + Send + Sync>;

/// Executor for one category, backed by a set of filesystem scan targets
pub struct TargetExecutor {
    step: CategoryStep,
    targets: Vec<ScanTarget>,
    escalator: Arc<PrivilegeEscalator>,
    remover: Remover,
    select_caution: bool,
}

impl std::fmt::Debug for TargetExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetExecutor")
            .field("step", &self.step)
            .field("targets", &self.targets.len())
            .finish_non_exhaustive()
    }
}

impl TargetExecutor {
    pub fn new(step: CategoryStep, targets: Vec<ScanTarget>, escalator: Arc<PrivilegeEscalator>) -> Self {
        Self {
            step,
            targets,
            escalator,
            remover: Arc::new(|path: &Path| fsops::remove_path(path)),
            select_caution: false,
        }
    }

    /// Replace the per-item removal. Items it rejects with
    /// `PermissionDenied` go to the escalator in one batch.
    pub fn with_remover(mut self, remover: Remover) -> Self {
        self.remover = remover;
        self
    }

    /// Pre-select items from `Caution` targets too
    pub fn select_caution(mut self, select: bool) -> Self {
        self.select_caution = select;
        self
    }
}

#[derive(Debug, Default)]
struct Tally {
    removed: usize,
    freed: u64,
    failures: Vec<ExecutionFailure>,
    denial: Option<PrivilegeDenial>,
}

impl Tally {
    fn into_outcome(self, total: usize) -> CleanupOutcome {
        let freed = format::format_size(self.freed);
        if self.failures.is_empty() && self.denial.is_none() {
            return CleanupOutcome::success(format!(
                "Removed {}, freed {}",
                format::format_count(self.removed),
                freed
            ));
        }

        let mut parts = vec![format!("Removed {} of {}", self.removed, format::format_count(total))];
        if let Some(first) = self.failures.first() {
            let more = self.failures.len() - 1;
            if more == 0 {
                parts.push(first.to_string());
            } else {
                parts.push(format!("{} (and {} more)", first, more));
            }
        }
        if let Some(denial) = &self.denial {
            parts.push(denial.to_string());
        }

        let recovery = match &self.denial {
            Some(denial) => Some(permissions::privilege_hint(denial)),
            None => self.failures.iter().find_map(permissions::execution_hint),
        };
        CleanupOutcome::failure(parts.join("; "), recovery)
    }
}

#[async_trait]
impl CleanupExecutor for TargetExecutor {
    fn step(&self) -> CategoryStep {
        self.step
    }

    async fn scan(&self) -> Result<CleanupCategory> {
        let targets = self.targets.clone();
        let select_caution = self.select_caution;
        let step = self.step;

        let items = tokio::task::spawn_blocking(move || {
            let mut items: Vec<CleanupItem> = Vec::new();
            for target in &targets {
                let listing = walker::walk_target(target);
                for error in &listing.errors {
                    tracing::debug!(category = %step, target = %target.name, %error, "walk error");
                }
                let selected = target.safety == SafetyLevel::Safe || select_caution;
                items.extend(listing.entries.into_iter().map(|entry| {
                    CleanupItem::new(&entry.path)
                        .with_size(entry.size_bytes)
                        .with_detail(target.reason.clone())
                        .with_selected(selected)
                }));
            }
            items.sort_by(|a, b| a.path.cmp(&b.path));
            items.dedup_by(|a, b| a.path == b.path);
            items
        })
        .await
        .with_context(|| format!("Scan task for {} failed", step))?;

        Ok(CleanupCategory::new(self.step, items))
    }

    async fn execute(
        &self,
        items: &[CleanupItem],
        dry_run: bool,
        tracker: &ProgressTracker,
        progress: ProgressFn<'_>,
    ) -> CleanupOutcome {
        if dry_run {
            let bytes: u64 = items.iter().filter_map(|i| i.size).sum();
            progress(tracker.advance_by(items.len()));
            return CleanupOutcome::success(format!(
                "Would remove {}, freeing {}",
                format::format_count(items.len()),
                format::format_size(bytes)
            ));
        }

        let mut tally = Tally::default();
        let mut privileged: Vec<&CleanupItem> = Vec::new();

        for item in items {
            let path = item.path.clone();
            let remover = Arc::clone(&self.remover);
            let result = tokio::task::spawn_blocking(move || remover(&path))
                .await
                .unwrap_or_else(|e| {
                    Err(ExecutionFailure::Io {
                        path: item.path.clone(),
                        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                    })
                });

            match result {
                Ok(()) => {
                    tracing::debug!(path = %item.path.display(), "removed");
                    tally.removed += 1;
                    tally.freed += item.size.unwrap_or(0);
                }
                Err(failure) if failure.needs_privilege() => {
                    tracing::debug!(path = %item.path.display(), "needs administrator rights");
                    privileged.push(item);
                    continue;
                }
                Err(failure) => {
                    tracing::warn!(error = %failure, "removal failed");
                    tally.failures.push(failure);
                }
            }
            progress(tracker.advance());
        }

        if !privileged.is_empty() {
            let paths: Vec<String> = privileged
                .iter()
                .map(|i| i.path.to_string_lossy().into_owned())
                .collect();
            match self.escalator.remove(&paths).await {
                PrivilegedResult::Success => {
                    tally.removed += privileged.len();
                    tally.freed += privileged.iter().filter_map(|i| i.size).sum::<u64>();
                }
                other => tally.denial = other.into_result().err(),
            }
            progress(tracker.advance_by(privileged.len()));
        }

        tally.into_outcome(items.len())
    }
}
