use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::watch;

use super::diagnostics::{self, DiagnosticEvent, DiagnosticsSink, Severity, TracingSink};
use super::executor::CleanupExecutor;
use super::progress::ProgressTracker;
use super::types::{
    CategoryRunState, CategoryStep, CleanupCategory, CleanupItem, CleanupOutcome,
    OrchestratorState, RunStatus, RunSummary, ScanReport,
};
use crate::common::errors::GuardViolation;
use crate::common::safety::SafeRoots;
use crate::guard::{normalize, GuardDecision, PathGuard};

pub const HEADLINE_SUCCESS: &str = "Cleanup complete";
pub const HEADLINE_PARTIAL: &str = "Cleanup finished with errors";

/// Drives the registered executors through scan and run.
///
/// Shared behind an `Arc`; every method takes `&self`. A `scan()` or `run()`
/// issued while either is already in flight returns `None` without queuing.
/// Observers follow along through [`CleanupOrchestrator::subscribe`].
pub struct CleanupOrchestrator {
    executors: Vec<Arc<dyn CleanupExecutor>>,
    guard: Arc<PathGuard>,
    safe_roots: SafeRoots,
    diagnostics: Arc<dyn DiagnosticsSink>,
    state: watch::Sender<OrchestratorState>,
    scanning: AtomicBool,
    running: AtomicBool,
}

/// Holds a busy flag; releasing happens on drop, so an abandoned scan or run
/// future frees its flag too.
struct BusyClaim<'a> {
    flag: &'a AtomicBool,
    state: &'a watch::Sender<OrchestratorState>,
    mark: fn(&mut OrchestratorState, bool),
}

impl<'a> BusyClaim<'a> {
    fn acquire(
        flag: &'a AtomicBool,
        state: &'a watch::Sender<OrchestratorState>,
        mark: fn(&mut OrchestratorState, bool),
    ) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        state.send_modify(|s| mark(s, true));
        Some(Self { flag, state, mark })
    }
}

impl Drop for BusyClaim<'_> {
    fn drop(&mut self) {
        let mark = self.mark;
        self.state.send_modify(|s| mark(s, false));
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Per-run weighted progress. Fractions only ever grow.
struct RunProgress {
    weights: Vec<f64>,
    total_weight: f64,
    fractions: Mutex<Vec<f64>>,
}

impl RunProgress {
    fn new(categories: &[CleanupCategory]) -> Self {
        let weights: Vec<f64> = categories
            .iter()
            .map(|c| c.selected_count().max(1) as f64)
            .collect();
        let total_weight = weights.iter().sum();
        let fractions = Mutex::new(vec![0.0; weights.len()]);
        Self {
            weights,
            total_weight,
            fractions,
        }
    }

    /// Record `fraction` for category `index` and return the overall value
    fn update(&self, index: usize, fraction: f64) -> f64 {
        let mut fractions = self.fractions.lock().unwrap_or_else(|p| p.into_inner());
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        if let Some(slot) = fractions.get_mut(index) {
            *slot = slot.max(fraction);
        }
        weighted(&fractions, &self.weights, self.total_weight)
    }
}

fn weighted(fractions: &[f64], weights: &[f64], total_weight: f64) -> f64 {
    if total_weight <= 0.0 {
        return 0.0;
    }
    let sum: f64 = fractions.iter().zip(weights).map(|(f, w)| f * w).sum();
    (sum / total_weight).clamp(0.0, 1.0)
}

impl CleanupOrchestrator {
    pub fn new(
        executors: Vec<Arc<dyn CleanupExecutor>>,
        guard: Arc<PathGuard>,
        safe_roots: SafeRoots,
    ) -> Self {
        let (state, _) = watch::channel(OrchestratorState::default());
        Self {
            executors,
            guard,
            safe_roots,
            diagnostics: Arc::new(TracingSink),
            state,
            scanning: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> OrchestratorState {
        self.state.borrow().clone()
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    // ─── Scan ────────────────────────────────────────────────────────────────

    pub async fn scan(&self) -> Option<ScanReport> {
        let _claim = BusyClaim::acquire(&self.scanning, &self.state, |s, v| s.scanning = v)?;
        if self.running.load(Ordering::SeqCst) {
            tracing::debug!("scan requested while a run is in progress");
            return None;
        }

        let started = Instant::now();
        let (selections, enabled) = self.capture_selections();

        let mut categories = Vec::with_capacity(self.executors.len());
        let mut warnings = Vec::new();
        let mut dropped = 0usize;

        for executor in &self.executors {
            let step = executor.step();
            let mut category = match executor.scan().await {
                Ok(category) => category,
                Err(e) => {
                    tracing::warn!(category = %step, error = %format!("{:#}", e), "scan failed");
                    warnings.push(format!("{}: {:#}", step, e));
                    CleanupCategory::new(step, Vec::new())
                }
            };
            category.step = step;

            let before = category.items.len();
            category.items.retain_mut(|item| self.admit(step, item));
            dropped += before - category.items.len();

            for item in &mut category.items {
                if let Some(&selected) = selections.get(&(step, item.path.clone())) {
                    item.selected = selected;
                }
            }
            if let Some(&was_enabled) = enabled.get(&step) {
                category.enabled = was_enabled;
            }
            if category.items.is_empty() {
                category.enabled = false;
            }

            tracing::debug!(category = %step, items = category.items.len(), "category scanned");
            categories.push(category);
        }

        categories.sort_by_key(|c| c.step);

        self.state.send_modify(|s| {
            s.categories = categories.clone();
            s.scan_warnings = warnings.clone();
        });

        let report = ScanReport {
            timestamp: chrono::Utc::now(),
            duration_secs: started.elapsed().as_secs_f64(),
            categories,
            dropped,
            warnings,
        };
        tracing::info!(
            items = report.total_items(),
            dropped = report.dropped,
            "scan finished"
        );
        Some(report)
    }

    /// Both safety layers must agree before an item is shown at all
    fn admit(&self, step: CategoryStep, item: &mut CleanupItem) -> bool {
        item.path = normalize(&item.path);
        item.guard_decision = self.guard.decision(&item.path);
        if item.guard_decision != GuardDecision::Allow {
            tracing::debug!(category = %step, path = %item.path.display(), decision = ?item.guard_decision, "dropped by guard");
            return false;
        }
        if !self.safe_roots.contains(&item.path) {
            tracing::debug!(category = %step, path = %item.path.display(), "dropped: outside safe roots");
            return false;
        }
        true
    }

    #[allow(clippy::type_complexity)]
    fn capture_selections(
        &self,
    ) -> (HashMap<(CategoryStep, PathBuf), bool>, HashMap<CategoryStep, bool>) {
        let state = self.state.borrow();
        let selections = state
            .categories
            .iter()
            .flat_map(|c| {
                c.items
                    .iter()
                    .map(move |i| ((c.step, i.path.clone()), i.selected))
            })
            .collect();
        let enabled = state
            .categories
            .iter()
            .filter(|c| !c.items.is_empty())
            .map(|c| (c.step, c.enabled))
            .collect();
        (selections, enabled)
    }

    // ─── Run ─────────────────────────────────────────────────────────────────

    /// Remove every selected item, category by category
    pub async fn run(&self) -> Option<RunSummary> {
        self.execute(false).await
    }

    /// Same pipeline without touching the filesystem
    pub async fn preview(&self) -> Option<RunSummary> {
        self.execute(true).await
    }

    async fn execute(&self, dry_run: bool) -> Option<RunSummary> {
        let claim = BusyClaim::acquire(&self.running, &self.state, |s, v| s.running = v)?;
        if self.scanning.load(Ordering::SeqCst) {
            tracing::debug!("run requested while a scan is in progress");
            return None;
        }

        let active: Vec<CleanupCategory> = self
            .state
            .borrow()
            .active_categories()
            .cloned()
            .collect();
        if active.is_empty() {
            tracing::info!("nothing selected, run skipped");
            return None;
        }

        let progress = RunProgress::new(&active);
        self.state.send_modify(|s| {
            s.progress = 0.0;
            s.run_states = active
                .iter()
                .map(|c| CategoryRunState {
                    step: c.step,
                    status: RunStatus::Pending,
                })
                .collect();
        });

        let queued: usize = active.iter().map(|c| c.selected_count()).sum();
        tracing::info!(categories = active.len(), items = queued, dry_run, "cleanup run started");
        self.emit(
            DiagnosticEvent::new("cleanup.run", Severity::Info, "cleanup run started")
                .with("categories", active.len())
                .with("items", queued)
                .with("dry_run", dry_run),
        );
        for category in &active {
            for item in category.selected_items() {
                self.emit(
                    DiagnosticEvent::new("cleanup.item", Severity::Info, "item queued")
                        .with("category", category.step.key())
                        .with("path", item.path.display()),
                );
            }
        }

        let mut details = Vec::with_capacity(active.len());
        let mut recoveries: Vec<String> = Vec::new();
        let mut all_succeeded = true;

        for (index, category) in active.iter().enumerate() {
            self.set_run_status(category.step, RunStatus::Running);

            let report = |fraction: f64| {
                let overall = progress.update(index, fraction);
                self.state.send_if_modified(|s| {
                    if overall > s.progress {
                        s.progress = overall;
                        true
                    } else {
                        false
                    }
                });
            };
            let outcome = self.run_category(category, dry_run, &report).await;

            let status = if outcome.success {
                RunStatus::Succeeded {
                    message: outcome.message.clone(),
                }
            } else {
                all_succeeded = false;
                RunStatus::Failed {
                    message: outcome.message.clone(),
                    recovery: outcome.recovery_suggestion.clone(),
                }
            };
            self.set_run_status(category.step, status);

            let severity = if outcome.success { Severity::Info } else { Severity::Error };
            self.emit(
                DiagnosticEvent::new("cleanup.category", severity, outcome.message.clone())
                    .with("category", category.step.key())
                    .with("success", outcome.success),
            );
            if outcome.success {
                tracing::info!(category = %category.step, message = %outcome.message, "category finished");
            } else {
                tracing::warn!(category = %category.step, message = %outcome.message, "category failed");
            }

            details.push(format!("{}: {}", category.step, outcome.message));
            if let Some(recovery) = outcome.recovery_suggestion {
                if !recoveries.contains(&recovery) {
                    recoveries.push(recovery);
                }
            }
        }

        let summary = RunSummary {
            success: all_succeeded,
            headline: if all_succeeded { HEADLINE_SUCCESS } else { HEADLINE_PARTIAL }.to_string(),
            details,
            recovery: if recoveries.is_empty() {
                None
            } else {
                Some(recoveries.join("\n"))
            },
        };
        self.state
            .send_modify(|s| s.last_summary = Some(summary.clone()));

        drop(claim);
        if all_succeeded && !dry_run {
            self.scan().await;
        }
        Some(summary)
    }

    /// Re-validate, then hand the permitted items to the category's executor.
    /// Never fails: every problem becomes a failed outcome.
    async fn run_category(
        &self,
        category: &CleanupCategory,
        dry_run: bool,
        report: &(dyn Fn(f64) + Send + Sync),
    ) -> CleanupOutcome {
        let Some(executor) = self.executors.iter().find(|e| e.step() == category.step) else {
            return CleanupOutcome::failure(
                format!("no executor registered for {}", category.step),
                None,
            );
        };

        let selected: Vec<&CleanupItem> = category.selected_items().collect();
        let filtered = match self.guard.filter(selected.iter().map(|i| &i.path)) {
            Ok(filtered) => filtered,
            Err(violation) => {
                return CleanupOutcome::failure(
                    violation.to_string(),
                    Some("Remove the unsafe path from the selection and scan again.".to_string()),
                )
            }
        };
        if filtered.permitted.is_empty() {
            let violation = GuardViolation::ExcludedPath {
                paths: filtered.excluded,
            };
            return CleanupOutcome::failure(
                violation.to_string(),
                Some("Remove these paths from your exclusions to clean them.".to_string()),
            );
        }

        let items: Vec<CleanupItem> = selected
            .into_iter()
            .filter(|i| filtered.permitted.iter().any(|p| p == &i.path))
            .cloned()
            .collect();

        let tracker = ProgressTracker::new(category.selected_count());
        if !filtered.excluded.is_empty() {
            tracing::info!(
                category = %category.step,
                skipped = filtered.excluded.len(),
                "excluded items skipped"
            );
            report(tracker.advance_by(filtered.excluded.len()));
        }

        executor.execute(&items, dry_run, &tracker, report).await
    }

    fn set_run_status(&self, step: CategoryStep, status: RunStatus) {
        self.state.send_modify(|s| {
            if let Some(entry) = s.run_states.iter_mut().find(|r| r.step == step) {
                entry.status = status;
            }
        });
    }

    fn emit(&self, event: DiagnosticEvent) {
        diagnostics::emit(self.diagnostics.as_ref(), event);
    }

    // ─── Selection ───────────────────────────────────────────────────────────

    /// Toggle every non-empty category and all of its items in one update
    pub fn select_all(&self, enabled: bool) {
        self.state.send_modify(|s| {
            for category in s.categories.iter_mut().filter(|c| !c.items.is_empty()) {
                category.enabled = enabled;
                for item in &mut category.items {
                    item.selected = enabled;
                }
            }
        });
    }

    /// Returns false when no such item exists
    pub fn set_item_selected(&self, step: CategoryStep, path: impl AsRef<Path>, selected: bool) -> bool {
        let path = normalize(path);
        self.state.send_if_modified(|s| {
            let Some(category) = s.categories.iter_mut().find(|c| c.step == step) else {
                return false;
            };
            let Some(item) = category.items.iter_mut().find(|i| i.path == path) else {
                return false;
            };
            item.selected = selected;
            if selected {
                category.enabled = true;
            }
            true
        })
    }

    /// Enable or disable a category together with all of its items.
    /// Empty categories stay disabled.
    pub fn set_category_enabled(&self, step: CategoryStep, enabled: bool) -> bool {
        self.state.send_if_modified(|s| {
            let Some(category) = s
                .categories
                .iter_mut()
                .find(|c| c.step == step && !c.items.is_empty())
            else {
                return false;
            };
            category.enabled = enabled;
            for item in &mut category.items {
                item.selected = enabled;
            }
            true
        })
    }
}
