use anyhow::Result;
use async_trait::async_trait;

use super::progress::ProgressTracker;
use super::types::{CategoryStep, CleanupCategory, CleanupItem, CleanupOutcome};

/// Receives a category's completion fraction after each advance
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Discovers and removes the items of one category.
///
/// `execute` must never fail outright: every problem is folded into the
/// returned [`CleanupOutcome`].
#[async_trait]
pub trait CleanupExecutor: Send + Sync {
    fn step(&self) -> CategoryStep;

    async fn scan(&self) -> Result<CleanupCategory>;

    async fn execute(
        &self,
        items: &[CleanupItem],
        dry_run: bool,
        tracker: &ProgressTracker,
        progress: ProgressFn<'_>,
    ) -> CleanupOutcome;
}
