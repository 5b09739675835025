pub mod executor;
pub mod targets;
pub mod walker;

use std::sync::Arc;

use crate::cleaner::{CategoryStep, CleanupExecutor};
use crate::common::config::Config;
use crate::privilege::PrivilegeEscalator;

pub use executor::TargetExecutor;
pub use targets::{all_targets, SafetyLevel, ScanTarget};

/// One executor per built-in category, in display order
pub fn default_executors(
    escalator: Arc<PrivilegeEscalator>,
    config: &Config,
) -> Vec<Arc<dyn CleanupExecutor>> {
    let targets = all_targets();
    CategoryStep::ALL
        .into_iter()
        .map(|step| {
            let own: Vec<ScanTarget> = targets.iter().filter(|t| t.step == step).cloned().collect();
            let executor = TargetExecutor::new(step, own, Arc::clone(&escalator))
                .select_caution(config.select_caution_items);
            Arc::new(executor) as Arc<dyn CleanupExecutor>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privilege::{DenyAll, HelperClient};

    #[test]
    fn test_default_executors_cover_every_step() {
        let escalator = PrivilegeEscalator::new(
            Arc::new(DenyAll),
            Arc::new(HelperClient::new("/nonexistent.sock")),
            None,
        );
        let executors = default_executors(Arc::new(escalator), &Config::default());
        let steps: Vec<CategoryStep> = executors.iter().map(|e| e.step()).collect();
        assert_eq!(steps, CategoryStep::ALL.to_vec());
    }
}
