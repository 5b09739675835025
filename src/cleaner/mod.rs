pub mod diagnostics;
pub mod executor;
pub mod orchestrator;
pub mod progress;
pub mod types;

pub use diagnostics::{DiagnosticEvent, DiagnosticsSink, FanoutSink, JsonlSink, Severity, TracingSink};
pub use executor::{CleanupExecutor, ProgressFn};
pub use orchestrator::{CleanupOrchestrator, HEADLINE_PARTIAL, HEADLINE_SUCCESS};
pub use progress::ProgressTracker;
pub use types::{
    CategoryRunState, CategoryStep, CleanupCategory, CleanupItem, CleanupOutcome,
    OrchestratorState, RunStatus, RunSummary, ScanReport,
};
