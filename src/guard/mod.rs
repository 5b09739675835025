pub mod exclusions;
pub mod path_guard;

pub use exclusions::{ConfigExclusions, ExclusionStore, MemoryExclusions};
pub use path_guard::{normalize, GuardDecision, GuardFilter, PathGuard};
