//! TidyDock - Previewable cleanup for container runtimes
//!
//! TidyDock finds stopped containers, dangling or unused images, unused volumes
//! and networks, and build cache, estimates how much disk space removing them
//! would free, and then removes them. Unlike a blind `system prune`, the scan
//! can be narrowed by age and by size before anything is deleted.
//!
//! ## Architecture
//!
//! - `scanner`: list → classify → age filter → size selection, per kind
//! - `cleaner`: bulk prune, or removal of the exact identifiers picked by a
//!   size-narrowed scan; per-kind failures never abort the run
//! - `runtime`: the only place that talks to the container runtime

pub mod classify;
pub mod cleaner;
pub mod error;
pub mod report;
pub mod resource;
pub mod runtime;
pub mod scanner;
pub mod select;
pub mod size;
pub mod time;

// Re-export commonly used items
pub use cleaner::{CleanOptions, CleanTargets, Cleaner, CleanupStrategy};
pub use error::{Error, Result};
pub use report::ScanReport;
pub use resource::{
    CleanResult, KindOutcome, Record, ResourceItem, ResourceKind, ResourceSummary, ScanResult,
};
pub use runtime::{CliRuntime, Runtime};
pub use scanner::{ScanOptions, Scanner};
pub use select::SizeSelection;
pub use size::{format_bytes, parse_size, parse_size_limit};
pub use time::{parse_duration, AgeFilter};
