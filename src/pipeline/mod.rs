//! Pipeline entry points for the ad watcher.
//!
//! - `validate` / `AdProcessor`: admission of a single ad
//! - `run_scan`: one pass over every watched search
//! - `run_scheduler`: repeated passes on an interval

pub mod process;
pub mod scan;
pub mod schedule;
pub mod validate;

pub use process::{AdProcessor, Outcome, StoreStage, drop_percentage};
pub use scan::{ScanStats, run_scan};
pub use schedule::{run_scheduler, run_scheduler_until};
pub use validate::{Rejection, Validation, validate};
