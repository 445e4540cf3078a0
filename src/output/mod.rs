//! Output module for run summaries
//!
//! This module handles:
//! - Counting per-candidate outcomes during a run
//! - Printing the end-of-run report

mod summary;

pub use summary::{print_summary, RunSummary};
