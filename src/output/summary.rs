//! Run summary counters and report

use crate::state::CandidateOutcome;
use std::collections::HashMap;

/// Counts collected over one run
///
/// `attempted` is every candidate that got past the history check, so
/// `attempted == succeeded + failed` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Target pages fetched and parsed
    pub pages_scanned: u64,

    /// Target pages that could not be fetched
    pub pages_failed: u64,

    /// Links found across all scanned pages
    pub links_found: u64,

    /// Links dropped by the extension filter
    pub filtered: u64,

    /// Candidates that went on to be fetched (or failed before fetching)
    pub attempted: u64,

    /// Files downloaded and recorded
    pub succeeded: u64,

    /// Candidates already in the history
    pub skipped: u64,

    /// Candidates that failed
    pub failed: u64,

    /// Total bytes written for successful downloads
    pub bytes_written: u64,

    /// Failure counts by kind
    pub failures: HashMap<CandidateOutcome, u64>,

    /// The end-of-run history flush failed
    pub history_flush_failed: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one discovered link
    pub fn record(&mut self, outcome: CandidateOutcome) {
        self.links_found += 1;

        if outcome.is_filtered() {
            self.filtered += 1;
        } else if outcome.is_skipped() {
            self.skipped += 1;
        } else if outcome.is_success() {
            self.attempted += 1;
            self.succeeded += 1;
        } else if outcome.is_error() {
            self.attempted += 1;
            self.failed += 1;
            *self.failures.entry(outcome).or_insert(0) += 1;
        }
    }

    /// Adds bytes written by a successful download
    pub fn add_bytes(&mut self, bytes: u64) {
        self.bytes_written += bytes;
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Run Summary ===\n");

    println!("Pages:");
    println!("  Scanned: {}", summary.pages_scanned);
    println!("  Failed: {}", summary.pages_failed);
    println!();

    println!("Links:");
    println!("  Found: {}", summary.links_found);
    println!("  Filtered by extension: {}", summary.filtered);
    println!("  Skipped (already downloaded): {}", summary.skipped);
    println!("  Attempted: {}", summary.attempted);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Failed: {}", summary.failed);
    println!("  Bytes written: {}", summary.bytes_written);
    println!();

    if !summary.failures.is_empty() {
        println!("Failures:");
        let mut failures: Vec<_> = summary.failures.iter().collect();
        failures.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

        for (outcome, count) in failures {
            println!("  {}: {}", outcome, count);
        }
        println!();
    }

    if summary.history_flush_failed {
        println!("Warning: the final history flush failed; see the log for details");
        println!();
    }
}
