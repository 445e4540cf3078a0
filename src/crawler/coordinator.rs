//! Run orchestrator - main download orchestration logic
//!
//! This module drives a single run:
//! - Scanning each target page for links
//! - Filtering links by extension and against the download history
//! - Resolving where each file goes
//! - Fetching files and recording successes
//! - Collecting the run summary

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::discover_links;
use crate::history::HistoryStore;
use crate::organizer::{destination_path, resolve, sanitize_file_name};
use crate::output::RunSummary;
use crate::state::{CandidateOutcome, RunState};
use crate::url::CandidateLink;
use crate::HarvestError;
use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Per-run switches coming from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Bypass the history check; successes are still recorded
    pub force_download: bool,
}

/// Main orchestrator structure
///
/// Owns the configuration, the history store and the fetcher for the duration of a run.
/// Everything happens sequentially: one target is fully processed before the next, and
/// candidates within a target are fetched one at a time.
pub struct Orchestrator {
    config: Config,
    history: HistoryStore,
    fetcher: Fetcher,
    options: RunOptions,
    state: RunState,
    today: Option<NaiveDate>,
    fetched_this_run: HashSet<String>,
    written_this_run: HashSet<PathBuf>,
}

impl Orchestrator {
    /// Creates a new orchestrator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `history` - The loaded history store
    /// * `options` - Command-line switches for this run
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Successfully created orchestrator
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(
        config: Config,
        history: HistoryStore,
        options: RunOptions,
    ) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::new(&config)?;
        Ok(Self::with_fetcher(config, history, fetcher, options))
    }

    /// Creates an orchestrator around an existing fetcher
    pub fn with_fetcher(
        config: Config,
        history: HistoryStore,
        fetcher: Fetcher,
        options: RunOptions,
    ) -> Self {
        Self {
            config,
            history,
            fetcher,
            options,
            state: RunState::Idle,
            today: None,
            fetched_this_run: HashSet::new(),
            written_this_run: HashSet::new(),
        }
    }

    /// Pins the date used by date-based organization rules
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Runs the main loop over all target pages
    ///
    /// Per-page and per-file failures are logged and counted; they never abort the run.
    /// The only errors returned are broken state transitions.
    ///
    /// Every success is persisted as it happens. The history is flushed once more at
    /// the end of a run that downloaded anything; a failed flush is reported through
    /// [`RunSummary::history_flush_failed`].
    pub async fn run(&mut self) -> Result<RunSummary, HarvestError> {
        let started = std::time::Instant::now();
        let mut summary = RunSummary::new();

        tracing::info!(
            "Starting run: {} target pages, rule '{}', {} history entries{}",
            self.config.target_urls.len(),
            self.config.organization_rule,
            self.history.len(),
            if self.options.force_download {
                " (force download)"
            } else {
                ""
            }
        );

        let targets = self.config.target_urls.clone();
        for target in &targets {
            self.transition(RunState::Scanning)?;
            self.scan_target(target, &mut summary).await?;
        }

        self.transition(RunState::Done)?;

        self.flush_history(&mut summary);

        tracing::info!(
            "Run completed in {:?}: {} attempted, {} succeeded, {} skipped, {} failed",
            started.elapsed(),
            summary.attempted,
            summary.succeeded,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }

    /// Scans one target page and processes each link on it
    async fn scan_target(
        &mut self,
        target: &str,
        summary: &mut RunSummary,
    ) -> Result<(), HarvestError> {
        tracing::info!("Scanning {}", target);

        let page = match discover_links(&mut self.fetcher, target).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Skipping target: {}", e);
                summary.pages_failed += 1;
                return Ok(());
            }
        };
        summary.pages_scanned += 1;

        tracing::debug!(
            "Found {} links on {} ({})",
            page.links.len(),
            target,
            page.title.as_deref().unwrap_or("untitled")
        );

        for link in &page.links {
            let outcome = self.process_link(link, summary).await?;
            tracing::debug!("{} -> {}", link, outcome);
            summary.record(outcome);
        }

        Ok(())
    }

    /// Decides what to do with a single discovered link
    async fn process_link(
        &mut self,
        link: &str,
        summary: &mut RunSummary,
    ) -> Result<CandidateOutcome, HarvestError> {
        let candidate = match CandidateLink::from_link(link, &self.config.allowed_extensions) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return Ok(CandidateOutcome::Filtered),
            Err(e) => {
                tracing::warn!("Ignoring malformed link {}: {}", link, e);
                return Ok(CandidateOutcome::InvalidLink);
            }
        };

        if self.fetched_this_run.contains(&candidate.identifier) {
            return Ok(CandidateOutcome::AlreadyDownloaded);
        }

        let in_history = self.history.contains(&candidate.identifier);
        if in_history && !self.options.force_download {
            tracing::debug!("Already downloaded: {}", candidate.identifier);
            return Ok(CandidateOutcome::AlreadyDownloaded);
        }

        self.transition(RunState::Fetching)?;

        let dir = match resolve(
            &self.config.download_base_folder,
            &candidate.file_name,
            &candidate.extension,
            self.config.organization_rule,
            self.today(),
        ) {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!("Cannot create destination for {}: {}", candidate.url, e);
                return Ok(CandidateOutcome::IoError);
            }
        };

        let destination = match self.own_copy(&candidate.identifier, &dir) {
            Some(earlier) => {
                tracing::debug!("Replacing earlier copy {}", earlier.display());
                earlier
            }
            None => destination_path(&dir, &sanitize_file_name(&candidate.file_name)),
        };

        tracing::info!("Downloading {} -> {}", candidate.url, destination.display());
        let fetched = match self.fetcher.fetch(candidate.url.as_str(), &destination).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Download failed: {}", e);
                return Ok(CandidateOutcome::from(&e));
            }
        };

        self.transition(RunState::Recording)?;
        self.fetched_this_run.insert(candidate.identifier.clone());
        self.written_this_run.insert(fetched.final_path.clone());

        let location = fetched
            .final_path
            .strip_prefix(&self.config.download_base_folder)
            .unwrap_or(&fetched.final_path);
        if let Err(e) = self.history.record_at(&candidate.identifier, location) {
            tracing::error!(
                "Downloaded {} but could not record it: {}",
                fetched.final_path.display(),
                e
            );
            return Ok(CandidateOutcome::HistoryWriteFailed);
        }

        summary.add_bytes(fetched.bytes_written);
        tracing::info!(
            "Saved {} ({} bytes)",
            fetched.final_path.display(),
            fetched.bytes_written
        );

        Ok(CandidateOutcome::Downloaded)
    }

    /// Writes the history once more after a run that downloaded anything
    fn flush_history(&self, summary: &mut RunSummary) {
        if summary.succeeded == 0 {
            return;
        }
        if let Err(e) = self.history.save() {
            tracing::error!("Final history flush failed: {}", e);
            summary.history_flush_failed = true;
        }
    }

    /// The earlier copy of `identifier` inside `dir`, if it may be overwritten in place
    ///
    /// Only a path recorded for this very identifier qualifies, and never one already
    /// written during this run.
    fn own_copy(&self, identifier: &str, dir: &Path) -> Option<PathBuf> {
        let location = self.history.location_of(identifier)?;
        let earlier = self.config.download_base_folder.join(location);

        let in_dir = earlier.file_name().is_some() && earlier.parent() == Some(dir);
        (in_dir && !self.written_this_run.contains(&earlier)).then_some(earlier)
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn transition(&mut self, next: RunState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("State {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Runs a complete harvest
///
/// # Example
///
/// ```no_run
/// use harvester::config::load_config;
/// use harvester::crawler::{run_harvest, RunOptions};
/// use harvester::history::{load_history, CorruptHistoryPolicy};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.json"))?;
/// let history = load_history(&config.download_history_file, CorruptHistoryPolicy::Abort)?;
/// let summary = run_harvest(config, history, RunOptions::default()).await?;
/// println!("{} new files", summary.succeeded);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: Config,
    history: HistoryStore,
    options: RunOptions,
) -> Result<RunSummary, HarvestError> {
    let mut orchestrator = Orchestrator::new(config, history, options)?;
    orchestrator.run().await
}
