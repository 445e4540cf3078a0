//! Harvester: a polite file harvester
//!
//! This crate scans a configured list of web pages, picks out links to files with
//! allowed extensions, downloads the ones it has not fetched before and files them
//! into a directory tree according to an organization rule. A persistent history
//! keeps repeated runs idempotent.

pub mod config;
pub mod crawler;
pub mod history;
pub mod organizer;
pub mod output;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while a run is in progress
///
/// Configuration and history problems surface earlier, as [`ConfigError`] and
/// [`HistoryError`], before a run is started.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Failed to fetch page {url}: {reason}")]
    PageFetch { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// History store errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("History file {} could not be accessed: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while downloading a single file
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("IO error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid download URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Wraps an I/O failure together with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("URL has no usable file name: {0}")]
    MissingFileName(String),
}

/// Result type alias for history operations
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, OrganizationRule};
pub use crawler::{FetchOutcome, Fetcher, Orchestrator, RunOptions};
pub use history::HistoryStore;
pub use output::RunSummary;
pub use state::{CandidateOutcome, RunState};
pub use url::{canonical_identifier, CandidateLink};
