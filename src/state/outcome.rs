//! Outcome taxonomy for a single discovered link

use crate::FetchError;
use std::fmt;

/// How the orchestrator resolved one discovered link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CandidateOutcome {
    // ===== Success =====
    /// Fetched, placed and recorded in the history
    Downloaded,

    // ===== Skips =====
    /// Identifier already in the history (or fetched earlier in this run)
    AlreadyDownloaded,

    /// No extension, or one not on the allow-list; never handed to the fetcher
    Filtered,

    // ===== Errors =====
    /// Link is not a valid absolute http(s) URL
    InvalidLink,

    /// Connection failure or timeout
    NetworkError,

    /// Server answered with a non-2xx status
    HttpError,

    /// Local write, rename or directory failure
    IoError,

    /// File placed but the history could not be persisted
    HistoryWriteFailed,
}

impl CandidateOutcome {
    /// Returns true if the file was downloaded and recorded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded)
    }

    /// Returns true if the link was already in the history
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::AlreadyDownloaded)
    }

    /// Returns true if the link was dropped by the extension filter
    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Filtered)
    }

    /// Returns true if this represents a recovered failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidLink
                | Self::NetworkError
                | Self::HttpError
                | Self::IoError
                | Self::HistoryWriteFailed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downloaded => "downloaded",
            Self::AlreadyDownloaded => "already_downloaded",
            Self::Filtered => "filtered",
            Self::InvalidLink => "invalid_link",
            Self::NetworkError => "network_error",
            Self::HttpError => "http_error",
            Self::IoError => "io_error",
            Self::HistoryWriteFailed => "history_write_failed",
        }
    }

    /// Returns all possible outcomes
    pub fn all() -> Vec<Self> {
        vec![
            Self::Downloaded,
            Self::AlreadyDownloaded,
            Self::Filtered,
            Self::InvalidLink,
            Self::NetworkError,
            Self::HttpError,
            Self::IoError,
            Self::HistoryWriteFailed,
        ]
    }
}

impl From<&FetchError> for CandidateOutcome {
    fn from(error: &FetchError) -> Self {
        match error {
            FetchError::Network { .. } => Self::NetworkError,
            FetchError::HttpStatus { .. } => Self::HttpError,
            FetchError::Io { .. } => Self::IoError,
            FetchError::InvalidUrl(_) => Self::InvalidLink,
        }
    }
}

impl fmt::Display for CandidateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
