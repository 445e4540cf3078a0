use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for `request_delay_seconds` (one day)
pub const MAX_REQUEST_DELAY_SECONDS: u64 = 86_400;

/// Upper bound for `request_timeout_seconds` (one day)
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 86_400;

/// Main configuration structure for Harvester
///
/// Built once at startup and never mutated during a run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Pages to scan, in order
    pub target_urls: Vec<String>,

    /// Root directory for placed files
    #[serde(default = "default_download_base_folder")]
    pub download_base_folder: PathBuf,

    /// Placement strategy for downloaded files
    #[serde(default)]
    pub organization_rule: OrganizationRule,

    /// Lowercase extensions with a leading dot (normalized at load time)
    pub allowed_extensions: Vec<String>,

    /// Minimum spacing between consecutive outbound requests
    #[serde(default = "default_request_delay_seconds")]
    pub request_delay_seconds: f64,

    /// Path to the persisted download history
    #[serde(default = "default_download_history_file")]
    pub download_history_file: PathBuf,

    /// Overall timeout for a single HTTP request
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Config {
    /// Minimum delay between two requests
    ///
    /// Values outside `0..=MAX_REQUEST_DELAY_SECONDS` are rejected at load time; an
    /// unvalidated value that cannot be represented is clamped to that bound.
    pub fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_delay_seconds)
            .unwrap_or(Duration::from_secs(MAX_REQUEST_DELAY_SECONDS))
            .min(Duration::from_secs(MAX_REQUEST_DELAY_SECONDS))
    }

    /// Timeout applied to each request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.min(MAX_REQUEST_TIMEOUT_SECONDS))
    }
}

/// Strategy mapping a downloaded file to a destination subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationRule {
    /// `base/YYYY-MM-DD/`
    #[default]
    Date,
    /// `base/<Ext>/`
    Type,
    /// `base/<Ext>/YYYY-MM-DD/`
    TypeThenDate,
    /// `base/`
    Flat,
}

impl OrganizationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Type => "type",
            Self::TypeThenDate => "type_then_date",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for OrganizationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_download_base_folder() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_request_delay_seconds() -> f64 {
    2.0
}

fn default_download_history_file() -> PathBuf {
    PathBuf::from("downloaded_files_history.json")
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("harvester/{}", env!("CARGO_PKG_VERSION"))
}
