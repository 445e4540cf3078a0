//! URL handling module for Harvester
//!
//! This module turns discovered links into candidates: it canonicalises identifiers,
//! derives remote file names and infers the extension used for filtering and placement.

mod normalize;

// Re-export main functions
pub use normalize::{canonical_identifier, file_name_of, matching_extension, parse_http_url};

use crate::UrlResult;
use url::Url;

/// A discovered link whose extension passed the allow-list
///
/// Transient: built once per link within a run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    /// Absolute URL
    pub url: Url,

    /// Canonical identifier used for deduplication across runs
    pub identifier: String,

    /// Percent-decoded last path segment (not yet sanitized)
    pub file_name: String,

    /// The allow-list entry the file name matched (lowercase, leading dot)
    pub extension: String,
}

impl CandidateLink {
    /// Builds a candidate from an absolute link
    ///
    /// # Returns
    ///
    /// * `Ok(Some(CandidateLink))` - the link carries an allowed extension
    /// * `Ok(None)` - the link has no file name, or its name ends in no allowed extension
    /// * `Err(UrlError)` - the link is not a valid absolute http(s) URL
    ///
    /// # Examples
    ///
    /// ```
    /// use harvester::url::CandidateLink;
    ///
    /// let allowed = vec![".pdf".to_string()];
    /// let link = CandidateLink::from_link("https://example.com/docs/Report.PDF#p2", &allowed)
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(link.extension, ".pdf");
    /// assert_eq!(link.identifier, "https://example.com/docs/Report.PDF");
    ///
    /// assert!(CandidateLink::from_link("https://example.com/setup.exe", &allowed)
    ///     .unwrap()
    ///     .is_none());
    /// ```
    pub fn from_link(raw: &str, allowed_extensions: &[String]) -> UrlResult<Option<Self>> {
        let url = parse_http_url(raw)?;

        let Ok(file_name) = file_name_of(&url) else {
            return Ok(None);
        };

        let Some(extension) = matching_extension(&file_name, allowed_extensions) else {
            return Ok(None);
        };

        let identifier = canonical_identifier(raw)?;

        Ok(Some(Self {
            url,
            identifier,
            file_name,
            extension,
        }))
    }
}
