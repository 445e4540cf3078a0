//! Crawler module for page scanning and file downloading
//!
//! This module contains the core run logic, including:
//! - HTTP fetching with request pacing and atomic file placement
//! - HTML parsing and link extraction
//! - Overall run orchestration

mod coordinator;
mod fetcher;
mod pacer;
mod parser;

pub use coordinator::{run_harvest, Orchestrator, RunOptions};
pub use fetcher::{build_http_client, FetchOutcome, Fetcher, PageResponse};
pub use pacer::Pacer;
pub use parser::{discover_links, parse_html, ParsedPage};
