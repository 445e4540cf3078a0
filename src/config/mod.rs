//! Configuration module for Harvester
//!
//! This module handles loading, parsing, and validating the JSON configuration file.
//!
//! # Example
//!
//! ```no_run
//! use harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.json")).unwrap();
//! println!("Scanning {} pages", config.target_urls.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, OrganizationRule};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, prepare_download_folder,
};
