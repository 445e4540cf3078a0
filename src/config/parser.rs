use crate::config::types::Config;
use crate::config::validation::{normalize, validate};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the JSON configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use harvester::config::load_config;
///
/// let config = load_config(Path::new("config.json")).unwrap();
/// println!("Rule: {}", config.organization_rule);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses, normalizes and validates configuration JSON
///
/// Unknown `organization_rule` values and missing required keys are rejected here,
/// not when the value is first used.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = serde_json::from_str(content)?;

    normalize(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This makes runs against different configurations distinguishable in the logs.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Creates the download root if it does not exist yet
///
/// A base folder that cannot be created is a configuration error, reported before any
/// network activity.
pub fn prepare_download_folder(config: &Config) -> Result<(), ConfigError> {
    let base = &config.download_base_folder;
    std::fs::create_dir_all(base).map_err(|e| {
        ConfigError::Validation(format!(
            "download_base_folder '{}' cannot be created: {}",
            base.display(),
            e
        ))
    })?;

    if !base.is_dir() {
        return Err(ConfigError::Validation(format!(
            "download_base_folder '{}' is not a directory",
            base.display()
        )));
    }

    Ok(())
}
