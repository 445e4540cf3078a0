use crate::config::types::{Config, MAX_REQUEST_DELAY_SECONDS, MAX_REQUEST_TIMEOUT_SECONDS};
use crate::ConfigError;
use url::Url;

/// Normalizes the configuration in place
///
/// Extensions are trimmed, lowercased and given a leading dot; duplicates are dropped
/// while keeping the first occurrence.
pub fn normalize(config: &mut Config) {
    let mut normalized: Vec<String> = Vec::with_capacity(config.allowed_extensions.len());
    for ext in &config.allowed_extensions {
        let ext = normalize_extension(ext);
        if !normalized.contains(&ext) {
            normalized.push(ext);
        }
    }
    config.allowed_extensions = normalized;

    for url in &mut config.target_urls {
        *url = url.trim().to_string();
    }
}

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_urls(&config.target_urls)?;
    validate_extensions(&config.allowed_extensions)?;
    validate_paths(config)?;
    validate_timing(config)?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Validates the list of pages to scan
fn validate_target_urls(urls: &[String]) -> Result<(), ConfigError> {
    if urls.is_empty() {
        return Err(ConfigError::Validation(
            "target_urls must contain at least one URL".to_string(),
        ));
    }

    for raw in urls {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target URL '{}': {}", raw, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Target URL '{}' must use http or https",
                raw
            )));
        }
    }

    Ok(())
}

/// Validates normalized extensions
fn validate_extensions(extensions: &[String]) -> Result<(), ConfigError> {
    if extensions.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_extensions must contain at least one extension".to_string(),
        ));
    }

    for ext in extensions {
        let body = &ext[1..];
        if body.is_empty() {
            return Err(ConfigError::Validation(
                "allowed_extensions cannot contain an empty extension".to_string(),
            ));
        }

        let malformed = body.contains(['/', '\\'])
            || body.chars().any(char::is_whitespace)
            || body.split('.').any(str::is_empty);
        if malformed {
            return Err(ConfigError::Validation(format!(
                "Invalid extension '{}'",
                ext
            )));
        }
    }

    Ok(())
}

/// Validates output locations
fn validate_paths(config: &Config) -> Result<(), ConfigError> {
    if config.download_base_folder.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download_base_folder cannot be empty".to_string(),
        ));
    }

    if config.download_history_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download_history_file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates pacing and timeout values
fn validate_timing(config: &Config) -> Result<(), ConfigError> {
    let delay = config.request_delay_seconds;
    if !delay.is_finite() || delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "request_delay_seconds must be a non-negative number, got {}",
            delay
        )));
    }

    if delay > MAX_REQUEST_DELAY_SECONDS as f64 {
        return Err(ConfigError::Validation(format!(
            "request_delay_seconds must be at most {}, got {}",
            MAX_REQUEST_DELAY_SECONDS, delay
        )));
    }

    let timeout = config.request_timeout_seconds;
    if timeout == 0 || timeout > MAX_REQUEST_TIMEOUT_SECONDS {
        return Err(ConfigError::Validation(format!(
            "request_timeout_seconds must be between 1 and {}, got {}",
            MAX_REQUEST_TIMEOUT_SECONDS, timeout
        )));
    }

    Ok(())
}
