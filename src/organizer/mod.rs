//! Path organizer for placing downloaded files
//!
//! Maps a file to its destination directory under the download root according to the
//! configured [`OrganizationRule`], and picks a safe, non-clobbering file name inside it.

mod naming;

pub use naming::{destination_path, sanitize_file_name, split_file_name};

use crate::config::OrganizationRule;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Label used by type-based rules when a file has no extension
pub const NO_EXTENSION_LABEL: &str = "Other";

/// Resolves (and creates) the destination directory for a file
///
/// | rule | directory |
/// |------|-----------|
/// | `date` | `base/YYYY-MM-DD/` |
/// | `type` | `base/<Ext>/` |
/// | `type_then_date` | `base/<Ext>/YYYY-MM-DD/` |
/// | `flat` | `base/` |
///
/// `file_extension` may be given with or without its dot; when empty it is taken from
/// `file_name`. The directory and any missing parents are created, so calling this twice
/// with the same arguments is harmless.
///
/// # Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use harvester::config::OrganizationRule;
/// use harvester::organizer::resolve;
/// use std::path::Path;
///
/// let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
/// let dir = resolve(Path::new("downloads"), "report.pdf", ".pdf", OrganizationRule::TypeThenDate, today)?;
/// assert_eq!(dir, Path::new("downloads/Pdf/2024-05-01"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn resolve(
    base_folder: &Path,
    file_name: &str,
    file_extension: &str,
    rule: OrganizationRule,
    today: NaiveDate,
) -> std::io::Result<PathBuf> {
    let dir = directory_for(base_folder, file_name, file_extension, rule, today);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Computes the destination directory without touching the filesystem
pub fn directory_for(
    base_folder: &Path,
    file_name: &str,
    file_extension: &str,
    rule: OrganizationRule,
    today: NaiveDate,
) -> PathBuf {
    match rule {
        OrganizationRule::Flat => base_folder.to_path_buf(),
        OrganizationRule::Date => base_folder.join(date_label(today)),
        OrganizationRule::Type => base_folder.join(type_label(file_name, file_extension)),
        OrganizationRule::TypeThenDate => base_folder
            .join(type_label(file_name, file_extension))
            .join(date_label(today)),
    }
}

/// Capitalized extension without its dot (`.pdf` becomes `Pdf`, `.tar.gz` becomes `Tar.gz`)
///
/// Returns [`NO_EXTENSION_LABEL`] for an empty extension.
pub fn extension_label(extension: &str) -> String {
    let bare = extension
        .trim()
        .to_lowercase()
        .split('.')
        .map(|piece| {
            piece
                .chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
                .collect::<String>()
        })
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(".");

    let mut chars = bare.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => NO_EXTENSION_LABEL.to_string(),
    }
}

fn type_label(file_name: &str, file_extension: &str) -> String {
    if file_extension.trim().trim_start_matches('.').is_empty() {
        let from_name = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        extension_label(from_name)
    } else {
        extension_label(file_extension)
    }
}

fn date_label(today: NaiveDate) -> String {
    today.format("%Y-%m-%d").to_string()
}
