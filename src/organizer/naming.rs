//! File-name sanitizing and collision handling

use std::path::{Path, PathBuf};

/// Name used when nothing usable is left after sanitizing
pub const FALLBACK_FILE_NAME: &str = "download";

/// Longest file name (in bytes) produced by [`sanitize_file_name`]
const MAX_FILE_NAME_BYTES: usize = 200;

/// Sanitizes a remote file name so it can only ever name a file inside its directory
///
/// - path separators split the name; empty, `.` and `..` pieces are dropped and the rest
///   joined with `_`
/// - characters invalid on common filesystems and control characters become `_`
/// - leading dots and surrounding whitespace are trimmed
/// - overly long names are shortened, keeping the extension
///
/// # Examples
///
/// ```
/// use harvester::organizer::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("../../etc/passwd.pdf"), "etc_passwd.pdf");
/// assert_eq!(sanitize_file_name("report: final?.pdf"), "report_ final_.pdf");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let joined = name
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|piece| !piece.is_empty() && *piece != "." && *piece != "..")
        .collect::<Vec<_>>()
        .join("_");

    let cleaned: String = joined
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim().trim_start_matches('.').trim_end_matches(['.', ' ']);

    if cleaned.is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }

    truncate_name(cleaned)
}

/// Splits a file name into stem and extension (extension keeps its dot)
///
/// A leading dot does not start an extension.
pub fn split_file_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Picks a free path for a new file inside `dir`
///
/// When `dir/file_name` is taken, the first free name of the form `stem(1).ext`,
/// `stem(2).ext`, ... is returned instead, so existing files are never overwritten.
pub fn destination_path(dir: &Path, file_name: &str) -> PathBuf {
    let plain = dir.join(file_name);
    if !plain.exists() {
        return plain;
    }

    let (stem, ext) = split_file_name(file_name);
    (1u64..)
        .map(|n| dir.join(format!("{}({}){}", stem, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(plain)
}

fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_FILE_NAME_BYTES {
        return name.to_string();
    }

    let (stem, ext) = split_file_name(name);
    let ext = if ext.len() < MAX_FILE_NAME_BYTES / 2 { ext } else { "" };
    let mut budget = MAX_FILE_NAME_BYTES - ext.len();
    while !stem.is_char_boundary(budget.min(stem.len())) {
        budget -= 1;
    }
    format!("{}{}", &stem[..budget.min(stem.len())], ext)
}
