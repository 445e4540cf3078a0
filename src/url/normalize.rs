use crate::UrlError;
use url::Url;

/// Parses an absolute http(s) URL
///
/// # Errors
///
/// * `UrlError::Parse` - the string is not an absolute URL
/// * `UrlError::InvalidScheme` - the scheme is neither `http` nor `https`
pub fn parse_http_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Computes the identifier used to deduplicate a download across runs
///
/// The identifier is the canonical absolute URL: parsed (which lowercases scheme and
/// host and resolves dot segments) with the fragment removed. Query strings are kept
/// since they often select different files. An absolute URL that is already canonical
/// maps to itself, so histories written from raw URLs keep matching.
///
/// # Examples
///
/// ```
/// use harvester::url::canonical_identifier;
///
/// let id = canonical_identifier("HTTPS://Example.COM/a/../files/x.pdf#page=2").unwrap();
/// assert_eq!(id, "https://example.com/files/x.pdf");
/// ```
pub fn canonical_identifier(raw: &str) -> Result<String, UrlError> {
    let mut url = parse_http_url(raw)?;
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Returns the percent-decoded last path segment of a URL
///
/// Undecodable sequences leave the segment as-is.
pub fn file_name_of(url: &Url) -> Result<String, UrlError> {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    if last.is_empty() {
        return Err(UrlError::MissingFileName(url.to_string()));
    }

    let decoded = urlencoding::decode(last)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| last.to_string());

    Ok(decoded)
}

/// Finds the allowed extension a decoded file name ends with
///
/// Matching is case-insensitive and by suffix, so multi-dot entries such as `.tar.gz`
/// work; the longest matching entry wins. A name that is nothing but the extension
/// (`.pdf`, dot-files) does not match.
pub fn matching_extension(file_name: &str, allowed_extensions: &[String]) -> Option<String> {
    let lower = file_name.to_lowercase();
    allowed_extensions
        .iter()
        .filter(|ext| lower.len() > ext.len() && lower.ends_with(ext.as_str()))
        .max_by_key(|ext| ext.len())
        .cloned()
}
