use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes a URL string into its canonical form
///
/// The canonical form is the dedup key for the frontier and the URL stored
/// with every page record and index row.
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse; reject if malformed
/// 2. Require an `http` or `https` scheme and a host
/// 3. Lowercase the host (done by the parser)
/// 4. Normalize the path:
///    - Decode percent-encoded unreserved characters, uppercase other escapes
///    - Remove dot segments and empty segments
///    - Remove the trailing slash
/// 5. Remove the fragment
/// 6. Remove tracking query parameters, sort the rest, drop an empty query
/// 7. Drop the lone `/` of a root URL
///
/// # Examples
///
/// ```
/// use ripple_index::url::normalize_url;
///
/// let url = normalize_url("  https://EN.Wikipedia.org/wiki/Rust/#History ").unwrap();
/// assert_eq!(url, "https://en.wikipedia.org/wiki/Rust");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    let url = canonicalize(url)?;
    Ok(canonical_string(&url))
}

/// Applies the normalization steps to an already parsed URL
///
/// The returned `Url` still serializes a root path as `/`; use
/// [`canonical_string`] for the dedup key.
pub fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&params);
        }
    }

    Ok(url)
}

/// Serializes a canonicalized URL, dropping the trailing slash of a bare root
pub fn canonical_string(url: &Url) -> String {
    let mut serialized = url.as_str().to_string();
    if url.path() == "/" && url.query().is_none() && serialized.ends_with('/') {
        serialized.pop();
    }
    serialized
}

/// Normalizes a URL path by fixing escapes, removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<String> = Vec::new();

    for segment in path.split('/') {
        let segment = normalize_percent_encoding(segment);
        match segment.as_str() {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Decodes escapes of unreserved characters and uppercases the remaining ones
///
/// `segment` comes from `Url::path`, which is always ASCII.
fn normalize_percent_encoding(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = String::with_capacity(segment.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let decoded = u8::from_str_radix(&segment[i + 1..i + 3], 16).unwrap_or(b'%');
            if decoded.is_ascii_alphanumeric() || matches!(decoded, b'-' | b'.' | b'_' | b'~') {
                out.push(decoded as char);
            } else {
                out.push_str(&format!("%{:02X}", decoded));
            }
            i += 3;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }

    out
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_root_has_no_trailing_slash() {
        assert_eq!(normalize_url("https://example.com/").unwrap(), "https://example.com");
        assert_eq!(normalize_url("https://example.com").unwrap(), "https://example.com");
        assert_eq!(
            normalize_url("http://127.0.0.1:8080/").unwrap(),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn test_keeps_scheme() {
        assert_eq!(
            normalize_url("http://example.com/page").unwrap(),
            "http://example.com/page"
        );
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_trims_whitespace() {
        let result = normalize_url("\n  https://example.com/page \t").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_lowercase_host_preserves_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result, "https://example.com/Page");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result, "https://example.com/b/c");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://example.com///path//to///page").unwrap();
        assert_eq!(result, "https://example.com/path/to/page");
    }

    #[test]
    fn test_parent_directory_at_root() {
        let result = normalize_url("https://example.com/../page").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_percent_encoding_normalized() {
        // %7E is "~" (unreserved) and gets decoded; %3a is reserved and gets uppercased
        let result = normalize_url("https://example.com/%7Euser/Special%3arandom").unwrap();
        assert_eq!(result, "https://example.com/~user/Special%3Arandom");
    }

    #[test]
    fn test_remove_tracking_params_and_sort() {
        let result = normalize_url(
            "https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123",
        )
        .unwrap();
        assert_eq!(result, "https://example.com/page?another=value&keep=yes");
    }

    #[test]
    fn test_empty_query_removed() {
        let result = normalize_url("https://example.com/page?").unwrap();
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(normalize_url("not a url"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://example.com/",
            "http://WWW.Example.com/a/./b/../c/",
            "https://example.com/wiki/Caf%c3%a9?b=2&a=1#top",
            "https://example.com/%7e/x%2fy",
            "https://example.com/?q=a%26b&utm_source=x",
            "http://127.0.0.1:4000/wiki/A",
        ];

        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(&once).unwrap();
            assert_eq!(once, twice, "normalization not idempotent for {}", input);
        }
    }
}
