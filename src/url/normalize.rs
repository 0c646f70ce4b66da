use crate::UrlError;
use url::{form_urlencoded, Url};

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "msclkid"];

/// Normalizes a URL into the canonical form used for dedup
///
/// The canonical URL is also the URL that gets navigated, so normalization
/// only drops parts that never select different content:
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase the host (the parser also removes dot segments)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters (`utm_*`, `fbclid`, ...)
/// 6. Sort remaining query parameters by key, keeping the order of repeated keys
///    and the original encoding of every parameter
/// 7. Remove an empty query string
///
/// # Examples
///
/// ```
/// use tablecrawl::url::normalize_url;
///
/// let url = normalize_url("https://Example.COM/list?page=2&utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/list?page=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    url.set_fragment(None);

    if let Some(query) = url.query() {
        let query = filter_and_sort_query(query);
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Filters out tracking parameters and sorts the remaining ones by key
///
/// Segments are moved as-is: their original encoding is what the server
/// sees when the canonical URL is navigated.
fn filter_and_sort_query(query: &str) -> String {
    let mut segments: Vec<(String, &str)> = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| (decoded_key(segment), segment))
        .filter(|(key, _)| !is_tracking_param(key))
        .collect();

    // Stable sort keeps repeated keys in document order
    segments.sort_by(|a, b| a.0.cmp(&b.0));

    segments
        .into_iter()
        .map(|(_, segment)| segment)
        .collect::<Vec<_>>()
        .join("&")
}

/// Decodes the key of a `key=value` (or bare `key`) query segment
fn decoded_key(segment: &str) -> String {
    let raw_key = segment.split_once('=').map_or(segment, |(key, _)| key);
    form_urlencoded::parse(raw_key.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
