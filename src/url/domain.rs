use url::Url;

/// Extracts the lowercase host from a URL
///
/// Ports are not part of the host, so `example.com:8080` and `example.com`
/// share a host for link-scope purposes.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tablecrawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/list").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_with_path_and_query() {
        let url = Url::parse("https://Example.com/path/to/page?page=4").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }
}
