//! Link discovery for follow-on Targets
//!
//! Besides the pagination chain, a crawl may follow links matched by the
//! configured follow selector (e.g. the detail page of every row).
//!
//! **Include:** `href`s of elements matched by the selector, resolved
//! against the page URL.
//!
//! **Exclude:**
//! - `<a ... download>`
//! - `javascript:`, `mailto:`, `tel:` and `data:` links
//! - Fragment-only links
//! - Anything that does not resolve to HTTP(S)

use scraper::{Html, Selector};
use url::Url;

/// Returns the follow-on URLs matched by `selector`, in document order
///
/// # Arguments
///
/// * `html` - The page HTML
/// * `base_url` - URL of the page, used to resolve relative links
/// * `selector` - Elements whose `href` should be followed
pub fn discover_links(html: &str, base_url: &Url, selector: &Selector) -> Vec<Url> {
    let document = Html::parse_document(html);

    document
        .select(selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves an `href` to an absolute HTTP(S) URL
///
/// Returns None if the link should not be followed.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/list?page=1").unwrap()
    }

    fn links(html: &str, selector: &str) -> Vec<String> {
        let selector = Selector::parse(selector).unwrap();
        discover_links(html, &base_url(), &selector)
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_selector_limits_discovery() {
        let html = r#"
            <a href="/home">Home</a>
            <table>
                <tr><td><a class="detail" href="/cr/1">CR 1</a></td></tr>
                <tr><td><a class="detail" href="cr/2">CR 2</a></td></tr>
            </table>
        "#;
        assert_eq!(
            links(html, "a.detail"),
            vec!["https://example.com/cr/1", "https://example.com/cr/2"]
        );
    }

    #[test]
    fn test_absolute_links_kept() {
        let html = r#"<a href="https://other.org/x">x</a>"#;
        assert_eq!(links(html, "a"), vec!["https://other.org/x"]);
    }

    #[test]
    fn test_unfollowable_links_skipped() {
        let html = r##"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:chair@example.com">mail</a>
            <a href="tel:+123">call</a>
            <a href="data:text/html,hi">data</a>
            <a href="#top">top</a>
            <a href="">empty</a>
            <a href="/file.zip" download>zip</a>
            <a href="ftp://example.com/f">ftp</a>
            <a>no href</a>
        "##;
        assert!(links(html, "a").is_empty());
    }

    #[test]
    fn test_query_only_href() {
        let html = r#"<a href="?page=2">2</a>"#;
        assert_eq!(links(html, "a"), vec!["https://example.com/list?page=2"]);
    }

    #[test]
    fn test_resolve_link_trims() {
        let resolved = resolve_link("  /next  ", &base_url()).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/next");
    }
}
