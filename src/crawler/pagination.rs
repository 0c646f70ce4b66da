//! Pagination resolution
//!
//! Finds the control that leads to the next page of a listing and turns it
//! into the URL of the next Target. Strategies are tried in a fixed order:
//!
//! 1. [`PaginationStrategy::ExplicitNext`]: `a[rel~=next]`, `a.next`, or a
//!    link whose text contains "next"
//! 2. [`PaginationStrategy::PagerSibling`]: the link right after the active
//!    item of a pager (`ul.pagination li.active + li a`, `.pager a.next`)
//!
//! A followable `href` is used as-is. Otherwise the control is clicked and
//! the browser's new location becomes the next Target. A failed click gets
//! one recovery attempt: scroll to the bottom, wait, locate again, click
//! again. A control that leads back to the current page ends the chain.

use crate::browser::{Browser, ElementHandle, Locator};
use crate::crawler::parser::resolve_link;
use crate::crawler::retry::RetryPolicy;
use crate::url::normalize_url;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Script evaluated before retrying a failed click
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Ways a page can point at its successor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStrategy {
    ExplicitNext,
    PagerSibling,
}

impl PaginationStrategy {
    /// Strategies in the order they are tried
    pub const ORDERED: [PaginationStrategy; 2] =
        [PaginationStrategy::ExplicitNext, PaginationStrategy::PagerSibling];

    /// Locators for this strategy, most specific first
    pub fn locators(self) -> Vec<Locator> {
        match self {
            Self::ExplicitNext => vec![
                Locator::css(r#"a[rel~="next"]"#),
                Locator::css("a.next"),
                Locator::with_text("a", "next"),
            ],
            Self::PagerSibling => vec![
                Locator::css("ul.pagination li.active + li a"),
                Locator::css(".pager a.next"),
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitNext => "explicit_next",
            Self::PagerSibling => "pager_sibling",
        }
    }
}

/// Outcome of looking for a next page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Next {
        strategy: PaginationStrategy,
        url: Url,
    },
    Exhausted,
}

/// Resolves the next page of the document currently loaded in a browser
#[derive(Debug, Clone)]
pub struct PaginationResolver {
    recovery: RetryPolicy,
}

impl PaginationResolver {
    /// Creates a resolver with a single scroll-and-retry recovery
    pub fn new(recovery_delay: Duration) -> Self {
        Self::with_recovery(RetryPolicy::new(1, recovery_delay))
    }

    pub fn with_recovery(recovery: RetryPolicy) -> Self {
        Self { recovery }
    }

    /// Looks for the next page of the browser's current document
    ///
    /// Never fails: anything that prevents finding a successor is logged
    /// and reported as [`Resolution::Exhausted`].
    pub async fn resolve(&self, browser: &mut dyn Browser) -> Resolution {
        let Some(current) = browser.current_url() else {
            return Resolution::Exhausted;
        };

        let Some((strategy, element)) = find_control(&*browser).await else {
            tracing::debug!("No next-page control on {}", current);
            return Resolution::Exhausted;
        };

        let next = match element
            .href
            .as_deref()
            .and_then(|href| resolve_link(href, &current))
        {
            Some(url) => Some(url),
            None => self.activate(browser, element).await,
        };

        match next {
            Some(url) if !same_page(&url, &current) => {
                tracing::debug!("Next page of {} via {}: {}", current, strategy.as_str(), url);
                Resolution::Next { strategy, url }
            }
            Some(_) => {
                tracing::debug!("Next-page control on {} points back to itself", current);
                Resolution::Exhausted
            }
            None => Resolution::Exhausted,
        }
    }

    /// Clicks a control and returns where the browser ended up
    async fn activate(&self, browser: &mut dyn Browser, element: ElementHandle) -> Option<Url> {
        let mut element = element;
        let mut recoveries = 0;

        loop {
            match browser.click(&element).await {
                Ok(()) => return browser.current_url(),
                Err(e) if recoveries < self.recovery.max_retries => {
                    recoveries += 1;
                    tracing::warn!("Click on next-page control failed ({}), scrolling and retrying", e);

                    if let Err(e) = browser.evaluate(SCROLL_TO_BOTTOM).await {
                        tracing::debug!("Scroll before retry failed: {}", e);
                    }
                    self.recovery.wait().await;

                    match browser.locate(&element.locator).await {
                        Ok(Some(found)) => element = found,
                        _ => return None,
                    }
                }
                Err(e) => {
                    tracing::warn!("Next-page control could not be activated: {}", e);
                    return None;
                }
            }
        }
    }
}

impl Default for PaginationResolver {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

/// Finds the first control matched by the strategies, in priority order
async fn find_control(browser: &dyn Browser) -> Option<(PaginationStrategy, ElementHandle)> {
    for strategy in PaginationStrategy::ORDERED {
        for locator in strategy.locators() {
            match browser.locate(&locator).await {
                Ok(Some(element)) => return Some((strategy, element)),
                Ok(None) => {}
                Err(e) => tracing::debug!("Locator {:?} failed: {}", locator, e),
            }
        }
    }
    None
}

fn same_page(a: &Url, b: &Url) -> bool {
    match (normalize_url(a.as_str()), normalize_url(b.as_str())) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeBrowser;

    const PAGE_1: &str = "https://example.com/list?page=1";

    async fn loaded(html: &str) -> FakeBrowser {
        let mut browser = FakeBrowser::new()
            .with_page(PAGE_1, html)
            .with_page("https://example.com/list?page=2", "<p>two</p>");
        browser.navigate(&Url::parse(PAGE_1).unwrap()).await.unwrap();
        browser
    }

    fn resolver() -> PaginationResolver {
        PaginationResolver::new(Duration::ZERO)
    }

    fn next(strategy: PaginationStrategy, url: &str) -> Resolution {
        Resolution::Next {
            strategy,
            url: Url::parse(url).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_rel_next_preferred_over_pager() {
        let mut browser = loaded(
            r#"
            <ul class="pagination">
                <li class="active"><a href="?page=1">1</a></li>
                <li><a href="?page=9">9</a></li>
            </ul>
            <a rel="next" href="?page=2">more</a>
            "#,
        )
        .await;

        let resolution = resolver().resolve(&mut browser).await;
        assert_eq!(
            resolution,
            next(PaginationStrategy::ExplicitNext, "https://example.com/list?page=2")
        );
    }

    #[tokio::test]
    async fn test_next_by_link_text() {
        let mut browser = loaded(r#"<a href="/list?page=2">Next &raquo;</a>"#).await;
        let resolution = resolver().resolve(&mut browser).await;
        assert_eq!(
            resolution,
            next(PaginationStrategy::ExplicitNext, "https://example.com/list?page=2")
        );
    }

    #[tokio::test]
    async fn test_pager_sibling() {
        let mut browser = loaded(
            r#"
            <ul class="pagination">
                <li><a href="?page=0">0</a></li>
                <li class="active"><a href="?page=1">1</a></li>
                <li><a href="?page=2">2</a></li>
            </ul>
            "#,
        )
        .await;

        let resolution = resolver().resolve(&mut browser).await;
        assert_eq!(
            resolution,
            next(PaginationStrategy::PagerSibling, "https://example.com/list?page=2")
        );
    }

    #[tokio::test]
    async fn test_no_control_is_exhausted() {
        let mut browser = loaded("<table><tr><td>last page</td></tr></table>").await;
        assert_eq!(resolver().resolve(&mut browser).await, Resolution::Exhausted);
        assert!(browser.evaluated.is_empty());
    }

    #[tokio::test]
    async fn test_link_to_current_page_is_exhausted() {
        let mut browser = loaded(r##"<a rel="next" href="?page=1#top">next</a>"##).await;
        assert_eq!(resolver().resolve(&mut browser).await, Resolution::Exhausted);
    }

    #[tokio::test]
    async fn test_script_control_clicked_after_scroll_recovery() {
        let mut browser = loaded(r#"<a class="next" href="javascript:go(2)">more</a>"#)
            .await
            .with_click_target("more", "https://example.com/list?page=2")
            .failing_clicks(1);

        let resolution = resolver().resolve(&mut browser).await;
        assert_eq!(
            resolution,
            next(PaginationStrategy::ExplicitNext, "https://example.com/list?page=2")
        );
        assert_eq!(browser.evaluated, vec![SCROLL_TO_BOTTOM.to_string()]);
    }

    #[tokio::test]
    async fn test_click_failing_after_recovery_is_exhausted() {
        let mut browser = loaded(r#"<a class="next" href="javascript:go(2)">more</a>"#)
            .await
            .failing_clicks(2);

        assert_eq!(resolver().resolve(&mut browser).await, Resolution::Exhausted);
        assert_eq!(browser.evaluated.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_loaded_is_exhausted() {
        let mut browser = FakeBrowser::new();
        assert_eq!(resolver().resolve(&mut browser).await, Resolution::Exhausted);
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(
            PaginationStrategy::ORDERED,
            [PaginationStrategy::ExplicitNext, PaginationStrategy::PagerSibling]
        );
        assert_eq!(PaginationStrategy::ExplicitNext.locators().len(), 3);
    }
}
