//! Browser capability traits and error types
//!
//! The crawler only ever talks to a page through [`Browser`]. Engines plug in
//! by implementing it and a [`BrowserFactory`] that opens one browser per
//! dispatched Target.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur while driving a browser
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Timed out after {timeout:?} while {action} {url}")]
    Timeout {
        url: String,
        action: &'static str,
        timeout: Duration,
    },

    #[error("No document loaded")]
    NotLoaded,

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Element cannot be activated: {0}")]
    NotActivatable(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Browser could not be opened: {0}")]
    Open(String),
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// How to find an element on the current page
///
/// A CSS selector, optionally narrowed to elements whose visible text
/// contains `text` (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub css: String,
    pub text: Option<String>,
}

impl Locator {
    /// Matches the first element selected by `css`
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
        }
    }

    /// Matches the first element selected by `css` whose text contains `text`
    pub fn with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: Some(text.into()),
        }
    }

    /// Returns true if `visible_text` satisfies the text filter
    pub fn matches_text(&self, visible_text: &str) -> bool {
        match &self.text {
            None => true,
            Some(needle) => visible_text
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

/// A located element, detached from the live document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// The locator that found this element
    pub locator: Locator,

    /// Raw `href` attribute, if any
    pub href: Option<String>,

    /// Whitespace-collapsed visible text
    pub text: String,
}

/// Narrow interface over a headless browser page
///
/// Every method may suspend; none of them may block other in-flight Targets.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigates to `url` and waits for the initial response
    async fn navigate(&mut self, url: &Url) -> BrowserResult<()>;

    /// Waits until network and DOM activity settle, bounded by `timeout`
    async fn wait_for_stable(&mut self, timeout: Duration) -> BrowserResult<()>;

    /// Returns the serialized HTML of the current document
    async fn content(&self) -> BrowserResult<String>;

    /// Returns the URL of the current document, if any
    fn current_url(&self) -> Option<Url>;

    /// Returns the first element matching `locator`
    async fn locate(&self, locator: &Locator) -> BrowserResult<Option<ElementHandle>>;

    /// Activates an element (follows links, presses buttons)
    async fn click(&mut self, element: &ElementHandle) -> BrowserResult<()>;

    /// Runs a script in the page
    async fn evaluate(&mut self, script: &str) -> BrowserResult<()>;
}

/// Opens a fresh browser for each dispatched Target
pub trait BrowserFactory: Send + Sync {
    fn open(&self) -> BrowserResult<Box<dyn Browser>>;
}
