//! Browser capability consumed by the crawler
//!
//! The crawl core never renders pages itself. It drives a [`Browser`]:
//! navigate, wait for the page to settle, read the document, locate and
//! activate elements. [`HttpBrowser`] covers server-rendered sites; a
//! scripting engine can be plugged in through [`BrowserFactory`].

#[cfg(test)]
pub(crate) mod fake;
mod http;
mod traits;

pub use http::{build_http_client, locate_in_html, HttpBrowser, HttpBrowserFactory};
pub use traits::{
    Browser, BrowserError, BrowserFactory, BrowserResult, ElementHandle, Locator,
};
