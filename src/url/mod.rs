//! URL handling module for Tablecrawl
//!
//! This module provides URL normalization, host extraction and the link
//! scope policy that decides which discovered URLs may enter the frontier.

mod domain;
mod normalize;

use serde::Deserialize;
use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use normalize::normalize_url;

/// Which discovered links may be enqueued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkScope {
    /// Only links on the start URL's host
    #[default]
    SameHost,
    /// Any http(s) link
    Any,
}

impl LinkScope {
    /// Returns true if `candidate` may be crawled from a run rooted at `origin_host`
    ///
    /// # Examples
    ///
    /// ```
    /// use tablecrawl::url::LinkScope;
    /// use url::Url;
    ///
    /// let candidate = Url::parse("https://other.org/list").unwrap();
    /// assert!(!LinkScope::SameHost.allows("example.com", &candidate));
    /// assert!(LinkScope::Any.allows("example.com", &candidate));
    /// ```
    pub fn allows(&self, origin_host: &str, candidate: &Url) -> bool {
        match self {
            Self::Any => true,
            Self::SameHost => {
                extract_domain(candidate).is_some_and(|host| host == origin_host)
            }
        }
    }
}
