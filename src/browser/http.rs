//! HTTP-backed browser for server-rendered pages
//!
//! Navigation is a plain GET; the fully read response body is the settled
//! document, elements are located on the parsed HTML and clicking a link
//! follows its `href`. There is no script engine, so `evaluate` reports
//! `Unsupported` and JS-only pagination ends the chain.

use crate::browser::traits::{
    Browser, BrowserError, BrowserFactory, BrowserResult, ElementHandle, Locator,
};
use crate::config::UserAgentConfig;
use crate::crawler::normalize_text;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use tablecrawl::config::UserAgentConfig;
/// use tablecrawl::browser::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A document retrieved by the last successful navigation
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    body: String,
}

/// Browser implementation over a shared `reqwest` client
pub struct HttpBrowser {
    client: Client,
    navigation_timeout: Duration,
    page: Option<LoadedPage>,
}

impl HttpBrowser {
    pub fn new(client: Client, navigation_timeout: Duration) -> Self {
        Self {
            client,
            navigation_timeout,
            page: None,
        }
    }

    fn loaded(&self) -> BrowserResult<&LoadedPage> {
        self.page.as_ref().ok_or(BrowserError::NotLoaded)
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn navigate(&mut self, url: &Url) -> BrowserResult<()> {
        self.page = None;
        let timeout = self.navigation_timeout;
        let client = self.client.clone();

        let fetch = async move {
            let response = client.get(url.clone()).send().await?;
            let status = response.status();
            let final_url = response.url().clone();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, final_url, body))
        };

        let (status, final_url, body) = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| BrowserError::Timeout {
                url: url.to_string(),
                action: "loading",
                timeout,
            })?
            .map_err(|e| classify_reqwest_error(url, e, timeout))?;

        if !status.is_success() {
            return Err(BrowserError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::trace!("Loaded {} ({} bytes)", final_url, body.len());
        self.page = Some(LoadedPage {
            url: final_url,
            body,
        });
        Ok(())
    }

    async fn wait_for_stable(&mut self, _timeout: Duration) -> BrowserResult<()> {
        // A fully read body has no pending network activity.
        self.loaded().map(|_| ())
    }

    async fn content(&self) -> BrowserResult<String> {
        self.loaded().map(|page| page.body.clone())
    }

    fn current_url(&self) -> Option<Url> {
        self.page.as_ref().map(|page| page.url.clone())
    }

    async fn locate(&self, locator: &Locator) -> BrowserResult<Option<ElementHandle>> {
        let page = self.loaded()?;
        locate_in_html(&page.body, locator)
    }

    async fn click(&mut self, element: &ElementHandle) -> BrowserResult<()> {
        let base = self.loaded()?.url.clone();
        let href = element
            .href
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:"))
            .ok_or_else(|| BrowserError::NotActivatable(element.text.clone()))?;

        let target = base
            .join(href)
            .map_err(|e| BrowserError::NotActivatable(format!("{}: {}", href, e)))?;
        self.navigate(&target).await
    }

    async fn evaluate(&mut self, _script: &str) -> BrowserResult<()> {
        Err(BrowserError::Unsupported(
            "script evaluation needs a scripting browser".to_string(),
        ))
    }
}

/// Finds the first element in `html` matching `locator`
///
/// Kept synchronous: the parsed document is not `Send` and must never be
/// held across an await point.
pub fn locate_in_html(html: &str, locator: &Locator) -> BrowserResult<Option<ElementHandle>> {
    let selector = Selector::parse(&locator.css)
        .map_err(|e| BrowserError::InvalidSelector(format!("{}: {:?}", locator.css, e)))?;
    let document = Html::parse_document(html);

    let found = document
        .select(&selector)
        .map(|element| {
            let text = normalize_text(&element.text().collect::<String>());
            (element, text)
        })
        .find(|(_, text)| locator.matches_text(text))
        .map(|(element, text)| ElementHandle {
            locator: locator.clone(),
            href: element.value().attr("href").map(str::to_string),
            text,
        });

    Ok(found)
}

fn classify_reqwest_error(url: &Url, error: reqwest::Error, timeout: Duration) -> BrowserError {
    if error.is_timeout() {
        BrowserError::Timeout {
            url: url.to_string(),
            action: "loading",
            timeout,
        }
    } else {
        BrowserError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Opens [`HttpBrowser`]s sharing one connection pool
#[derive(Clone)]
pub struct HttpBrowserFactory {
    client: Client,
    navigation_timeout: Duration,
}

impl HttpBrowserFactory {
    pub fn new(client: Client, navigation_timeout: Duration) -> Self {
        Self {
            client,
            navigation_timeout,
        }
    }
}

impl BrowserFactory for HttpBrowserFactory {
    fn open(&self) -> BrowserResult<Box<dyn Browser>> {
        Ok(Box::new(HttpBrowser::new(
            self.client.clone(),
            self.navigation_timeout,
        )))
    }
}
