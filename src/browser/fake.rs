//! Scripted in-memory browser for unit tests

use crate::browser::http::locate_in_html;
use crate::browser::traits::{
    Browser, BrowserError, BrowserFactory, BrowserResult, ElementHandle, Locator,
};
use crate::crawler::resolve_link;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Serves canned pages and fails on demand
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeBrowser {
    pages: HashMap<String, String>,
    on_click: HashMap<String, String>,
    navigation_failures: u32,
    stabilize_failures: u32,
    stabilize_hangs: u32,
    click_failures: u32,
    current: Option<(Url, String)>,
    pub navigations: u32,
    pub evaluated: Vec<String>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        let key = Url::parse(url).map(|u| u.to_string()).unwrap_or_default();
        self.pages.insert(key, html.to_string());
        self
    }

    /// Clicking an element with this exact text navigates to `url`
    pub fn with_click_target(mut self, text: &str, url: &str) -> Self {
        self.on_click.insert(text.to_string(), url.to_string());
        self
    }

    pub fn failing_navigation(mut self, times: u32) -> Self {
        self.navigation_failures = times;
        self
    }

    pub fn failing_stabilize(mut self, times: u32) -> Self {
        self.stabilize_failures = times;
        self
    }

    /// `wait_for_stable` never returns for the next `times` calls
    pub fn hanging_stabilize(mut self, times: u32) -> Self {
        self.stabilize_hangs = times;
        self
    }

    pub fn failing_clicks(mut self, times: u32) -> Self {
        self.click_failures = times;
        self
    }

    fn body(&self) -> BrowserResult<&str> {
        self.current
            .as_ref()
            .map(|(_, body)| body.as_str())
            .ok_or(BrowserError::NotLoaded)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&mut self, url: &Url) -> BrowserResult<()> {
        self.navigations += 1;
        self.current = None;

        if self.navigation_failures > 0 {
            self.navigation_failures -= 1;
            return Err(BrowserError::Timeout {
                url: url.to_string(),
                action: "loading",
                timeout: Duration::from_millis(1),
            });
        }

        match self.pages.get(url.as_str()) {
            Some(body) => {
                self.current = Some((url.clone(), body.clone()));
                Ok(())
            }
            None => Err(BrowserError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn wait_for_stable(&mut self, timeout: Duration) -> BrowserResult<()> {
        let url = self
            .current
            .as_ref()
            .map(|(url, _)| url.to_string())
            .ok_or(BrowserError::NotLoaded)?;

        if self.stabilize_hangs > 0 {
            self.stabilize_hangs -= 1;
            std::future::pending::<()>().await;
        }

        if self.stabilize_failures > 0 {
            self.stabilize_failures -= 1;
            return Err(BrowserError::Timeout {
                url,
                action: "stabilizing",
                timeout,
            });
        }
        Ok(())
    }

    async fn content(&self) -> BrowserResult<String> {
        self.body().map(str::to_string)
    }

    fn current_url(&self) -> Option<Url> {
        self.current.as_ref().map(|(url, _)| url.clone())
    }

    async fn locate(&self, locator: &Locator) -> BrowserResult<Option<ElementHandle>> {
        locate_in_html(self.body()?, locator)
    }

    async fn click(&mut self, element: &ElementHandle) -> BrowserResult<()> {
        if self.click_failures > 0 {
            self.click_failures -= 1;
            return Err(BrowserError::NotActivatable(element.text.clone()));
        }

        let base = self.current_url().ok_or(BrowserError::NotLoaded)?;
        let target = match self.on_click.get(&element.text) {
            Some(url) => Url::parse(url).ok(),
            None => element
                .href
                .as_deref()
                .and_then(|href| resolve_link(href, &base)),
        };

        match target {
            Some(url) => self.navigate(&url).await,
            None => Err(BrowserError::NotActivatable(element.text.clone())),
        }
    }

    async fn evaluate(&mut self, script: &str) -> BrowserResult<()> {
        self.evaluated.push(script.to_string());
        Ok(())
    }
}

/// Hands out clones of a template browser
pub(crate) struct FakeBrowserFactory {
    template: FakeBrowser,
}

impl FakeBrowserFactory {
    pub fn new(template: FakeBrowser) -> Self {
        Self { template }
    }
}

impl BrowserFactory for FakeBrowserFactory {
    fn open(&self) -> BrowserResult<Box<dyn Browser>> {
        Ok(Box::new(self.template.clone()))
    }
}
