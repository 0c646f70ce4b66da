//! Robots.txt handling module
//!
//! When enabled, every Target is checked against its host's robots.txt
//! before dispatch. Each host's file is fetched once per run; an
//! unreachable or missing file allows everything.

mod parser;

pub use parser::RobotsRules;

use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches robots.txt for an origin
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `origin` - Scheme, host and port, e.g. `https://example.com`
///
/// # Returns
///
/// The parsed rules, or allow-all rules if the file could not be retrieved
pub async fn fetch_robots(client: &Client, origin: &str) -> RobotsRules {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = match client.get(&robots_url).timeout(ROBOTS_TIMEOUT).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Could not fetch {}: {}; allowing all", robots_url, e);
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!("{} returned {}; allowing all", robots_url, response.status());
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => RobotsRules::from_content(&body),
        Err(e) => {
            tracing::warn!("Could not read {}: {}; allowing all", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}

/// Per-run robots.txt gate with a host cache
pub struct RobotsGate {
    client: Client,
    user_agent: String,
    rules: HashMap<String, RobotsRules>,
}

impl RobotsGate {
    /// Creates a gate matching rules for `user_agent` (the product token)
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            rules: HashMap::new(),
        }
    }

    /// Returns true if robots.txt allows fetching `url`
    pub async fn allows(&mut self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();

        if !self.rules.contains_key(&origin) {
            let rules = fetch_robots(&self.client, &origin).await;
            self.rules.insert(origin.clone(), rules);
        }

        self.rules
            .get(&origin)
            .map_or(true, |rules| rules.is_allowed(url.as_str(), &self.user_agent))
    }

    /// Number of origins whose robots.txt has been fetched
    pub fn cached_origins(&self) -> usize {
        self.rules.len()
    }
}
