//! Fetch executor: the per-Target state machine
//!
//! One executor drives one Target through
//!
//! ```text
//! Queued → Loading → Stabilizing → Extracting → Persisting → Completed
//!             ↑          │              │
//!             └─ Retrying ←─────────────┘        (any non-terminal) → Failed
//! ```
//!
//! Browser errors while loading, stabilizing or extracting consume the
//! retry budget; store errors while persisting fail the Target at once.
//! Every Target ends in exactly one terminal state and a failure is always
//! reported with its stage, attempt count and message.

use crate::browser::{Browser, BrowserError};
use crate::config::Config;
use crate::crawler::chunker::build_chunks;
use crate::crawler::extractor::{Row, TableExtractor};
use crate::crawler::pagination::{PaginationResolver, Resolution};
use crate::crawler::parser::discover_links;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::scheduler::Target;
use crate::state::TargetState;
use crate::storage::{ArtifactKeys, KeyValueStore, Record, RecordSink, StoreError, TEXT_HTML};
use crate::{ConfigError, TablecrawlError};
use scraper::Selector;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Everything an executor needs besides its browser and stores
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub retry: RetryPolicy,
    pub stabilize_timeout: Duration,
    pub chunk_size: NonZeroUsize,
    pub save_raw_html: bool,
    pub save_chunk_html: bool,
    pub extractor: TableExtractor,
    pub follow: Option<Selector>,
    pub pagination: PaginationResolver,
}

impl ExecutorSettings {
    /// Builds settings from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let crawler = &config.crawler;
        let chunk_size = NonZeroUsize::new(config.output.chunk_size)
            .ok_or_else(|| ConfigError::Validation("chunk-size must be at least 1".to_string()))?;

        let follow = crawler
            .follow_selector()
            .map(|css| {
                Selector::parse(css)
                    .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", css, e)))
            })
            .transpose()?;

        Ok(Self {
            retry: RetryPolicy::new(crawler.max_request_retries, crawler.retry_delay()),
            stabilize_timeout: crawler.stabilize_timeout(),
            chunk_size,
            save_raw_html: config.output.save_raw_html,
            save_chunk_html: config.output.save_chunk_html,
            extractor: TableExtractor::new(&crawler.table_selector)?,
            follow,
            pagination: PaginationResolver::new(crawler.recovery_delay()),
        })
    }
}

/// What a completed Target produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub rows: usize,
    pub chunks: usize,
    pub artifacts_written: usize,
    pub records_emitted: usize,
    pub attempts: u32,
    pub next_page: Option<String>,
}

/// Why a Target ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetFailure {
    pub target_id: u64,
    pub url: String,
    /// State the Target was in when it gave up
    pub stage: TargetState,
    pub attempts: u32,
    pub message: String,
}

/// Final result of executing one Target
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: Target,
    pub history: Vec<TargetState>,
    pub result: Result<PageSummary, TargetFailure>,
    /// Follow-on URLs: the next page first, then followed links
    pub discovered: Vec<Url>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Mutable state of one Target moving through the executor
#[derive(Debug)]
pub struct TargetContext {
    target: Target,
    state: TargetState,
    attempts: u32,
    history: Vec<TargetState>,
    document: Option<String>,
    rows: Vec<Row>,
    summary: PageSummary,
    discovered: Vec<Url>,
    failure: Option<TargetFailure>,
}

impl TargetContext {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            state: TargetState::Queued,
            attempts: 0,
            history: vec![TargetState::Queued],
            document: None,
            rows: Vec::new(),
            summary: PageSummary::default(),
            discovered: Vec::new(),
            failure: None,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn history(&self) -> &[TargetState] {
        &self.history
    }

    fn advance(&mut self, next: TargetState) -> Result<(), TablecrawlError> {
        if !self.state.can_transition_to(next) {
            return Err(TablecrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Target {}: {} -> {}", self.target.id, self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    fn fail(&mut self, message: String) {
        if self.state.is_terminal() {
            return;
        }
        self.failure = Some(TargetFailure {
            target_id: self.target.id.0,
            url: self.target.url.to_string(),
            stage: self.state,
            attempts: self.attempts,
            message,
        });
        self.state = TargetState::Failed;
        self.history.push(TargetState::Failed);
    }

    fn into_outcome(mut self) -> TargetOutcome {
        let result = match self.failure.take() {
            Some(failure) => Err(failure),
            None => {
                self.summary.attempts = self.attempts;
                Ok(self.summary)
            }
        };

        TargetOutcome {
            target: self.target,
            history: self.history,
            result,
            discovered: self.discovered,
        }
    }
}

/// Drives Targets through the state machine with one browser
pub struct FetchExecutor {
    browser: Box<dyn Browser>,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn RecordSink>,
    settings: Arc<ExecutorSettings>,
}

impl FetchExecutor {
    pub fn new(
        browser: Box<dyn Browser>,
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn RecordSink>,
        settings: Arc<ExecutorSettings>,
    ) -> Self {
        Self {
            browser,
            store,
            sink,
            settings,
        }
    }

    /// Runs `target` to a terminal state
    pub async fn execute(&mut self, target: Target) -> TargetOutcome {
        let mut ctx = TargetContext::new(target);

        while !ctx.state().is_terminal() {
            if let Err(e) = self.step(&mut ctx).await {
                ctx.fail(e.to_string());
            }
        }

        let outcome = ctx.into_outcome();
        match &outcome.result {
            Ok(summary) => tracing::info!(
                "Processed {} {} ({} rows, {} chunks)",
                outcome.target.id,
                outcome.target.url,
                summary.rows,
                summary.chunks
            ),
            Err(failure) => tracing::warn!(
                "Failed {} {} while {} after {} attempt(s): {}",
                outcome.target.id,
                failure.url,
                failure.stage,
                failure.attempts,
                failure.message
            ),
        }
        outcome
    }

    /// Performs the work of the current state and moves to the next one
    pub async fn step(&mut self, ctx: &mut TargetContext) -> Result<(), TablecrawlError> {
        match ctx.state {
            TargetState::Queued => ctx.advance(TargetState::Loading),

            TargetState::Loading => {
                ctx.attempts += 1;
                tracing::debug!(
                    "Loading {} (attempt {}/{})",
                    ctx.target.url,
                    ctx.attempts,
                    self.settings.retry.max_attempts()
                );
                match self.browser.navigate(&ctx.target.url).await {
                    Ok(()) => ctx.advance(TargetState::Stabilizing),
                    Err(e) => self.recover(ctx, e),
                }
            }

            TargetState::Stabilizing => {
                let timeout = self.settings.stabilize_timeout;
                let settled =
                    match tokio::time::timeout(timeout, self.browser.wait_for_stable(timeout)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(BrowserError::Timeout {
                            url: ctx.target.url.to_string(),
                            action: "stabilizing",
                            timeout,
                        }),
                    };
                match settled {
                    Ok(()) => ctx.advance(TargetState::Extracting),
                    Err(e) => self.recover(ctx, e),
                }
            }

            TargetState::Extracting => match self.browser.content().await {
                Ok(html) => {
                    ctx.rows = self.settings.extractor.extract(&html);
                    ctx.document = Some(html);
                    ctx.advance(TargetState::Persisting)
                }
                Err(e) => self.recover(ctx, e),
            },

            TargetState::Persisting => match self.persist(ctx).await {
                Ok(()) => {
                    self.discover(ctx).await;
                    ctx.advance(TargetState::Completed)
                }
                Err(e) => {
                    ctx.fail(format!("Persisting failed: {}", e));
                    Ok(())
                }
            },

            TargetState::Retrying => {
                self.settings.retry.wait().await;
                ctx.advance(TargetState::Loading)
            }

            TargetState::Completed | TargetState::Failed => Ok(()),
        }
    }

    /// Retries a browser error if the state and budget allow, otherwise fails the Target
    fn recover(&self, ctx: &mut TargetContext, error: BrowserError) -> Result<(), TablecrawlError> {
        if ctx.state.is_retryable() && self.settings.retry.allows_retry(ctx.attempts) {
            tracing::warn!(
                "{} failed while {} (attempt {}/{}), retrying: {}",
                ctx.target.url,
                ctx.state,
                ctx.attempts,
                self.settings.retry.max_attempts(),
                error
            );
            ctx.advance(TargetState::Retrying)
        } else {
            ctx.fail(error.to_string());
            Ok(())
        }
    }

    /// Writes the raw page, row records, then each chunk artifact and record
    async fn persist(&self, ctx: &mut TargetContext) -> Result<(), StoreError> {
        let target_id = ctx.target.id.0;
        let url = ctx.target.url.to_string();
        let keys = ArtifactKeys::for_url(&ctx.target.url);
        let mut summary = PageSummary {
            rows: ctx.rows.len(),
            ..Default::default()
        };

        if self.settings.save_raw_html {
            if let Some(html) = &ctx.document {
                self.store.set_value(&keys.raw_page(), html, TEXT_HTML).await?;
                summary.artifacts_written += 1;
            }
        }

        for (position, cells) in ctx.rows.iter().enumerate() {
            let record = Record::Row {
                target_id,
                url: url.clone(),
                position,
                cells: cells.clone(),
            };
            self.sink.push_record(&record).await?;
            summary.records_emitted += 1;
        }

        let chunks = build_chunks(&ctx.rows, self.settings.chunk_size);
        for chunk in &chunks {
            if self.settings.save_chunk_html {
                self.store
                    .set_value(&keys.chunk(chunk.index), &chunk.to_html(), TEXT_HTML)
                    .await?;
                summary.artifacts_written += 1;
            }

            let record = Record::Chunk {
                target_id,
                url: url.clone(),
                chunk_index: chunk.index,
                row_count: chunk.row_count(),
                rows: chunk.rows.clone(),
            };
            self.sink.push_record(&record).await?;
            summary.records_emitted += 1;
        }

        summary.chunks = chunks.len();
        ctx.summary = summary;
        Ok(())
    }

    /// Collects follow-on URLs from the loaded page
    async fn discover(&mut self, ctx: &mut TargetContext) {
        let base = self
            .browser
            .current_url()
            .unwrap_or_else(|| ctx.target.url.clone());

        let followed = match (&self.settings.follow, &ctx.document) {
            (Some(selector), Some(html)) => discover_links(html, &base, selector),
            _ => Vec::new(),
        };

        let resolution = self
            .settings
            .pagination
            .resolve(self.browser.as_mut())
            .await;
        if let Resolution::Next { url, .. } = resolution {
            ctx.summary.next_page = Some(url.to_string());
            ctx.discovered.push(url);
        }
        ctx.discovered.extend(followed);
        ctx.document = None;
    }
}
