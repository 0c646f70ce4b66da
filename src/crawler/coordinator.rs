//! Crawl coordinator - main orchestration logic
//!
//! This module contains the main crawl loop that:
//! - Dispatches Targets from the scheduler while permits and the page cap allow
//! - Runs one fetch executor per Target on the tokio runtime
//! - Feeds discovered URLs back through robots.txt and the scheduler
//! - Accumulates the run report
//!
//! The coordinator is the only owner of the frontier. Executors never touch
//! it; they hand their discovered URLs back in the [`TargetOutcome`].

use crate::browser::{build_http_client, BrowserFactory, HttpBrowserFactory};
use crate::config::{validate, Config};
use crate::crawler::executor::{ExecutorSettings, FetchExecutor, TargetFailure, TargetOutcome};
use crate::crawler::scheduler::{Admission, ScheduledTarget, Scheduler, Target, TargetId};
use crate::output::{generate_markdown_summary, CrawlReport};
use crate::robots::RobotsGate;
use crate::state::TargetState;
use crate::storage::{FsKeyValueStore, KeyValueStore, RecordSink, RunStatus, SqliteRecordSink};
use crate::url::normalize_url;
use crate::{ConfigError, TablecrawlError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use url::Url;

/// Targets processed between progress log lines
const PROGRESS_INTERVAL: u32 = 10;

/// Drives one crawl run from the start URL to an empty frontier
pub struct Coordinator {
    settings: Arc<ExecutorSettings>,
    browsers: Arc<dyn BrowserFactory>,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn RecordSink>,
    scheduler: Scheduler,
    robots: Option<RobotsGate>,
    report: CrawlReport,
    start_url: Url,
    in_flight: HashMap<TargetId, Target>,
}

impl Coordinator {
    /// Creates a coordinator for a validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration; must name a start URL
    /// * `browsers` - Opens one browser per dispatched Target
    /// * `store` - Receives HTML artifacts
    /// * `sink` - Receives row and chunk records
    ///
    /// # Returns
    ///
    /// The coordinator, or a configuration error. Configuration errors are
    /// the only errors that stop a run before it starts.
    pub fn new(
        config: &Config,
        browsers: Arc<dyn BrowserFactory>,
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self, TablecrawlError> {
        validate(config)?;

        let raw_start = config
            .crawler
            .start_url
            .as_deref()
            .map(str::trim)
            .ok_or(ConfigError::MissingStartUrl)?;
        let start_url = normalize_url(raw_start)?;

        let settings = ExecutorSettings::from_config(config)?;
        let scheduler = Scheduler::new(start_url.clone(), &config.crawler);

        Ok(Self {
            settings: Arc::new(settings),
            browsers,
            store,
            sink,
            scheduler,
            robots: None,
            report: CrawlReport::new(start_url.as_str()),
            start_url,
            in_flight: HashMap::new(),
        })
    }

    /// Checks every Target against robots.txt before it enters the frontier
    pub fn with_robots(mut self, gate: RobotsGate) -> Self {
        self.robots = Some(gate);
        self
    }

    /// Tags the report with the run id of the record database
    pub fn with_run_id(mut self, run_id: i64) -> Self {
        self.report.run_id = Some(run_id);
        self
    }

    /// Runs the crawl until no Target is queued or in flight
    ///
    /// Individual Target failures never end the run; they are collected in
    /// the returned report.
    pub async fn run(mut self) -> CrawlReport {
        tracing::info!("Starting crawl at {}", self.start_url);
        let started = Instant::now();

        self.check_start_url().await;

        let mut tasks: JoinSet<TargetOutcome> = JoinSet::new();
        loop {
            self.dispatch_ready(&mut tasks).await;

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            match joined {
                Ok(outcome) => self.handle_outcome(outcome).await,
                Err(e) => tracing::error!("Executor task ended abnormally: {}", e),
            }

            let processed = self.report.targets_processed();
            if processed > 0 && processed % PROGRESS_INTERVAL == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 {
                    processed as f64 / elapsed
                } else {
                    0.0
                };
                tracing::info!(
                    "Progress: {} pages processed, {} in frontier, {:.2} pages/sec",
                    processed,
                    self.scheduler.frontier_size(),
                    rate
                );
            }
        }

        self.fail_orphans().await;
        self.finish()
    }

    /// Drops the seeded start Target if robots.txt disallows it
    async fn check_start_url(&mut self) {
        let Some(gate) = self.robots.as_mut() else {
            return;
        };
        if gate.allows(&self.start_url).await {
            return;
        }

        tracing::warn!("Start URL {} is disallowed by robots.txt", self.start_url);
        while self.scheduler.pop_undispatched().is_some() {}
        self.report
            .skipped_by_robots
            .push(self.start_url.to_string());
    }

    /// Spawns an executor for every Target the scheduler will release
    async fn dispatch_ready(&mut self, tasks: &mut JoinSet<TargetOutcome>) {
        while let Some(ScheduledTarget { target, permit }) = self.scheduler.next_target() {
            self.report.targets_dispatched += 1;

            let browser = match self.browsers.open() {
                Ok(browser) => browser,
                Err(e) => {
                    drop(permit);
                    let failure = TargetFailure {
                        target_id: target.id.0,
                        url: target.url.to_string(),
                        stage: TargetState::Queued,
                        attempts: 0,
                        message: format!("Could not open browser: {}", e),
                    };
                    self.fail(failure).await;
                    continue;
                }
            };

            tracing::debug!("Dispatching Target {} {}", target.id, target.url);
            let mut executor = FetchExecutor::new(
                browser,
                Arc::clone(&self.store),
                Arc::clone(&self.sink),
                Arc::clone(&self.settings),
            );
            self.in_flight.insert(target.id, target.clone());

            tasks.spawn(async move {
                let _permit = permit;
                executor.execute(target).await
            });
        }
    }

    async fn handle_outcome(&mut self, outcome: TargetOutcome) {
        self.in_flight.remove(&outcome.target.id);

        match outcome.result {
            Ok(summary) => self.report.record_success(&summary),
            Err(failure) => self.fail(failure).await,
        }

        for url in outcome.discovered {
            self.admit(url).await;
        }
    }

    /// Offers a discovered URL to the frontier
    async fn admit(&mut self, url: Url) {
        let canonical = match normalize_url(url.as_str()) {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::debug!("Dropping discovered URL {}: {}", url, e);
                return;
            }
        };

        if self.scheduler.screen(&canonical).is_some() {
            return;
        }

        if let Some(gate) = self.robots.as_mut() {
            if !gate.allows(&canonical).await {
                tracing::info!("Skipping {} (disallowed by robots.txt)", canonical);
                self.scheduler.mark_seen(&canonical);
                self.report.skipped_by_robots.push(canonical.to_string());
                return;
            }
        }

        let shown = canonical.to_string();
        if let Admission::Enqueued(id) = self.scheduler.enqueue_canonical(canonical) {
            tracing::debug!("Enqueued Target {} {}", id, shown);
        }
    }

    async fn fail(&mut self, failure: TargetFailure) {
        if let Err(e) = self.sink.record_failure(&failure).await {
            tracing::warn!("Could not record failure of {}: {}", failure.url, e);
        }
        self.report.record_failure(failure);
    }

    /// Reports Targets whose executor task panicked or was cancelled
    async fn fail_orphans(&mut self) {
        let mut orphans: Vec<Target> = self.in_flight.drain().map(|(_, t)| t).collect();
        orphans.sort_by_key(|t| t.id);

        for target in orphans {
            self.fail(TargetFailure {
                target_id: target.id.0,
                url: target.url.to_string(),
                stage: TargetState::Failed,
                attempts: 0,
                message: "executor task ended without an outcome".to_string(),
            })
            .await;
        }
    }

    fn finish(mut self) -> CrawlReport {
        self.report.page_cap_reached = self.scheduler.cap_reached();
        self.report.frontier_remaining = self.scheduler.frontier_size();
        self.report.finish();

        tracing::info!(
            "Finished. Targets processed: {}. Total rows found: {}",
            self.report.targets_processed(),
            self.report.rows_found
        );
        if self.report.page_cap_reached && self.report.frontier_remaining > 0 {
            tracing::info!(
                "Page cap reached; {} Target(s) left in the frontier",
                self.report.frontier_remaining
            );
        }
        if !self.report.failed.is_empty() {
            tracing::warn!("{} Target(s) failed", self.report.failed.len());
        }

        self.report
    }
}

/// Runs a complete crawl with the production browser and stores
///
/// This function:
/// 1. Validates the configuration
/// 2. Builds the shared HTTP client and browser factory
/// 3. Opens the artifact directory and the record database
/// 4. Runs the coordinator, with robots.txt checks if enabled
/// 5. Closes the run in the database and writes the markdown summary
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
///
/// # Example
///
/// ```no_run
/// use tablecrawl::config::load_config_with_hash;
/// use tablecrawl::crawler::run_crawl;
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let (config, hash) = load_config_with_hash(Path::new("tablecrawl.toml"))?;
///     let report = run_crawl(config, &hash).await?;
///     println!("{} rows", report.rows_found);
///     Ok(())
/// }
/// ```
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<CrawlReport, TablecrawlError> {
    validate(&config)?;

    let client = build_http_client(&config.user_agent)?;
    let browsers = Arc::new(HttpBrowserFactory::new(
        client.clone(),
        config.crawler.navigation_timeout(),
    ));
    let store = Arc::new(FsKeyValueStore::open(&config.output.artifact_dir)?);
    let sink = Arc::new(SqliteRecordSink::open(
        Path::new(&config.output.database_path),
        config_hash,
    )?);

    let mut coordinator = Coordinator::new(&config, browsers, store, sink.clone())?
        .with_run_id(sink.run_id());
    if config.crawler.respect_robots_txt {
        coordinator = coordinator.with_robots(RobotsGate::new(
            client,
            config.user_agent.crawler_name.clone(),
        ));
    }

    let report = coordinator.run().await;

    sink.finish_run(
        RunStatus::Completed,
        report.targets_completed as u64,
        report.failed.len() as u64,
        report.rows_found,
    )?;

    if let Some(path) = config.output.summary_path() {
        generate_markdown_summary(&report, Path::new(path))?;
        tracing::info!("Wrote summary to {}", path);
    }

    Ok(report)
}
