//! Scheduler for the crawl frontier
//!
//! This module handles:
//! - The FIFO frontier of Targets waiting for dispatch
//! - The seen-set that keeps each canonical URL to a single Target
//! - Link scope filtering at enqueue time
//! - Global concurrency limiting via a semaphore
//! - The page cap on dispatched Targets
//!
//! The scheduler is owned by the coordinator loop, which is the only place
//! that mutates it; executors report discovered URLs back instead of
//! enqueuing them directly.

use crate::config::CrawlerConfig;
use crate::url::{extract_domain, normalize_url, LinkScope};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Identifies a Target within one run, assigned in enqueue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A unit of crawl work: one canonical page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    pub url: Url,
}

impl Target {
    pub fn new(id: TargetId, url: Url) -> Self {
        Self { id, url }
    }
}

/// What happened to a URL offered to the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Enqueued(TargetId),
    Duplicate,
    OutOfScope,
    Invalid(String),
}

/// A Target handed out for dispatch, holding its concurrency permit
pub struct ScheduledTarget {
    pub target: Target,
    pub permit: OwnedSemaphorePermit,
}

/// Frontier, seen-set and dispatch limits for one run
pub struct Scheduler {
    /// Targets waiting for dispatch, oldest first
    frontier: VecDeque<Target>,

    /// Canonical URLs ever admitted (or deliberately skipped)
    seen: HashSet<String>,

    /// Next Target id
    next_id: u64,

    /// Host of the start URL, for link scope checks
    origin_host: String,

    scope: LinkScope,

    /// Dispatch cap; 0 means unbounded
    max_pages: u32,

    dispatched: u32,

    semaphore: Arc<Semaphore>,
}

impl Scheduler {
    /// Creates a scheduler seeded with the start URL
    ///
    /// # Arguments
    ///
    /// * `start` - The canonical start URL
    /// * `config` - The crawler configuration
    pub fn new(start: Url, config: &CrawlerConfig) -> Self {
        let origin_host = extract_domain(&start).unwrap_or_default();
        let permits = config.max_concurrency.max(1) as usize;

        let mut scheduler = Self {
            frontier: VecDeque::new(),
            seen: HashSet::new(),
            next_id: 1,
            origin_host,
            scope: config.link_scope,
            max_pages: config.max_pages,
            dispatched: 0,
            semaphore: Arc::new(Semaphore::new(permits)),
        };
        scheduler.enqueue_canonical(start);
        scheduler
    }

    /// Offers a URL to the frontier
    ///
    /// The URL is canonicalized, checked against the link scope and the
    /// seen-set, and appended only if all checks pass.
    pub fn enqueue(&mut self, raw_url: &str) -> Admission {
        let url = match normalize_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Not enqueuing {}: {}", raw_url, e);
                return Admission::Invalid(e.to_string());
            }
        };

        if let Some(rejection) = self.screen(&url) {
            return rejection;
        }
        self.enqueue_canonical(url)
    }

    /// Checks a canonical URL against the link scope and the seen-set
    ///
    /// Returns the rejection, or None if the URL would be enqueued.
    pub fn screen(&self, url: &Url) -> Option<Admission> {
        if !self.scope.allows(&self.origin_host, url) {
            tracing::debug!("Out of scope: {}", url);
            return Some(Admission::OutOfScope);
        }
        if self.seen.contains(url.as_str()) {
            tracing::trace!("Already seen: {}", url);
            return Some(Admission::Duplicate);
        }
        None
    }

    /// Appends a canonical URL that already passed [`Scheduler::screen`]
    ///
    /// Only the seen-set is consulted again, so a URL is still never
    /// enqueued twice.
    pub fn enqueue_canonical(&mut self, url: Url) -> Admission {
        if !self.seen.insert(url.to_string()) {
            return Admission::Duplicate;
        }

        let id = TargetId(self.next_id);
        self.next_id += 1;
        tracing::debug!("Enqueued {} {}", id, url);
        self.frontier.push_back(Target::new(id, url));
        Admission::Enqueued(id)
    }

    /// Marks a URL as seen without enqueuing it
    pub fn mark_seen(&mut self, url: &Url) {
        self.seen.insert(url.to_string());
    }

    /// Takes the next Target if the cap and the concurrency limit allow it
    ///
    /// Never waits: returns None when the frontier is empty, the page cap
    /// is reached or every permit is in use.
    pub fn next_target(&mut self) -> Option<ScheduledTarget> {
        if self.cap_reached() || self.frontier.is_empty() {
            return None;
        }

        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        let target = self.frontier.pop_front()?;
        self.dispatched += 1;

        Some(ScheduledTarget { target, permit })
    }

    /// Takes the next Target without dispatching it
    pub fn pop_undispatched(&mut self) -> Option<Target> {
        self.frontier.pop_front()
    }

    /// Returns true once `max_pages` Targets have been dispatched
    pub fn cap_reached(&self) -> bool {
        self.max_pages > 0 && self.dispatched >= self.max_pages
    }

    pub fn dispatched(&self) -> u32 {
        self.dispatched
    }

    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn origin_host(&self) -> &str {
        &self.origin_host
    }
}
