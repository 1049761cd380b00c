//! Crawler coordinator - session orchestration
//!
//! This module contains the manager side of a crawling unit:
//! - Building the shared frontier, index builder, client and filter
//! - Accepting seeds and external enqueues
//! - Running the worker pool until exhaustion, timeout or shutdown
//! - Periodic and final index flushes
//! - Recording the session and producing its report

use crate::config::Config;
use crate::crawler::dispatch::LinkDispatch;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::{Admission, DrainPolicy, Frontier, FrontierStats, Origin};
use crate::crawler::worker::{spawn_pool, CrawlContext, WorkerStats};
use crate::index::IndexBuilder;
use crate::storage::{SessionStatus, SessionSummary, Storage};
use crate::url::{normalize_url, LinkFilter};
use crate::{RippleError, UrlError};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// How a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Crawl from seeds until the frontier is exhausted or the session times out
    Batch,
    /// Keep accepting enqueues until shut down
    Service,
}

/// Live counters exposed by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub session_id: i64,
    pub mode: SessionMode,
    pub pending: usize,
    pub in_flight: usize,
    pub seen: usize,
    pub closed: bool,
    pub unflushed_entries: usize,
    pub frontier: FrontierStats,
}

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: i64,
    pub status: SessionStatus,
    pub frontier: FrontierStats,
    pub workers: WorkerStats,
    pub index_entries_flushed: u64,
    pub elapsed: Duration,
}

impl SessionReport {
    /// Admissions and forwards that lost work
    pub fn links_dropped(&self) -> u64 {
        self.frontier.dropped + self.workers.forward_failures
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            pages_indexed: self.workers.pages_indexed,
            pages_failed: self.workers.pages_failed,
            links_dropped: self.links_dropped(),
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session {} ({})", self.session_id, self.status.to_db_string())?;
        writeln!(f, "  Elapsed:          {:.1?}", self.elapsed)?;
        writeln!(f, "  Pages indexed:    {}", self.workers.pages_indexed)?;
        writeln!(f, "  Pages failed:     {}", self.workers.pages_failed)?;
        writeln!(f, "  Pages skipped:    {}", self.workers.pages_skipped)?;
        writeln!(f, "  URLs admitted:    {}", self.frontier.admitted)?;
        writeln!(f, "  Duplicates:       {}", self.frontier.duplicates)?;
        writeln!(f, "  Beyond max depth: {}", self.frontier.depth_exceeded)?;
        writeln!(f, "  Dropped:          {}", self.links_dropped())?;
        if self.workers.links_forwarded + self.workers.forward_failures > 0 {
            writeln!(f, "  Links forwarded:  {}", self.workers.links_forwarded)?;
        }
        write!(f, "  Index entries:    {}", self.index_entries_flushed)
    }
}

/// Main crawler coordinator structure
///
/// Owns the frontier and the worker pool lifecycle for one session.
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    mode: SessionMode,
    session_id: i64,
    worker_count: usize,
    session_timeout: Duration,
    flush_interval: Duration,
    flushed: Arc<AtomicU64>,
}

impl Coordinator {
    /// Creates a coordinator and opens a new session in the store
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - The persistence sink
    /// * `config_hash` - Hash of the configuration file, stored on the session
    /// * `mode` - Batch or service session
    pub fn new(
        config: &Config,
        storage: Arc<dyn Storage>,
        config_hash: &str,
        mode: SessionMode,
    ) -> Result<Self, RippleError> {
        let crawler = &config.crawler;
        let policy = match mode {
            SessionMode::Batch => DrainPolicy::CloseWhenIdle,
            SessionMode::Service => DrainPolicy::WaitForWork,
        };

        let client = build_http_client(
            &config.user_agent,
            Duration::from_millis(crawler.request_timeout_ms),
        )?;
        let filter = LinkFilter::new(&config.filter)?;
        let dispatch = LinkDispatch::from_config(&config.dispatch, &config.user_agent)?;

        let session_id = storage.create_session(config_hash)?;
        tracing::info!(
            "Started session {} ({:?}, {} workers, max depth {}, max fan-out {})",
            session_id,
            mode,
            crawler.worker_count,
            crawler.max_depth,
            crawler.max_fan_out
        );

        let ctx = CrawlContext {
            frontier: Arc::new(Frontier::new(
                crawler.queue_capacity,
                crawler.max_depth,
                policy,
            )),
            index: Arc::new(IndexBuilder::new()),
            storage,
            client,
            filter: Arc::new(filter),
            dispatch,
            max_fan_out: crawler.max_fan_out,
            shared_seen: config.dispatch.shared_seen,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            mode,
            session_id,
            worker_count: crawler.worker_count,
            session_timeout: Duration::from_secs(crawler.session_timeout_secs),
            flush_interval: Duration::from_secs(crawler.flush_interval_secs),
            flushed: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn frontier(&self) -> &Frontier {
        &self.ctx.frontier
    }

    pub fn index(&self) -> &IndexBuilder {
        &self.ctx.index
    }

    pub fn storage(&self) -> &dyn Storage {
        self.ctx.storage.as_ref()
    }

    /// Offers an external URL to the frontier
    ///
    /// The URL is canonicalized (its fragment dropped) but not run through
    /// the link filter. Returns immediately; never waits on crawl progress.
    pub fn enqueue(&self, raw_url: &str, depth: u32, origin: Origin) -> Result<Admission, UrlError> {
        let url = normalize_url(raw_url)?;
        let admission = self.ctx.frontier.admit(&url, depth, origin);
        tracing::debug!("Enqueue {} at depth {}: {:?}", url, depth, admission);
        Ok(admission)
    }

    /// Enqueues seeds at depth 0, logging invalid ones
    ///
    /// Returns the number accepted.
    pub fn enqueue_seeds<S: AsRef<str>>(&self, seeds: &[S]) -> usize {
        let mut accepted = 0;
        for seed in seeds {
            match self.enqueue(seed.as_ref(), 0, Origin::Seed) {
                Ok(admission) if admission.is_accepted() => accepted += 1,
                Ok(admission) => {
                    tracing::warn!("Seed {} not admitted: {:?}", seed.as_ref(), admission)
                }
                Err(e) => tracing::warn!("Invalid seed {}: {}", seed.as_ref(), e),
            }
        }
        tracing::info!("Admitted {} of {} seeds", accepted, seeds.len());
        accepted
    }

    pub fn health(&self) -> HealthReport {
        let frontier = &self.ctx.frontier;
        HealthReport {
            session_id: self.session_id,
            mode: self.mode,
            pending: frontier.pending(),
            in_flight: frontier.in_flight(),
            seen: frontier.seen(),
            closed: frontier.is_closed(),
            unflushed_entries: self.ctx.index.len(),
            frontier: frontier.stats(),
        }
    }

    /// Runs a batch session from the given seeds
    pub async fn run<S: AsRef<str>>(&self, seeds: &[S]) -> Result<SessionReport, RippleError> {
        self.enqueue_seeds(seeds);
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs the worker pool until the frontier is exhausted, the session
    /// timeout elapses (batch only), or `shutdown` resolves
    ///
    /// Timeout and shutdown close the frontier: no new dequeues happen, and
    /// in-flight fetches finish under their own request timeout.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<SessionReport, RippleError>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let mut pool = spawn_pool(Arc::clone(&self.ctx), self.worker_count);
        let flusher = self.spawn_flusher();

        let session_timeout = match self.mode {
            SessionMode::Batch => Some(self.session_timeout),
            SessionMode::Service => None,
        };
        let deadline = async move {
            match session_timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut totals = WorkerStats::default();
        let mut timed_out = false;
        let mut stopping = false;

        loop {
            tokio::select! {
                joined = pool.join_next() => match joined {
                    Some(Ok(stats)) => totals.absorb(&stats),
                    Some(Err(e)) => tracing::error!("Worker task failed: {}", e),
                    None => break,
                },
                _ = &mut deadline, if !stopping => {
                    tracing::warn!(
                        "Session {} timed out after {:?}, finishing in-flight pages",
                        self.session_id,
                        self.session_timeout
                    );
                    timed_out = true;
                    stopping = true;
                    self.ctx.frontier.close();
                }
                _ = &mut shutdown, if !stopping => {
                    tracing::info!("Shutdown requested, finishing in-flight pages");
                    stopping = true;
                    self.ctx.frontier.close();
                }
            }
        }

        // A flush already running in the task is not interrupted by abort;
        // wait for it so its drained or restored counts are settled first.
        if let Some(flusher) = flusher {
            flusher.abort();
            let _ = flusher.await;
        }

        self.finish(totals, timed_out, started.elapsed())
    }

    /// Periodically flushes the index while the pool runs
    fn spawn_flusher(&self) -> Option<JoinHandle<()>> {
        if self.flush_interval.is_zero() {
            return None;
        }

        let index = Arc::clone(&self.ctx.index);
        let storage = Arc::clone(&self.ctx.storage);
        let flushed = Arc::clone(&self.flushed);
        let interval = self.flush_interval;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match index.flush_to(storage.as_ref()) {
                    Ok(count) => {
                        flushed.fetch_add(count as u64, Ordering::Relaxed);
                    }
                    Err(e) => tracing::warn!("Periodic index flush failed, will retry: {}", e),
                }
            }
        }))
    }

    /// Final flush and session bookkeeping
    fn finish(
        &self,
        workers: WorkerStats,
        timed_out: bool,
        elapsed: Duration,
    ) -> Result<SessionReport, RippleError> {
        let mut status = if timed_out {
            SessionStatus::TimedOut
        } else {
            SessionStatus::Completed
        };

        match self.ctx.index.flush_to(self.ctx.storage.as_ref()) {
            Ok(count) => {
                self.flushed.fetch_add(count as u64, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!(
                    "Final index flush failed, {} entries not persisted: {}",
                    self.ctx.index.len(),
                    e
                );
                status = SessionStatus::Failed;
            }
        }

        let report = SessionReport {
            session_id: self.session_id,
            status,
            frontier: self.ctx.frontier.stats(),
            workers,
            index_entries_flushed: self.flushed.load(Ordering::Relaxed),
            elapsed,
        };

        self.ctx
            .storage
            .complete_session(self.session_id, status, &report.summary())?;

        tracing::info!(
            "Session {} {}: {} indexed, {} failed, {} dropped in {:.1?}",
            self.session_id,
            status.to_db_string(),
            report.workers.pages_indexed,
            report.workers.pages_failed,
            report.links_dropped(),
            elapsed
        );

        Ok(report)
    }
}
