//! Worker pool
//!
//! Each worker drains the shared frontier:
//! fetch -> extract -> persist page -> tokenize -> merge into index ->
//! filter links -> admit locally or forward to a peer.
//!
//! A failure on one URL marks it done-failed and the worker moves on.

use crate::crawler::dispatch::LinkDispatch;
use crate::crawler::fetcher::{fetch_page, FetchResult};
use crate::crawler::frontier::{Admission, Frontier, FrontierEntry, Origin};
use crate::crawler::parser::parse_html;
use crate::crawler::tokenizer::tokenize;
use crate::index::IndexBuilder;
use crate::state::{FailureKind, Outcome};
use crate::storage::{PageRecord, Storage};
use crate::url::LinkFilter;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Everything a worker shares with the rest of the pool
pub struct CrawlContext {
    pub frontier: Arc<Frontier>,
    pub index: Arc<IndexBuilder>,
    pub storage: Arc<dyn Storage>,
    pub client: Client,
    pub filter: Arc<LinkFilter>,
    pub dispatch: LinkDispatch,
    /// Cap on links admitted (or forwarded) from a single page
    pub max_fan_out: usize,
    /// Consult the store's visited set before fetching
    pub shared_seen: bool,
}

/// Per-worker counters, summed by the coordinator when the pool ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub pages_indexed: u64,
    pub pages_failed: u64,
    pub pages_skipped: u64,
    pub links_rejected: u64,
    pub links_admitted: u64,
    pub links_forwarded: u64,
    pub forward_failures: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Indexed => self.pages_indexed += 1,
            Outcome::Failed(_) => self.pages_failed += 1,
            Outcome::Skipped => self.pages_skipped += 1,
        }
    }

    /// Adds another worker's counters to these
    pub fn absorb(&mut self, other: &WorkerStats) {
        self.pages_indexed += other.pages_indexed;
        self.pages_failed += other.pages_failed;
        self.pages_skipped += other.pages_skipped;
        self.links_rejected += other.links_rejected;
        self.links_admitted += other.links_admitted;
        self.links_forwarded += other.links_forwarded;
        self.forward_failures += other.forward_failures;
    }
}

/// Spawns `workers` tasks draining the frontier
pub fn spawn_pool(ctx: Arc<CrawlContext>, workers: usize) -> JoinSet<WorkerStats> {
    let mut pool = JoinSet::new();
    for id in 0..workers {
        pool.spawn(run_worker(id, Arc::clone(&ctx)));
    }
    tracing::debug!("Spawned {} workers", workers);
    pool
}

/// One worker loop; returns when the frontier is closed or exhausted
pub async fn run_worker(id: usize, ctx: Arc<CrawlContext>) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Some(entry) = ctx.frontier.next().await {
        tracing::debug!(worker = id, depth = entry.depth, "Processing {}", entry.url);
        let outcome = process_entry(&ctx, &entry, &mut stats).await;
        stats.record(outcome);
        ctx.frontier.complete(&entry.url, outcome);
    }

    tracing::debug!(worker = id, "Worker finished: {:?}", stats);
    stats
}

/// Processes a single frontier entry end to end
pub async fn process_entry(
    ctx: &CrawlContext,
    entry: &FrontierEntry,
    stats: &mut WorkerStats,
) -> Outcome {
    let url = entry.url.as_str();

    if ctx.shared_seen {
        match ctx.storage.record_visited(url) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("{} already visited by another unit", url);
                return Outcome::Skipped;
            }
            Err(e) => tracing::error!("Failed to check visited set for {}: {}", url, e),
        }
    }

    let (final_url, body) = match fetch_page(&ctx.client, url).await {
        FetchResult::Success {
            final_url, body, ..
        } => (final_url, body),
        failure => {
            let kind = failure.failure_kind().unwrap_or(FailureKind::Network);
            tracing::warn!("Fetch failed for {}: {:?}", url, failure);
            return Outcome::Failed(kind);
        }
    };

    let parsed = match parse_html(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Failed to parse HTML for {}: {}", url, e);
            return Outcome::Failed(FailureKind::Parse);
        }
    };

    let page = PageRecord {
        url: url.to_string(),
        title: parsed.title.clone(),
        description: parsed.description.clone(),
        fetched_at: Utc::now().to_rfc3339(),
    };
    if let Err(e) = ctx.storage.upsert_page(&page) {
        tracing::error!("Failed to store page {}: {}", url, e);
        return Outcome::Failed(FailureKind::Persistence);
    }

    if !ctx.shared_seen {
        if let Err(e) = ctx.storage.record_visited(url) {
            tracing::error!("Failed to record visit of {}: {}", url, e);
        }
    }

    let tokens = tokenize(&parsed.text);
    ctx.index.merge_page(url, &tokens);
    tracing::trace!("Merged {} tokens from {}", tokens.len(), url);

    let base = Url::parse(&final_url).or_else(|_| Url::parse(url));
    match base {
        Ok(base) => dispatch_links(ctx, entry, &base, &parsed.links, stats).await,
        Err(e) => tracing::warn!("Cannot resolve links of {}: {}", url, e),
    }

    Outcome::Indexed
}

/// Filters a page's links and hands at most `max_fan_out` of them on
///
/// Links are considered in document order; rejected links and duplicates on
/// the same page do not count toward the cap.
async fn dispatch_links(
    ctx: &CrawlContext,
    entry: &FrontierEntry,
    base: &Url,
    links: &[String],
    stats: &mut WorkerStats,
) {
    let next_depth = entry.depth + 1;
    if next_depth > ctx.frontier.max_depth() {
        tracing::trace!("{} is at max depth, not following links", entry.url);
        return;
    }

    let mut seen_on_page: HashSet<String> = HashSet::new();
    let mut passed_on = 0usize;

    for href in links {
        if passed_on >= ctx.max_fan_out {
            tracing::debug!("Fan-out cap {} reached on {}", ctx.max_fan_out, entry.url);
            break;
        }

        let link = match ctx.filter.accept(href, base) {
            Ok(link) => link,
            Err(reason) => {
                tracing::trace!("Rejected link {}: {}", href, reason);
                stats.links_rejected += 1;
                continue;
            }
        };

        if !seen_on_page.insert(link.clone()) {
            continue;
        }

        match &ctx.dispatch {
            LinkDispatch::Local => {
                let admission = ctx.frontier.admit(
                    &link,
                    next_depth,
                    Origin::Discovered {
                        parent: entry.url.clone(),
                    },
                );
                if admission == Admission::Accepted {
                    stats.links_admitted += 1;
                    passed_on += 1;
                }
            }
            LinkDispatch::Remote(peer) => {
                passed_on += 1;
                match peer.forward(&link, next_depth).await {
                    Ok(()) => stats.links_forwarded += 1,
                    Err(e) => {
                        tracing::warn!("Failed to forward {}: {}", link, e);
                        stats.forward_failures += 1;
                    }
                }
            }
        }
    }
}
