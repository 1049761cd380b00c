//! Frontier: the session's seen-set plus its FIFO work queue
//!
//! This module handles:
//! - Deduplicating admissions by canonical URL
//! - Enforcing the depth bound at admission time
//! - Dropping (never blocking) admissions when the queue is full
//! - Handing entries to workers in admission order
//! - Detecting exhaustion (nothing pending, nothing in flight)

use crate::state::{Outcome, UrlState};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Where a frontier entry came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Configured seed or `--seed` argument
    Seed,
    /// Link found on a crawled page
    Discovered { parent: String },
    /// Submitted through the enqueue boundary
    Remote,
}

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Canonical URL
    pub url: String,

    /// Hops from the nearest seed
    pub depth: u32,

    pub origin: Origin,
}

/// Result of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Queued for a worker
    Accepted,
    /// Already pending, in flight, or done in this session
    Duplicate,
    /// Beyond the configured max depth
    DepthExceeded,
    /// Queue at capacity; the URL was dropped
    QueueFull,
    /// The frontier no longer accepts work
    Closed,
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Returns true for admissions that lost work (counted as drops)
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::QueueFull | Self::Closed)
    }
}

/// Counters kept by the frontier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrontierStats {
    pub admitted: u64,
    pub duplicates: u64,
    pub depth_exceeded: u64,
    pub dropped: u64,
    pub indexed: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// When `next` reports exhaustion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Batch sessions end once nothing is pending or in flight
    CloseWhenIdle,
    /// Service mode waits for more admissions until closed
    WaitForWork,
}

struct FrontierInner {
    states: HashMap<String, UrlState>,
    queue: VecDeque<FrontierEntry>,
    in_flight: usize,
    closed: bool,
    stats: FrontierStats,
}

enum Dequeue {
    Entry(FrontierEntry),
    Exhausted,
    Wait,
}

/// Shared frontier
///
/// All state sits behind one mutex; waiting workers are woken through a
/// [`Notify`] whenever an entry is admitted, a URL completes, or the
/// frontier closes.
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
    capacity: usize,
    max_depth: u32,
    policy: DrainPolicy,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of pending entries
    /// * `max_depth` - Deepest hop distance that may be admitted
    /// * `policy` - Whether an idle frontier ends the session
    pub fn new(capacity: usize, max_depth: u32, policy: DrainPolicy) -> Self {
        Self {
            inner: Mutex::new(FrontierInner {
                states: HashMap::new(),
                queue: VecDeque::new(),
                in_flight: 0,
                closed: false,
                stats: FrontierStats::default(),
            }),
            notify: Notify::new(),
            capacity,
            max_depth,
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Offers a canonical URL at the given depth
    ///
    /// Never blocks. A full queue drops the URL, counts the drop, and leaves
    /// the URL unseen so a later offer may still succeed.
    pub fn admit(&self, url: &str, depth: u32, origin: Origin) -> Admission {
        let admission = {
            let mut inner = self.lock();

            if inner.closed {
                inner.stats.dropped += 1;
                Admission::Closed
            } else if depth > self.max_depth {
                inner.stats.depth_exceeded += 1;
                Admission::DepthExceeded
            } else if inner.states.contains_key(url) {
                inner.stats.duplicates += 1;
                Admission::Duplicate
            } else if inner.queue.len() >= self.capacity {
                inner.stats.dropped += 1;
                Admission::QueueFull
            } else {
                inner.states.insert(url.to_string(), UrlState::Pending);
                inner.queue.push_back(FrontierEntry {
                    url: url.to_string(),
                    depth,
                    origin,
                });
                inner.stats.admitted += 1;
                Admission::Accepted
            }
        };

        match admission {
            Admission::Accepted => {
                tracing::trace!("Admitted {} at depth {}", url, depth);
                self.notify.notify_waiters();
            }
            Admission::QueueFull => {
                tracing::warn!("Frontier full ({} pending), dropped {}", self.capacity, url);
            }
            Admission::Closed => {
                tracing::warn!("Frontier closed, dropped {}", url);
            }
            Admission::Duplicate | Admission::DepthExceeded => {
                tracing::trace!("Not admitting {}: {:?}", url, admission);
            }
        }

        admission
    }

    fn try_next(&self) -> Dequeue {
        let mut inner = self.lock();

        if inner.closed {
            return Dequeue::Exhausted;
        }

        if let Some(entry) = inner.queue.pop_front() {
            inner.states.insert(entry.url.clone(), UrlState::InFlight);
            inner.in_flight += 1;
            return Dequeue::Entry(entry);
        }

        if self.policy == DrainPolicy::CloseWhenIdle && inner.in_flight == 0 {
            inner.closed = true;
            drop(inner);
            tracing::debug!("Frontier exhausted");
            self.notify.notify_waiters();
            return Dequeue::Exhausted;
        }

        Dequeue::Wait
    }

    /// Waits for the next entry
    ///
    /// Returns `None` once the frontier is closed or, under
    /// [`DrainPolicy::CloseWhenIdle`], exhausted.
    pub async fn next(&self) -> Option<FrontierEntry> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_next() {
                Dequeue::Entry(entry) => return Some(entry),
                Dequeue::Exhausted => return None,
                Dequeue::Wait => notified.await,
            }
        }
    }

    /// Marks an in-flight URL done
    pub fn complete(&self, url: &str, outcome: Outcome) {
        {
            let mut inner = self.lock();
            let done = UrlState::Done(outcome);

            match inner.states.get(url) {
                Some(current) if current.can_transition_to(&done) => {}
                other => {
                    tracing::warn!("Ignoring completion of {} in state {:?}", url, other);
                    return;
                }
            }

            inner.states.insert(url.to_string(), done);
            inner.in_flight = inner.in_flight.saturating_sub(1);
            match outcome {
                Outcome::Indexed => inner.stats.indexed += 1,
                Outcome::Failed(_) => inner.stats.failed += 1,
                Outcome::Skipped => inner.stats.skipped += 1,
            }
        }

        self.notify.notify_waiters();
    }

    /// Stops handing out work; pending entries stay queued but are never dequeued
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns the state of a URL, or `None` if it was never admitted
    pub fn state_of(&self, url: &str) -> Option<UrlState> {
        self.lock().states.get(url).copied()
    }

    /// Number of entries waiting in the queue
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of distinct URLs admitted this session
    pub fn seen(&self) -> usize {
        self.lock().states.len()
    }

    pub fn stats(&self) -> FrontierStats {
        self.lock().stats
    }
}
