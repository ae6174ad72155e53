// src/services/cache.rs

//! Cache coordinator.
//!
//! Owns the published record and decides when the upstream page is fetched
//! again. Reads and timer ticks share one guard, so at most one fetch is in
//! flight no matter how many requests arrive while the cache is stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::models::StatusRecord;

use super::extractor::Extractor;
use super::source::{StatusSource, scrape};

/// What a refresh attempt ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache was young enough; nothing fetched
    Fresh,
    /// Another refresh was already running
    InFlight,
    /// A new record replaced the cached one
    Refreshed,
    /// The fetch failed and the previous record was kept
    Failed,
}

struct CacheState {
    current: Arc<StatusRecord>,
    last_fetch_at: Option<Instant>,
    /// Ticket of the refresh that produced `current`
    ticket: u64,
}

/// Single cached status record plus its refresh policy.
pub struct CacheCoordinator {
    source: Arc<dyn StatusSource>,
    extractor: Extractor,
    cache_duration: Duration,
    state: RwLock<CacheState>,
    refreshing: AtomicBool,
    next_ticket: AtomicU64,
}

impl CacheCoordinator {
    /// Create a coordinator holding a zero-valued record.
    pub fn new(source: Arc<dyn StatusSource>, extractor: Extractor, cache_duration: Duration) -> Self {
        Self {
            source,
            extractor,
            cache_duration,
            state: RwLock::new(CacheState {
                current: Arc::new(StatusRecord::empty(Utc::now())),
                last_fetch_at: None,
                ticket: 0,
            }),
            refreshing: AtomicBool::new(false),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Current record, refreshing it first when stale and nobody else is.
    ///
    /// Never waits on a refresh started by another caller.
    pub async fn read(&self) -> Arc<StatusRecord> {
        self.maybe_refresh().await;
        self.snapshot().await
    }

    /// Keep-warm timer entry point.
    pub async fn tick(&self) -> RefreshOutcome {
        self.maybe_refresh().await
    }

    /// Current record without any refresh.
    pub async fn snapshot(&self) -> Arc<StatusRecord> {
        Arc::clone(&self.state.read().await.current)
    }

    /// Whether a refresh is running right now.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Whether the cached record is older than the cache duration.
    pub async fn is_stale(&self) -> bool {
        match self.state.read().await.last_fetch_at {
            Some(at) => at.elapsed() > self.cache_duration,
            None => true,
        }
    }

    /// Refresh if stale and idle; otherwise do nothing.
    pub async fn maybe_refresh(&self) -> RefreshOutcome {
        if !self.is_stale().await {
            return RefreshOutcome::Fresh;
        }
        let Some(guard) = RefreshGuard::acquire(&self.refreshing) else {
            log::debug!("Refresh already in flight, serving cached status");
            return RefreshOutcome::InFlight;
        };
        // A refresh may have finished between the staleness check and the guard.
        if !self.is_stale().await {
            return RefreshOutcome::Fresh;
        }
        self.run_refresh(guard).await
    }

    /// Refresh regardless of age, unless one is already running.
    pub async fn refresh(&self) -> RefreshOutcome {
        match RefreshGuard::acquire(&self.refreshing) {
            Some(guard) => self.run_refresh(guard).await,
            None => RefreshOutcome::InFlight,
        }
    }

    async fn run_refresh(&self, _guard: RefreshGuard<'_>) -> RefreshOutcome {
        let ticket = self.next_ticket.fetch_add(1, Ordering::AcqRel);
        log::debug!("Refreshing status from {}", self.source.describe());

        match scrape(self.source.as_ref(), &self.extractor).await {
            Ok(record) => {
                let listeners = record.current_listeners;
                let mut state = self.state.write().await;
                if ticket > state.ticket {
                    state.current = Arc::new(record);
                    state.last_fetch_at = Some(Instant::now());
                    state.ticket = ticket;
                }
                log::debug!("Status refreshed ({listeners} listeners)");
                RefreshOutcome::Refreshed
            }
            Err(e) if e.is_upstream() => {
                log::warn!(
                    "Status refresh from {} failed, keeping cached data: {}",
                    self.source.describe(),
                    e
                );
                RefreshOutcome::Failed
            }
            Err(e) => {
                log::error!(
                    "Status refresh from {} hit an unexpected error, keeping cached data: {}",
                    self.source.describe(),
                    e
                );
                RefreshOutcome::Failed
            }
        }
    }
}

/// Holds the refresh flag; releasing it on drop covers errors and cancellation.
struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Spawn the keep-warm loop, ticking the coordinator every `period`.
///
/// The first tick fires one period after the call; the startup refresh is
/// expected to have run already.
pub fn spawn_refresh_loop(coordinator: Arc<CacheCoordinator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            coordinator.tick().await;
        }
    })
}
