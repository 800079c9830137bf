//! Periodic fetch-and-rebuild of the live tile index.
//!
//! One cycle runs immediately when the scheduler starts, then one per tick of
//! the refresh interval. Each ticked cycle waits a random jitter before it
//! fetches so that many instances do not hit the upstream at the same moment.
//!
//! At most one cycle is in [`RefreshState::Refreshing`] at a time. A tick that
//! fires while a cycle is in flight is dropped, not queued.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use citybikes_core::{TileIndex, TileIndexOptions, encode};
use tokio::runtime::Handle;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::{FetchError, LiveIndex, RetryError, RetryPolicy, SourceConfig, StationFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Shared Idle/Refreshing flag.
#[derive(Debug)]
struct StateCell {
    state: Mutex<RefreshState>,
}

impl StateCell {
    fn new() -> Self {
        StateCell {
            state: Mutex::new(RefreshState::Idle),
        }
    }

    fn current(&self) -> RefreshState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `Refreshing` if currently `Idle`.
    fn try_begin(&self) -> Option<RefreshGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            RefreshState::Refreshing => None,
            RefreshState::Idle => {
                *state = RefreshState::Refreshing;
                Some(RefreshGuard { cell: self })
            }
        }
    }
}

/// Returns the cell to `Idle` when the cycle ends, however it ends.
struct RefreshGuard<'a> {
    cell: &'a StateCell,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        *self.cell.state.lock().unwrap_or_else(PoisonError::into_inner) = RefreshState::Idle;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Another cycle was in flight; nothing was fetched.
    Skipped,
    /// The live index was replaced with stations from `upstream`.
    Refreshed { features: usize, upstream: String },
    /// Retries were exhausted; the live index is unchanged.
    Failed(RetryError<FetchError>),
}

pub struct RefreshScheduler<F> {
    fetcher: F,
    live: LiveIndex,
    state: StateCell,
    interval: Duration,
    max_jitter: Duration,
    retry: RetryPolicy,
    index_options: TileIndexOptions,
}

impl<F: StationFetcher> RefreshScheduler<F> {
    pub fn new(fetcher: F, live: LiveIndex, config: &SourceConfig) -> Self {
        RefreshScheduler {
            fetcher,
            live,
            state: StateCell::new(),
            interval: config.refresh_interval(),
            max_jitter: config.max_jitter(),
            retry: config.retry_policy(),
            index_options: config.index_options(),
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state.current()
    }

    /// Spawn the scheduling loop on `runtime`.
    ///
    /// Aborting the returned handle also aborts any cycle in flight.
    pub fn start(self, runtime: &Handle) -> JoinHandle<()> {
        runtime.spawn(Arc::new(self).run())
    }

    async fn run(self: Arc<Self>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            max_jitter_ms = self.max_jitter.as_millis() as u64,
            "Refresh scheduler started"
        );

        let mut cycles = JoinSet::new();
        let initial = Arc::clone(&self);
        cycles.spawn(async move {
            initial.run_cycle(Duration::ZERO).await;
        });

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            while cycles.try_join_next().is_some() {}

            let jitter = self.jitter();
            let this = Arc::clone(&self);
            cycles.spawn(async move {
                this.run_cycle(jitter).await;
            });
        }
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(0..max_ms))
    }

    /// Run one cycle unless another one is in flight.
    pub async fn run_cycle(&self, jitter: Duration) -> CycleOutcome {
        let Some(_guard) = self.state.try_begin() else {
            tracing::debug!("Refresh already in flight, dropping tick");
            return CycleOutcome::Skipped;
        };

        if !jitter.is_zero() {
            tokio::time::sleep(jitter).await;
        }

        match self.refresh().await {
            Ok(features) => CycleOutcome::Refreshed {
                features,
                upstream: self.fetcher.upstream(),
            },
            Err(error) => {
                tracing::error!(
                    attempts = error.attempts,
                    error = %error.last_error,
                    "Giving up on station refresh, keeping the previous index"
                );
                CycleOutcome::Failed(error)
            }
        }
    }

    async fn refresh(&self) -> Result<usize, RetryError<FetchError>> {
        let records = self
            .retry
            .retry(|_| self.fetcher.fetch_stations())
            .await?;

        let features = encode(&records);
        let count = features.len();
        let index = TileIndex::build(features, self.index_options);
        self.live.replace(index);

        tracing::info!(
            stations = records.len(),
            features = count,
            upstream = %self.fetcher.upstream(),
            "City bikes loaded"
        );
        Ok(count)
    }
}
