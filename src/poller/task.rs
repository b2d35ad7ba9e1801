//! Periodic poll of recent records

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use super::config::{PollerConfig, MIN_INTERVAL};
use crate::broadcast::Broadcaster;
use crate::event::TrafficUpdate;
use crate::store::TrafficStore;

/// Lifecycle state of the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// No timer running
    Stopped,
    /// Timer running, ticks being scheduled
    Running,
}

/// Result of a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Records were found and published to this many subscribers
    Published { records: usize, subscribers: usize },
    /// Store returned nothing; no publish happened
    Empty,
    /// Store read or serialization failed; logged and skipped
    Failed,
}

struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Timer-driven producer that republishes the most recent records
///
/// Every tick fetches up to `fetch_limit` records and publishes them as one
/// [`TrafficUpdate::Batch`]. Each tick runs in its own task, so a slow or
/// failing tick never holds up the next one.
pub struct Poller {
    store: Arc<dyn TrafficStore>,
    broadcaster: Arc<Broadcaster>,
    config: PollerConfig,
    running: Option<Running>,
}

impl Poller {
    /// Create a stopped poller
    pub fn new(
        store: Arc<dyn TrafficStore>,
        broadcaster: Arc<Broadcaster>,
        config: PollerConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            config,
            running: None,
        }
    }

    /// Get the poller configuration
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> PollerState {
        match self.running {
            Some(ref running) if !running.task.is_finished() => PollerState::Running,
            _ => PollerState::Stopped,
        }
    }

    /// Start the timer
    ///
    /// Returns `false` if the poller was already running. The first tick
    /// fires one interval after start.
    pub fn start(&mut self) -> bool {
        if self.state() == PollerState::Running {
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(
            Arc::clone(&self.store),
            Arc::clone(&self.broadcaster),
            self.config.clone(),
            shutdown_rx,
        ));

        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            fetch_limit = self.config.fetch_limit,
            "Poller started"
        );

        self.running = Some(Running { shutdown, task });
        true
    }

    /// Stop the timer
    ///
    /// No tick is scheduled after this is called. Ticks already in flight
    /// run to completion before this returns.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        if let Err(e) = running.task.await {
            tracing::error!(error = %e, "Poller task ended abnormally");
        }

        tracing::info!("Poller stopped");
    }

    /// Run one poll immediately, outside the timer
    pub async fn poll_once(&self) -> PollOutcome {
        poll_once(self.store.as_ref(), &self.broadcaster, self.config.fetch_limit).await
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

async fn run(
    store: Arc<dyn TrafficStore>,
    broadcaster: Arc<Broadcaster>,
    config: PollerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    // Fields are public, so the builder clamp can be bypassed
    let period = config.interval.max(MIN_INTERVAL);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let store = Arc::clone(&store);
                let broadcaster = Arc::clone(&broadcaster);
                let limit = config.fetch_limit;
                ticks.spawn(async move {
                    poll_once(store.as_ref(), &broadcaster, limit).await;
                });
            }
            Some(joined) = ticks.join_next(), if !ticks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Poll tick panicked");
                }
            }
        }
    }

    while let Some(joined) = ticks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Poll tick panicked");
        }
    }
}

/// Fetch the most recent records and publish them if there are any
pub async fn poll_once(
    store: &dyn TrafficStore,
    broadcaster: &Broadcaster,
    limit: usize,
) -> PollOutcome {
    let stats = broadcaster.stats();
    stats.record_poll_tick();

    let records = match store.fetch_recent(limit).await {
        Ok(records) => records,
        Err(e) => {
            stats.record_poll_failure();
            tracing::error!(error = %e, "Failed to fetch recent traffic data");
            return PollOutcome::Failed;
        }
    };

    if records.is_empty() {
        stats.record_empty_poll();
        tracing::trace!("No recent traffic data to publish");
        return PollOutcome::Empty;
    }

    let count = records.len();
    match broadcaster.publish(&TrafficUpdate::Batch(records)) {
        Ok(subscribers) => {
            tracing::debug!(records = count, subscribers, "Published recent traffic data");
            PollOutcome::Published {
                records: count,
                subscribers,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to publish recent traffic data");
            PollOutcome::Failed
        }
    }
}
