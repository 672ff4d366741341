//! Poll loop and its cancellation handle
//!
//! The loop fires immediately on start and then once per interval. Each
//! tick runs as its own task, so a slow fetch may overlap the next tick;
//! whichever tick applies last wins. Once stopped, ticks still in flight
//! complete but their results are discarded.

use super::{FeedSet, ViewState};
use crate::api::ConsoleApi;
use crate::observability::{ConsoleMetrics, StructuredLogger};
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock, RwLockReadGuard};
use tokio::time::{interval, Instant, MissedTickBehavior};

/// State shared between the loop, its tick tasks and the handle
struct Shared<F: FeedSet> {
    feeds: F,
    api: Arc<dyn ConsoleApi>,
    state: RwLock<ViewState<F::Model>>,
    stop_tx: watch::Sender<bool>,
    updates_tx: watch::Sender<u64>,
    ticks_started: AtomicU64,
    logger: StructuredLogger,
    metrics: ConsoleMetrics,
}

impl<F: FeedSet> Shared<F> {
    fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Fetch every feed, then apply the batch unless the view was torn down
    async fn run_tick(self: Arc<Self>) {
        self.ticks_started.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let batch = self.feeds.fetch(self.api.as_ref()).await;
        let elapsed = start.elapsed();

        let mut state = self.state.write().await;
        if self.is_stopped() {
            self.logger.log_tick_discarded();
            return;
        }

        let report = F::apply(&mut state.model, batch);
        for failure in report.failures() {
            self.logger
                .log_feed_failure(failure.feed, &failure.error.to_string());
            self.metrics.inc_feed_failure(self.feeds.view(), failure.feed);
        }
        state.error = report.banner();
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        self.metrics.observe_tick(self.feeds.view(), elapsed);
        self.logger
            .log_tick(generation, report.failures().len(), elapsed);
        self.updates_tx.send_replace(generation);
    }
}

/// Periodic poller for one view
pub struct FeedPoller<F: FeedSet> {
    feeds: F,
    api: Arc<dyn ConsoleApi>,
    interval: Duration,
}

impl<F: FeedSet> FeedPoller<F> {
    pub fn new(feeds: F, api: Arc<dyn ConsoleApi>, interval: Duration) -> Self {
        Self {
            feeds,
            api,
            interval,
        }
    }

    /// Spawn the poll loop; the first tick fires immediately
    pub fn start(self) -> PollHandle<F> {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (updates_tx, updates_rx) = watch::channel(0u64);
        let view = self.feeds.view();

        let shared = Arc::new(Shared {
            feeds: self.feeds,
            api: self.api,
            state: RwLock::new(ViewState::default()),
            stop_tx,
            updates_tx,
            ticks_started: AtomicU64::new(0),
            logger: StructuredLogger::new(view),
            metrics: ConsoleMetrics::new(),
        });

        shared.logger.log_poller_started(self.interval);

        let period = self.interval;
        let loop_shared = shared.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if loop_shared.is_stopped() {
                            break;
                        }
                        tokio::spawn(loop_shared.clone().run_tick());
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            loop_shared
                .logger
                .log_poller_stopped(loop_shared.ticks_started.load(Ordering::Relaxed));
        });

        PollHandle {
            shared,
            updates_rx,
        }
    }
}

/// Handle owning a running poller; dropping it stops the poller
pub struct PollHandle<F: FeedSet> {
    shared: Arc<Shared<F>>,
    updates_rx: watch::Receiver<u64>,
}

impl<F: FeedSet> PollHandle<F> {
    /// Cancel the timer and discard ticks still in flight. Idempotent.
    pub fn stop(&self) {
        self.shared.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Run one out-of-band tick with the same merge rules
    pub fn refresh_now(&self) {
        self.refresher().refresh();
    }

    /// Cloneable trigger for out-of-band ticks of this view
    pub fn refresher(&self) -> ViewRefresher {
        let shared = self.shared.clone();
        ViewRefresher {
            inner: Arc::new(move || {
                if shared.is_stopped() {
                    return;
                }
                tokio::spawn(shared.clone().run_tick());
            }),
        }
    }

    /// Receiver notified with the generation after each applied tick
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates_rx.clone()
    }

    /// Borrow the current view state
    pub async fn read(&self) -> RwLockReadGuard<'_, ViewState<F::Model>> {
        self.shared.state.read().await
    }

    /// Wait until at least one more tick has been applied after `generation`
    pub async fn wait_for_generation(&self, generation: u64) -> Result<u64> {
        let mut rx = self.updates_rx.clone();
        let current = *rx.wait_for(|g| *g > generation).await?;
        Ok(current)
    }
}

impl<F: FeedSet> PollHandle<F>
where
    F::Model: Clone,
{
    /// Clone of the current view state
    pub async fn snapshot(&self) -> ViewState<F::Model> {
        self.shared.state.read().await.clone()
    }
}

impl<F: FeedSet> Drop for PollHandle<F> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Type-erased trigger for one extra tick of a view
#[derive(Clone)]
pub struct ViewRefresher {
    inner: Arc<dyn Fn() + Send + Sync>,
}

impl ViewRefresher {
    pub fn from_fn(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    pub fn refresh(&self) {
        (self.inner)()
    }
}

impl std::fmt::Debug for ViewRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRefresher").finish_non_exhaustive()
    }
}

/// Builder for a view poller
pub struct FeedPollerBuilder<F: FeedSet> {
    feeds: Option<F>,
    api: Option<Arc<dyn ConsoleApi>>,
    interval: Duration,
}

impl<F: FeedSet> FeedPollerBuilder<F> {
    pub fn new() -> Self {
        Self {
            feeds: None,
            api: None,
            interval: Duration::from_secs(10),
        }
    }

    pub fn feeds(mut self, feeds: F) -> Self {
        self.feeds = Some(feeds);
        self
    }

    pub fn api(mut self, api: Arc<dyn ConsoleApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn build(self) -> Result<FeedPoller<F>> {
        let feeds = self
            .feeds
            .ok_or_else(|| anyhow::anyhow!("Feed set is required"))?;
        let api = self
            .api
            .ok_or_else(|| anyhow::anyhow!("API client is required"))?;
        if self.interval.is_zero() {
            anyhow::bail!("Poll interval must be non-zero");
        }

        Ok(FeedPoller::new(feeds, api, self.interval))
    }
}

impl<F: FeedSet> Default for FeedPollerBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}
