//! Polling watcher for the public event feed.
//!
//! A ticker paced to the API budget feeds a bounded tick queue. Each tick
//! fetches one page of the feed, drops events already seen, and hands the new
//! release events to a single processing task so a slow submission never
//! delays the next fetch. The hand-off queue is bounded; while it is full,
//! new batches are dropped. Rate-limited fetches are skipped; any other fetch
//! failure stops the watcher.

mod observed;
mod status;

pub use observed::ObservedKeys;
pub use status::spawn_rate_reporter;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WatchSettings;
use crate::error::{Error, Result};
use crate::github::EventSource;
use crate::release::ReleaseProcessor;
use crate::types::{RateLimit, ReleaseEvent};

/// Processing errors buffered before further ones are dropped.
const ERROR_BACKLOG: usize = 64;

/// Release batches waiting for the processing task before further ones are dropped.
const BATCH_BACKLOG: usize = 16;

/// Counters for conditions the watcher only logs.
#[derive(Debug, Default)]
pub struct WatchStats {
    polls: AtomicU64,
    pages_all_new: AtomicU64,
    tick_backlogs: AtomicU64,
    dropped_batches: AtomicU64,
}

impl WatchStats {
    /// Successful page fetches.
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    /// Pages where every event was new after the first poll.
    pub fn pages_all_new(&self) -> u64 {
        self.pages_all_new.load(Ordering::Relaxed)
    }

    /// Ticks handled with more than one further tick already queued.
    pub fn tick_backlogs(&self) -> u64 {
        self.tick_backlogs.load(Ordering::Relaxed)
    }

    /// Release batches dropped because processing was behind.
    pub fn dropped_batches(&self) -> u64 {
        self.dropped_batches.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub poll_interval: Duration,
    pub per_page: u32,
    pub tick_backlog: usize,
    pub status_interval: Duration,
    pub observed_capacity: usize,
}

impl From<&WatchSettings> for WatchConfig {
    fn from(settings: &WatchSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            per_page: settings.per_page,
            tick_backlog: settings.tick_backlog,
            status_interval: settings.status_interval(),
            observed_capacity: settings.observed_capacity,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::from(&WatchSettings::default())
    }
}

pub struct Watcher {
    source: Arc<dyn EventSource>,
    processor: Arc<ReleaseProcessor>,
    config: WatchConfig,
    stats: Arc<WatchStats>,
}

impl Watcher {
    pub fn new(
        source: Arc<dyn EventSource>,
        processor: Arc<ReleaseProcessor>,
        config: WatchConfig,
    ) -> Self {
        Self {
            source,
            processor,
            config,
            stats: Arc::default(),
        }
    }

    pub fn stats(&self) -> Arc<WatchStats> {
        self.stats.clone()
    }

    /// Runs until `cancel` fires or a fetch fails for a reason other than
    /// rate limiting.
    ///
    /// Events are marked seen before they are processed, so an event whose
    /// processing fails is not retried.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!(interval = ?self.config.poll_interval, "watching public events");

        let initial = match self.source.rate_limits().await {
            Ok(rate) => {
                log_rate(&rate);
                Some(rate)
            }
            Err(Error::RateLimited) => {
                warn!("rate limited at startup");
                None
            }
            Err(e) => return Err(e),
        };

        let stop = cancel.child_token();
        let (rate_tx, rate_rx) = watch::channel(initial);
        let reporter =
            spawn_rate_reporter(self.config.status_interval, rate_rx, stop.clone(), log_rate);

        let (tick_tx, mut ticks) = mpsc::channel(self.config.tick_backlog);
        let ticker = spawn_ticker(self.config.poll_interval, tick_tx, stop.clone());

        let (err_tx, mut errors) = mpsc::channel(ERROR_BACKLOG);
        let (batch_tx, batch_rx) = mpsc::channel(BATCH_BACKLOG);
        let worker = spawn_processing(self.processor.clone(), batch_rx, err_tx, stop.clone());

        let mut observed = ObservedKeys::new(self.config.observed_capacity);

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("watcher shutting down");
                    break Ok(());
                }
                Some(err) = errors.recv() => {
                    error!(error = %err, "failed to process release event");
                }
                tick = ticks.recv() => {
                    if tick.is_none() {
                        break Ok(());
                    }
                    let backlog = ticks.len();
                    if backlog > 1 {
                        WatchStats::bump(&self.stats.tick_backlogs);
                        warn!(backlog, "polling is falling behind the tick schedule");
                    }
                    match self.poll(&mut observed, &rate_tx).await {
                        Ok(releases) if !releases.is_empty() => {
                            match batch_tx.try_send(releases) {
                                Ok(()) => {}
                                Err(TrySendError::Full(batch)) => {
                                    WatchStats::bump(&self.stats.dropped_batches);
                                    warn!(
                                        releases = batch.len(),
                                        "release backlog full, dropping batch"
                                    );
                                }
                                Err(TrySendError::Closed(_)) => {
                                    debug!("processing task stopped, dropping batch");
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "failed to fetch events");
                            break Err(e);
                        }
                    }
                }
            }
        };

        stop.cancel();
        drop(batch_tx);
        for task in [ticker, reporter, worker] {
            if let Err(e) = task.await {
                warn!(error = %e, "watcher task ended abnormally");
            }
        }

        result
    }

    /// Fetches one page, marks its unseen events seen and returns the release
    /// events among them. Payloads that fail to decode are logged and skipped.
    async fn poll(
        &self,
        observed: &mut ObservedKeys,
        rates: &watch::Sender<Option<RateLimit>>,
    ) -> Result<Vec<ReleaseEvent>> {
        let page = match self.source.list_events(1, self.config.per_page).await {
            Ok(page) => page,
            Err(Error::RateLimited) => {
                debug!("rate limited, skipping tick");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        WatchStats::bump(&self.stats.polls);
        if let Some(rate) = page.rate {
            rates.send_replace(Some(rate));
        }

        let had_history = !observed.is_empty();
        let total = page.events.len();
        let mut fresh = 0;
        let mut releases = Vec::new();
        for event in page.events {
            if !observed.insert(event.id.clone()) {
                continue;
            }
            fresh += 1;
            match event.release_event() {
                Ok(Some(release)) => releases.push(release),
                Ok(None) => {}
                Err(e) => error!(event = %event.id, error = %e, "undecodable release event"),
            }
        }

        if had_history && total > 0 && fresh == total {
            WatchStats::bump(&self.stats.pages_all_new);
            warn!(
                per_page = self.config.per_page,
                "not fast enough: every event on the page is new, some were likely missed"
            );
        }

        Ok(releases)
    }
}

fn log_rate(rate: &RateLimit) {
    info!(
        limit = rate.limit,
        remaining = rate.remaining,
        reset = %rate.reset,
        "api calls remaining"
    );
}

fn spawn_ticker(
    period: Duration,
    ticks: mpsc::Sender<Instant>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let instant = tokio::select! {
                _ = stop.cancelled() => break,
                instant = interval.tick() => instant,
            };
            // Waits for room when the queue is full.
            tokio::select! {
                _ = stop.cancelled() => break,
                sent = ticks.send(instant) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_processing(
    processor: Arc<ReleaseProcessor>,
    mut batches: mpsc::Receiver<Vec<ReleaseEvent>>,
    errors: mpsc::Sender<Error>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let batch = tokio::select! {
                _ = stop.cancelled() => break,
                batch = batches.recv() => match batch {
                    Some(batch) => batch,
                    None => break,
                },
            };
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = process_batch(&processor, batch, &errors) => {}
            }
        }
    })
}

/// Processes events in feed order. A failed event is reported and the rest
/// of the batch continues.
async fn process_batch(
    processor: &ReleaseProcessor,
    batch: Vec<ReleaseEvent>,
    errors: &mpsc::Sender<Error>,
) {
    for release in batch {
        if let Err(e) = processor.process(&release).await {
            if let Err(unsent) = errors.try_send(e) {
                warn!(
                    repo = release.repo_name().unwrap_or_default(),
                    tag = release.tag_name().unwrap_or_default(),
                    error = %unsent.into_inner(),
                    "error backlog full, dropping processing error"
                );
            }
        }
    }
}
