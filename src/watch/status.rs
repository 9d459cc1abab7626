use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::types::RateLimit;

/// Reports the latest quota at most once per `window`.
///
/// Every update sent on `rates` counts as a trigger; any number of triggers
/// inside one window produce a single report of the newest value.
pub fn spawn_rate_reporter<F>(
    window: Duration,
    mut rates: watch::Receiver<Option<RateLimit>>,
    stop: CancellationToken,
    mut report: F,
) -> JoinHandle<()>
where
    F: FnMut(&RateLimit) + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    match rates.has_changed() {
                        Ok(true) => {
                            let latest = *rates.borrow_and_update();
                            if let Some(rate) = latest {
                                report(&rate);
                            }
                        }
                        Ok(false) => {}
                        Err(_) => break,
                    }
                }
            }
        }
    })
}
