//! Expiry Sweeper
//!
//! Background task that periodically removes expired registrations from a
//! store. Cancellation is cooperative through a `CancellationToken`; stopping
//! the sweeper joins the task, after which the store keeps working normally.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::ports::{CatalogStorage, Clock};
use crate::error::{Error, Result};

/// Handle to a running sweeper task
#[derive(Debug)]
pub struct Sweeper {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn a sweeper on the current tokio runtime.
    ///
    /// The first sweep happens one `interval` after spawning. A zero interval,
    /// or one too large to schedule, is rejected before anything is spawned.
    pub fn spawn<S>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        token: CancellationToken,
    ) -> Result<Self>
    where
        S: CatalogStorage + 'static,
    {
        if interval.is_zero() {
            return Err(Error::Validation("sweep interval must be non-zero".into()));
        }
        let start = tokio::time::Instant::now()
            .checked_add(interval)
            .ok_or_else(|| {
                Error::Validation(format!("sweep interval {:?} is out of range", interval))
            })?;

        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            run(store, clock, start, interval, task_token).await;
        });
        Ok(Self { token, handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Expiry sweeper did not shut down cleanly");
        }
    }
}

async fn run<S>(
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    start: tokio::time::Instant,
    interval: Duration,
    token: CancellationToken,
) where
    S: CatalogStorage,
{
    info!(interval_ms = interval.as_millis() as u64, "Starting expiry sweeper");

    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let removed = store.clean_expired(clock.now());
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Expiry sweep finished");
                }
            }
        }
    }

    info!("Expiry sweeper stopped");
}
