use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::common::Position;
use crate::error::LocationError;

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub high_accuracy: bool,
}

/// Continuous-positioning seam. Implementations push every fix or failure
/// into `updates` until the receiver is dropped; the platform decides the
/// resampling cadence, the tracker never drives retries.
#[async_trait]
pub trait GeoProvider: Send + Sync + 'static {
    async fn watch(
        &self,
        options: WatchOptions,
        updates: mpsc::Sender<Result<Position, LocationError>>,
    );
}

/// Caches the most recent successful fix in a single-slot watch channel.
/// Overwrite semantics: only the latest fix matters, there is no queue and no
/// history. Failed updates are logged and leave the cached value untouched.
pub struct LocationTracker {
    latest_rx: watch::Receiver<Option<Position>>,
    task: tokio::task::JoinHandle<()>,
}

impl LocationTracker {
    pub fn start(provider: Arc<dyn GeoProvider>, options: WatchOptions) -> Self {
        let (latest_tx, latest_rx) = watch::channel(None);
        let (update_tx, mut update_rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            let watcher = tokio::spawn(async move {
                provider.watch(options, update_tx).await;
            });
            while let Some(update) = update_rx.recv().await {
                match update {
                    Ok(position) => {
                        latest_tx.send_replace(Some(position));
                    }
                    Err(e) => {
                        // Stale-but-valid: the previous fix stays cached.
                        tracing::warn!("Error getting location: {}", e);
                    }
                }
            }
            watcher.abort();
        });

        Self { latest_rx, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Position>> {
        self.latest_rx.clone()
    }

    pub fn latest(&self) -> Option<Position> {
        *self.latest_rx.borrow()
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fixed-coordinate provider for the demo binary, re-emitting its configured
/// fix on a timer the way an IP-geolocation fallback would.
pub struct StaticProvider {
    position: Position,
    resample: Duration,
}

impl StaticProvider {
    pub fn new(position: Position, resample: Duration) -> Self {
        Self { position, resample }
    }
}

#[async_trait]
impl GeoProvider for StaticProvider {
    async fn watch(
        &self,
        _options: WatchOptions,
        updates: mpsc::Sender<Result<Position, LocationError>>,
    ) {
        let mut interval = tokio::time::interval(self.resample);
        loop {
            interval.tick().await;
            if updates.send(Ok(self.position)).await.is_err() {
                break;
            }
        }
    }
}
