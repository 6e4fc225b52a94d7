//! Location source abstraction.
//!
//! A location source is a push-style device sensor: the watcher subscribes
//! once and then receives fixes (or sensor errors) in arrival order until it
//! unsubscribes. Errors travel in-band, exactly as a device callback would
//! deliver them, so a transient `Unavailable` does not tear the watch down.
//!
//! # Packet Flow
//!
//! ```text
//! Device                     Source                     Session
//!   |                           |                          |
//!   |-- fix / error ----------->|                          |
//!   |                           |-- [per-watch channel] -->|
//!   |                           |                          |-- recv() -> update
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::LocationError;
use crate::types::{LocationSample, WatchId};

/// One delivery from a watch: a fix, or a sensor error.
pub type LocationUpdate = Result<LocationSample, LocationError>;

/// Options passed to the device when opening a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Request the high-accuracy sensor mode (GPS rather than cell/wifi)
    pub high_accuracy: bool,

    /// How long the device may take before reporting `Timeout`
    pub timeout: Duration,

    /// Maximum age of a cached fix the device may serve. Zero forces a
    /// fresh fix on every delivery.
    pub max_staleness: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(15),
            max_staleness: Duration::ZERO,
        }
    }
}

/// Abstraction for the device location sensor.
///
/// # Implementations
///
/// - **Production**: [`DeviceLocationSource`] fed by a device transport
/// - **Simulation**: scripted sources with seeded noise (see `lifeline_sim`)
#[async_trait]
pub trait LocationSource: Send + Sync + 'static {
    /// Opens a watch with the given options.
    ///
    /// # Returns
    /// * `Ok(WatchId)` - The watch is live; updates flow via [`recv`](Self::recv)
    /// * `Err(LocationError)` - The device refused the subscription outright
    async fn subscribe(&self, options: WatchOptions) -> Result<WatchId, LocationError>;

    /// Receives the next update for a watch.
    ///
    /// # Returns
    /// * `Some(update)` - A fix or an in-band sensor error
    /// * `None` - The watch was unsubscribed or the source shut down
    ///
    /// # Ordering
    /// Updates are delivered strictly in arrival order, one at a time.
    async fn recv(&self, watch: WatchId) -> Option<LocationUpdate>;

    /// Closes a watch. Closing an unknown or already-closed watch is a
    /// safe no-op.
    async fn unsubscribe(&self, watch: WatchId);
}

struct WatchEntry {
    options: WatchOptions,
    tx: mpsc::UnboundedSender<LocationUpdate>,
    // Receiver behind its own async lock so recv() can await without
    // holding the registry lock.
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<LocationUpdate>>>,
}

#[derive(Default)]
struct FeedInner {
    watches: Mutex<HashMap<WatchId, WatchEntry>>,
}

/// Production location source backed by per-watch channels.
///
/// The device integration (platform geolocation bridge, vehicle telemetry
/// uplink, ...) obtains a [`DeviceFeed`] and pushes fixes into it; every
/// live watch sees every delivery.
#[derive(Default)]
pub struct DeviceLocationSource {
    inner: Arc<FeedInner>,
}

impl DeviceLocationSource {
    /// Creates a source with no live watches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the push handle for the device side.
    pub fn feed(&self) -> DeviceFeed {
        DeviceFeed {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl LocationSource for DeviceLocationSource {
    async fn subscribe(&self, options: WatchOptions) -> Result<WatchId, LocationError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = WatchId::new();
        let entry = WatchEntry {
            options,
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        };
        self.inner
            .watches
            .lock()
            .expect("watch registry poisoned")
            .insert(id, entry);
        Ok(id)
    }

    async fn recv(&self, watch: WatchId) -> Option<LocationUpdate> {
        let rx = {
            let watches = self.inner.watches.lock().expect("watch registry poisoned");
            Arc::clone(&watches.get(&watch)?.rx)
        };
        // The guard must drop before `rx`; a tail-expression temporary
        // would outlive the local it borrows.
        let mut guard = rx.lock().await;
        guard.recv().await
    }

    async fn unsubscribe(&self, watch: WatchId) {
        // Dropping the entry drops the sender, which wakes any pending recv
        // with None.
        self.inner
            .watches
            .lock()
            .expect("watch registry poisoned")
            .remove(&watch);
    }
}

/// Push handle for the device side of a [`DeviceLocationSource`].
#[derive(Clone)]
pub struct DeviceFeed {
    inner: Arc<FeedInner>,
}

impl DeviceFeed {
    /// Delivers a fix to every live watch.
    pub fn push(&self, sample: LocationSample) {
        self.broadcast(Ok(sample));
    }

    /// Delivers a sensor error to every live watch.
    pub fn push_error(&self, error: LocationError) {
        self.broadcast(Err(error));
    }

    /// The currently open watches and their requested options, for the
    /// device integration to honor (accuracy mode, timeout, staleness).
    pub fn subscriptions(&self) -> Vec<(WatchId, WatchOptions)> {
        self.inner
            .watches
            .lock()
            .expect("watch registry poisoned")
            .iter()
            .map(|(id, entry)| (*id, entry.options))
            .collect()
    }

    fn broadcast(&self, update: LocationUpdate) {
        let watches = self.inner.watches.lock().expect("watch registry poisoned");
        for entry in watches.values() {
            // A watch mid-unsubscribe may have a closed channel; ignore.
            let _ = entry.tx.send(update.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoPoint;

    #[tokio::test]
    async fn test_push_then_recv() {
        let source = DeviceLocationSource::new();
        let feed = source.feed();
        let watch = source.subscribe(WatchOptions::default()).await.unwrap();

        feed.push(LocationSample::new(GeoPoint::new(19.0760, 72.8777), 12.0));

        let update = source.recv(watch).await.unwrap();
        let sample = update.unwrap();
        assert_eq!(sample.position.lat, 19.0760);
        assert_eq!(sample.accuracy_m, 12.0);
    }

    #[tokio::test]
    async fn test_errors_delivered_in_band() {
        let source = DeviceLocationSource::new();
        let feed = source.feed();
        let watch = source.subscribe(WatchOptions::default()).await.unwrap();

        feed.push_error(LocationError::Unavailable);
        feed.push(LocationSample::new(GeoPoint::new(0.0, 0.0), 50.0));

        assert_eq!(source.recv(watch).await, Some(Err(LocationError::Unavailable)));
        assert!(source.recv(watch).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_watch() {
        let source = DeviceLocationSource::new();
        let watch = source.subscribe(WatchOptions::default()).await.unwrap();

        source.unsubscribe(watch).await;
        assert!(source.recv(watch).await.is_none());

        // Repeat unsubscribe is a no-op.
        source.unsubscribe(watch).await;
    }

    #[tokio::test]
    async fn test_feed_sees_requested_options() {
        let source = DeviceLocationSource::new();
        let feed = source.feed();
        let options = WatchOptions {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_staleness: Duration::ZERO,
        };
        let watch = source.subscribe(options).await.unwrap();

        let subs = feed.subscriptions();
        assert_eq!(subs, vec![(watch, options)]);
    }
}
