//! Tracking session orchestration.
//!
//! A session binds one booking to exactly one live location watch and one
//! overlay entity set. Every sample flows through the same synchronous
//! pipeline before the next one is delivered:
//!
//! ```text
//! device fix ──> SampleSmoother ──> SmoothedPosition
//!                                      │
//!                       ┌──────────────┴──────────────┐
//!                       ▼                             ▼
//!              OverlayController              ETA / calibration
//!           (pickup marker, circle)           (SessionEvent)
//! ```
//!
//! Dispatch-status events and user cancels reach the booking lifecycle
//! independently of the location stream.

use crate::booking::{Booking, BookingLifecycle, BookingStatus};
use crate::geo;
use crate::overlay::{OverlayController, OverlayRole};
use crate::smoothing::{SampleSmoother, SmoothedPosition};
use lifeline_env::{
    LocationError, LocationSample, LocationSource, LocationUpdate, MapRenderer, WatchId,
    WatchOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Floor for the accuracy circle radius in meters.
const MIN_CIRCLE_RADIUS_M: f64 = 10.0;

/// What one processed delivery meant for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A fix was folded into the window and the overlay was updated.
    PositionUpdated {
        smoothed: SmoothedPosition,
        accuracy_m: f64,
        calibrating: bool,
        /// Straight-line estimate from the smoothed position to dropoff
        eta_to_dropoff: Duration,
    },
    /// The watch delivered a sensor error. `fatal` means the session was
    /// stopped and needs an explicit restart.
    LocationFailure { error: LocationError, fatal: bool },
}

struct ActiveTracking<R: MapRenderer> {
    booking: Booking,
    lifecycle: BookingLifecycle,
    watch: WatchId,
    smoother: SampleSmoother,
    overlay: OverlayController<R>,
}

impl<R: MapRenderer> ActiveTracking<R> {
    fn apply_sample(&mut self, sample: LocationSample) -> SessionEvent {
        let smoothed = self.smoother.add_sample(sample);

        self.overlay
            .update_role(OverlayRole::Pickup, smoothed.point(), None);
        self.overlay.update_role(
            OverlayRole::AccuracyCircle,
            smoothed.point(),
            Some(sample.accuracy_m.max(MIN_CIRCLE_RADIUS_M)),
        );

        SessionEvent::PositionUpdated {
            smoothed,
            accuracy_m: sample.accuracy_m,
            calibrating: self.smoother.is_calibrating(),
            eta_to_dropoff: geo::estimate_travel_time(
                smoothed.point(),
                self.booking.addresses.dropoff.point,
            ),
        }
    }
}

/// Orchestrator binding a booking to a smoother, an overlay and a watch.
///
/// Generic over the location source and renderer implementations, so the
/// same session code runs against the production device feed or the
/// simulation harness. At most one session is live at a time: starting a
/// new one fully releases the previous one first.
pub struct TrackingSession<S: LocationSource, R: MapRenderer> {
    source: Arc<S>,
    renderer: Arc<R>,
    active: Option<ActiveTracking<R>>,
}

impl<S: LocationSource, R: MapRenderer> TrackingSession<S, R> {
    /// Creates an idle session over the given environment.
    pub fn new(source: Arc<S>, renderer: Arc<R>) -> Self {
        Self {
            source,
            renderer,
            active: None,
        }
    }

    /// Begins tracking `booking`.
    ///
    /// Any previous session is fully stopped first (watch released, overlay
    /// cleared, window dropped) before the new subscription opens, so two
    /// live watches can never write to the same overlay.
    pub async fn start(&mut self, booking: Booking) -> Result<(), LocationError> {
        self.stop().await;

        let watch = self.source.subscribe(WatchOptions::default()).await?;

        let mut overlay = OverlayController::new(Arc::clone(&self.renderer));
        let pickup = booking.addresses.pickup.point;
        let dropoff = booking.addresses.dropoff.point;
        let via = pickup.midpoint(dropoff);
        overlay.set_route(pickup, via, dropoff);
        overlay.update_role(OverlayRole::Ambulance, via, None);
        overlay.update_role(OverlayRole::Dropoff, dropoff, None);
        // Pickup marker and accuracy circle appear with the first fix.

        debug!(booking = %booking.id, %watch, "tracking session started");
        self.active = Some(ActiveTracking {
            lifecycle: BookingLifecycle::new(booking.status),
            booking,
            watch,
            smoother: SampleSmoother::new(),
            overlay,
        });
        Ok(())
    }

    /// Awaits and processes the next delivery from the live watch.
    ///
    /// Returns `None` when no session is active or the watch closed. All
    /// processing of the delivery happens before this returns, in arrival
    /// order.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let watch = self.active.as_ref()?.watch;
        let source = Arc::clone(&self.source);
        match source.recv(watch).await {
            Some(update) => Some(self.process_update(update).await),
            None => {
                self.stop().await;
                None
            }
        }
    }

    async fn process_update(&mut self, update: LocationUpdate) -> SessionEvent {
        match update {
            Ok(sample) => match self.active.as_mut() {
                Some(active) => active.apply_sample(sample),
                // Watch raced a stop; treat as a transient miss.
                None => SessionEvent::LocationFailure {
                    error: LocationError::Unavailable,
                    fatal: false,
                },
            },
            Err(error) => {
                let fatal = error.is_fatal();
                if fatal {
                    warn!(%error, "fatal watch error, stopping session");
                    self.stop().await;
                } else {
                    debug!(%error, "transient watch error, keeping watch alive");
                }
                SessionEvent::LocationFailure { error, fatal }
            }
        }
    }

    /// Stops the active session: releases the watch, clears the overlay and
    /// drops the smoothing window. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            self.source.unsubscribe(active.watch).await;
            active.overlay.remove_all();
            active.smoother.clear();
            debug!(booking = %active.booking.id, "tracking session stopped");
        }
    }

    /// Whether a session is currently live.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The tracked booking, while active.
    pub fn booking(&self) -> Option<&Booking> {
        self.active.as_ref().map(|a| &a.booking)
    }

    /// The booking lifecycle, while active.
    pub fn lifecycle(&self) -> Option<&BookingLifecycle> {
        self.active.as_ref().map(|a| &a.lifecycle)
    }

    /// Mutable lifecycle access for dispatch-status events and user
    /// cancels, which arrive independently of the location stream.
    pub fn lifecycle_mut(&mut self) -> Option<&mut BookingLifecycle> {
        self.active.as_mut().map(|a| &mut a.lifecycle)
    }

    /// Folds a server-reported booking record into the session.
    ///
    /// Reflects `status`, `driver` and `scheduling` locally; everything
    /// else belongs to the booking service. Does nothing once the local
    /// lifecycle is terminal (reconciliation stops with the booking).
    pub fn reconcile(&mut self, remote: &Booking) -> Option<BookingStatus> {
        let active = self.active.as_mut()?;
        if remote.id != active.booking.id {
            warn!(local = %active.booking.id, remote = %remote.id, "ignoring reconcile for foreign booking");
            return None;
        }
        if !active.lifecycle.should_reconcile() {
            return Some(active.lifecycle.status());
        }
        let status = active.lifecycle.apply_remote(remote.status);
        active.booking.status = status;
        active.booking.driver = remote.driver.clone();
        active.booking.scheduling = remote.scheduling.clone();
        Some(status)
    }
}
