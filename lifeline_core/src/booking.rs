//! Booking data model and status lifecycle.
//!
//! A booking's status only ever moves forward through the ordered list
//! `pending → confirmed → dispatched → en_route → arrived → completed`,
//! with an absorbing `cancelled` state reachable only from `pending`. The
//! booking service owns creation and mutation of the booking record; the
//! tracking core reads it and enforces the transition rules locally.

use lifeline_env::GeoPoint;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Unique identifier of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub Uuid);

impl BookingId {
    /// Creates a new random BookingId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Dispatch progress of a booking, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Dispatched,
    EnRoute,
    Arrived,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// The immediate successor in the ordered progression, if any.
    ///
    /// `Cancelled` is not part of the forward chain; it is reachable only
    /// through [`BookingLifecycle::cancel`].
    pub fn successor(self) -> Option<BookingStatus> {
        match self {
            BookingStatus::Pending => Some(BookingStatus::Confirmed),
            BookingStatus::Confirmed => Some(BookingStatus::Dispatched),
            BookingStatus::Dispatched => Some(BookingStatus::EnRoute),
            BookingStatus::EnRoute => Some(BookingStatus::Arrived),
            BookingStatus::Arrived => Some(BookingStatus::Completed),
            BookingStatus::Completed | BookingStatus::Cancelled => None,
        }
    }

    /// Whether the status accepts no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Dispatched => "dispatched",
            BookingStatus::EnRoute => "en_route",
            BookingStatus::Arrived => "arrived",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Emergency urgency reported at booking time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// A human-readable address anchored to a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub label: String,
    pub point: GeoPoint,
}

/// Pickup and dropoff endpoints of the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addresses {
    pub pickup: Address,
    pub dropoff: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Immediate,
    Scheduled,
}

/// Scheduling details as the booking service reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheduling {
    pub kind: ScheduleKind,
    pub estimated_distance_km: f64,
    pub estimated_arrival: Option<SystemTime>,
}

/// Driver assignment, present once the service dispatches a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub name: String,
    pub contact: String,
    pub vehicle_number: String,
}

/// One ambulance booking as the portal sees it.
///
/// Created and mutated by the external booking service; the tracking core
/// only reads and locally reflects `status`, `driver` and `scheduling`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub status: BookingStatus,
    pub urgency: Urgency,
    pub addresses: Addresses,
    pub scheduling: Scheduling,
    pub driver: Option<DriverInfo>,
}

/// One applied status change, kept for the tracking timeline display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub at: SystemTime,
}

/// Errors from rejected lifecycle operations.
///
/// These are internal invariant violations: logged and rejected locally,
/// never propagated as user-facing failures (the UI should simply not have
/// offered the action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The target is not the immediate successor of the current status
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    /// The booking already reached a final state
    #[error("Booking is already {0}")]
    AlreadyTerminal(BookingStatus),
}

/// State machine enforcing the ordered status progression.
#[derive(Debug, Clone)]
pub struct BookingLifecycle {
    status: BookingStatus,
    history: Vec<StatusChange>,
}

impl BookingLifecycle {
    /// Starts the lifecycle at the status the service reported.
    pub fn new(initial: BookingStatus) -> Self {
        Self {
            status: initial,
            history: vec![StatusChange {
                status: initial,
                at: SystemTime::now(),
            }],
        }
    }

    /// Current status.
    pub fn status(&self) -> BookingStatus {
        self.status
    }

    /// Applied status changes, oldest first.
    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// Advances to `to`.
    ///
    /// Accepted only if `to` is the immediate successor of the current
    /// status; re-applying the current status is an idempotent no-op.
    pub fn advance(&mut self, to: BookingStatus) -> Result<BookingStatus, TransitionError> {
        if to == self.status {
            return Ok(self.status);
        }
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal(self.status));
        }
        if self.status.successor() != Some(to) {
            return Err(TransitionError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.record(to);
        Ok(self.status)
    }

    /// Cancels the booking.
    ///
    /// Legal only while `pending`. Repeating the cancel once already
    /// `cancelled` silently returns the current state, mirroring the
    /// portal-wide rule that final-state entities tolerate repeated
    /// terminal actions.
    pub fn cancel(&mut self) -> Result<BookingStatus, TransitionError> {
        match self.status {
            BookingStatus::Cancelled => Ok(self.status),
            BookingStatus::Pending => {
                self.record(BookingStatus::Cancelled);
                Ok(self.status)
            }
            BookingStatus::Completed => Err(TransitionError::AlreadyTerminal(self.status)),
            from => Err(TransitionError::InvalidTransition {
                from,
                to: BookingStatus::Cancelled,
            }),
        }
    }

    /// Reconciles against a status reported by the booking service.
    ///
    /// The server may be several steps ahead (the client missed dispatch
    /// events); fast-forward along the successor chain. Backward reports
    /// are logged and ignored: a booking never moves backward.
    pub fn apply_remote(&mut self, reported: BookingStatus) -> BookingStatus {
        if reported == self.status {
            return self.status;
        }
        if reported == BookingStatus::Cancelled {
            if self.status == BookingStatus::Pending {
                self.record(BookingStatus::Cancelled);
            } else {
                warn!(local = %self.status, "ignoring remote cancel of a non-pending booking");
            }
            return self.status;
        }

        // Walk the forward chain from the local status.
        let mut cursor = self.status;
        while let Some(next) = cursor.successor() {
            cursor = next;
            if cursor == reported {
                self.record(reported);
                return self.status;
            }
        }

        warn!(local = %self.status, remote = %reported, "ignoring backward status report");
        self.status
    }

    /// Whether background reconciliation (status refresh, ETA polling)
    /// should keep running. `false` once the booking is terminal.
    pub fn should_reconcile(&self) -> bool {
        !self.status.is_terminal()
    }

    fn record(&mut self, status: BookingStatus) {
        self.status = status;
        self.history.push(StatusChange {
            status,
            at: SystemTime::now(),
        });
    }
}
