//! Lifeline Tracking Core - Live Ambulance Tracking for the Patient Portal
//!
//! This library is the one subsystem of the portal with real engineering
//! depth, solving three problems the CRUD surfaces never face:
//! 1. **Noisy Sensors**: raw device fixes are stabilized by an
//!    accuracy-weighted sliding-window smoother
//! 2. **Overlay Churn**: map entities are owned by a single controller and
//!    mutated in place, never deleted-and-recreated
//! 3. **Lifecycle Drift**: a booking's status only ever moves forward
//!    through an ordered state machine with strict cancellation rules

pub mod booking;
pub mod drafts;
pub mod geo;
pub mod overlay;
pub mod service;
pub mod session;
pub mod smoothing;

// Re-export key types for convenience
pub use booking::{Booking, BookingLifecycle, BookingStatus, TransitionError};
pub use overlay::{OverlayController, OverlayRole};
pub use service::{BookingService, NetworkError};
pub use session::{SessionEvent, TrackingSession};
pub use smoothing::{SampleSmoother, SmoothedPosition};
