//! In-memory booking service.
//!
//! Plays the part of the booking REST service: it answers with the same
//! wire envelopes the real handlers produce (`{success, data}`), and the
//! trait implementation normalizes them through the shared envelope
//! adapter, so the sim exercises the full client-side path.
//!
//! The server-side cancellation rule is enforced here too: cancel is
//! honored only while the booking is `pending`, and the caller learns the
//! outcome from the status on the returned record.

use async_trait::async_trait;
use lifeline_core::booking::{Booking, BookingId, ScheduleKind, Scheduling};
use lifeline_core::geo;
use lifeline_core::service::{envelope, BookingRequest, BookingService, NetworkError};
use lifeline_core::BookingStatus;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

/// Booking service double backed by a HashMap.
#[derive(Default)]
pub struct InMemoryBookingService {
    bookings: Mutex<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher-side progress: moves a stored booking to `status`,
    /// as the hospital back office would. Test/scenario helper.
    pub fn dispatch_progress(&self, id: BookingId, status: BookingStatus) {
        let mut bookings = self.bookings.lock().expect("booking store poisoned");
        if let Some(booking) = bookings.get_mut(&id) {
            booking.status = status;
        }
    }

    fn envelope_for(&self, booking: &Booking) -> serde_json::Value {
        json!({
            "success": true,
            "data": serde_json::to_value(booking).expect("booking serializes"),
        })
    }
}

#[async_trait]
impl BookingService for InMemoryBookingService {
    async fn create_booking(&self, request: BookingRequest) -> Result<Booking, NetworkError> {
        let distance_km = geo::haversine_km(
            request.addresses.pickup.point,
            request.addresses.dropoff.point,
        );
        let booking = Booking {
            id: BookingId::new(),
            status: BookingStatus::Pending,
            urgency: request.urgency,
            addresses: request.addresses,
            scheduling: Scheduling {
                kind: request.schedule,
                estimated_distance_km: distance_km,
                estimated_arrival: None,
            },
            driver: None,
        };

        let response = self.envelope_for(&booking);
        self.bookings
            .lock()
            .expect("booking store poisoned")
            .insert(booking.id, booking);
        envelope::parse_booking(response)
    }

    async fn cancel_booking(&self, id: BookingId) -> Result<Booking, NetworkError> {
        let response = {
            let mut bookings = self.bookings.lock().expect("booking store poisoned");
            let booking = bookings
                .get_mut(&id)
                .ok_or_else(|| NetworkError::Unreachable(format!("unknown booking {id}")))?;
            // Server rule: cancellation only from pending. Otherwise the
            // record is returned unchanged and the client sees the refusal
            // in the status.
            if booking.status == BookingStatus::Pending {
                booking.status = BookingStatus::Cancelled;
            }
            self.envelope_for(booking)
        };
        envelope::parse_booking(response)
    }

    async fn list_user_bookings(&self) -> Result<Vec<Booking>, NetworkError> {
        let response = {
            let bookings = self.bookings.lock().expect("booking store poisoned");
            let records: Vec<serde_json::Value> = bookings
                .values()
                .map(|b| serde_json::to_value(b).expect("booking serializes"))
                .collect();
            json!({ "success": true, "data": records })
        };
        envelope::parse_booking_list(response)
    }
}
