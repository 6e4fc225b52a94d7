//! Booking service boundary.
//!
//! The booking REST service is an external collaborator; this module holds
//! the trait the core calls and the single response-envelope normalization
//! adapter every caller goes through. The service's handlers historically
//! wrapped payloads in several shapes (`{success, data}`, `{data}`, bare),
//! and each call site used to re-derive the unwrapping on its own; here it
//! happens in exactly one place.
//!
//! Cancellation is never applied optimistically: the server enforces the
//! "only from pending" rule, so callers inspect the status on the returned
//! booking instead of assuming success.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::booking::{Addresses, Booking, BookingId, ScheduleKind, Urgency};

/// Errors from booking-service calls.
///
/// Surfaced to the user as a retryable message; local lifecycle state is
/// left unchanged until the service confirms a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The service could not be reached
    #[error("Booking service unreachable: {0}")]
    Unreachable(String),

    /// The session is not authorized for this call
    #[error("Unauthorized")]
    Unauthorized,

    /// The service answered with a payload we could not normalize
    #[error("Malformed service response: {0}")]
    Malformed(String),
}

/// Payload for creating a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub patient_name: String,
    pub contact: String,
    pub urgency: Urgency,
    pub addresses: Addresses,
    pub schedule: ScheduleKind,
}

/// Abstraction over the external booking REST service.
#[async_trait]
pub trait BookingService: Send + Sync + 'static {
    /// Creates a booking; the returned record carries the server-assigned
    /// id and initial `pending` status.
    async fn create_booking(&self, request: BookingRequest) -> Result<Booking, NetworkError>;

    /// Requests cancellation. The returned booking reflects the server's
    /// decision: status is `cancelled` only if the server accepted.
    async fn cancel_booking(&self, id: BookingId) -> Result<Booking, NetworkError>;

    /// Lists the current user's bookings, newest first.
    async fn list_user_bookings(&self) -> Result<Vec<Booking>, NetworkError>;
}

/// Response-envelope normalization.
///
/// Accepts the envelope shapes observed across the service's handlers and
/// yields the inner payload:
///
/// - `{"success": true, "data": <payload>}` (failure reports become errors)
/// - `{"data": <payload>}`
/// - `<payload>` (bare)
pub mod envelope {
    use super::*;

    /// Strips the envelope, if any, and returns the inner payload.
    pub fn normalize(value: Value) -> Result<Value, NetworkError> {
        let Value::Object(mut map) = value else {
            // Bare arrays (and any other bare payload) pass through.
            return Ok(value);
        };

        if let Some(success) = map.get("success") {
            if success == &Value::Bool(false) {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("request failed")
                    .to_string();
                return Err(NetworkError::Unreachable(message));
            }
            return map
                .remove("data")
                .ok_or_else(|| NetworkError::Malformed("success envelope without data".into()));
        }

        if map.contains_key("data") && map.len() <= 2 {
            // `{data}` or `{data, pagination}` wrapper.
            if let Some(data) = map.remove("data") {
                return Ok(data);
            }
        }

        Ok(Value::Object(map))
    }

    /// Normalizes and deserializes a single booking.
    pub fn parse_booking(value: Value) -> Result<Booking, NetworkError> {
        let inner = normalize(value)?;
        serde_json::from_value(inner).map_err(|e| NetworkError::Malformed(e.to_string()))
    }

    /// Normalizes and deserializes a booking list.
    pub fn parse_booking_list(value: Value) -> Result<Vec<Booking>, NetworkError> {
        let inner = normalize(value)?;
        serde_json::from_value(inner).map_err(|e| NetworkError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{Address, BookingStatus, Scheduling};
    use lifeline_env::GeoPoint;
    use serde_json::json;

    fn booking_json() -> Value {
        let booking = Booking {
            id: BookingId::new(),
            status: BookingStatus::Pending,
            urgency: Urgency::High,
            addresses: Addresses {
                pickup: Address {
                    label: "Home".into(),
                    point: GeoPoint::new(19.0760, 72.8777),
                },
                dropoff: Address {
                    label: "City Hospital".into(),
                    point: GeoPoint::new(19.1136, 72.8697),
                },
            },
            scheduling: Scheduling {
                kind: ScheduleKind::Immediate,
                estimated_distance_km: 4.2,
                estimated_arrival: None,
            },
            driver: None,
        };
        serde_json::to_value(booking).unwrap()
    }

    #[test]
    fn test_success_envelope_unwrapped() {
        let wrapped = json!({ "success": true, "data": booking_json() });
        let booking = envelope::parse_booking(wrapped).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn test_data_envelope_unwrapped() {
        let wrapped = json!({ "data": [booking_json(), booking_json()] });
        let bookings = envelope::parse_booking_list(wrapped).unwrap();
        assert_eq!(bookings.len(), 2);
    }

    #[test]
    fn test_bare_payload_passes_through() {
        let bookings = envelope::parse_booking_list(json!([booking_json()])).unwrap();
        assert_eq!(bookings.len(), 1);

        let booking = envelope::parse_booking(booking_json()).unwrap();
        assert_eq!(booking.urgency, Urgency::High);
    }

    #[test]
    fn test_failure_envelope_becomes_error() {
        let wrapped = json!({ "success": false, "message": "service offline" });
        let err = envelope::parse_booking(wrapped).unwrap_err();
        assert_eq!(err, NetworkError::Unreachable("service offline".into()));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = envelope::parse_booking(json!({ "success": true, "data": 42 })).unwrap_err();
        assert!(matches!(err, NetworkError::Malformed(_)));
    }
}
