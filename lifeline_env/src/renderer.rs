//! Map renderer abstraction.
//!
//! The tracking core never touches renderer-native objects. It requests
//! semantic operations through this trait and holds only opaque
//! [`RenderHandle`] tokens; what a marker or polyline actually *is* belongs
//! to the implementation behind the boundary.

use crate::error::RenderError;
use crate::types::GeoPoint;

/// Opaque token for a renderer-side entity.
///
/// Valid only for the renderer that issued it. Handles are created on first
/// need, mutated in place thereafter, and destroyed exactly once.
pub type RenderHandle = u64;

/// Visual style of a marker, keyed by its semantic role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerStyle {
    Pickup,
    Ambulance,
    Dropoff,
}

/// Abstraction over the map rendering engine.
///
/// # Implementations
///
/// - **Production**: wraps the embedded map widget
/// - **Simulation**: records operations for assertion (see `lifeline_sim`)
///
/// # Contract
///
/// Mutating an existing entity (`move_marker`, `set_circle`,
/// `set_polyline_points`) must update it in place. Implementations must not
/// delete-and-recreate, which would flicker and churn resources.
pub trait MapRenderer: Send + Sync + 'static {
    /// Creates a marker at `position`.
    fn create_marker(&self, position: GeoPoint, style: MarkerStyle) -> Result<RenderHandle, RenderError>;

    /// Moves an existing marker in place.
    fn move_marker(&self, handle: RenderHandle, position: GeoPoint) -> Result<(), RenderError>;

    /// Creates a circle centered at `center` with radius in meters.
    fn create_circle(&self, center: GeoPoint, radius_m: f64) -> Result<RenderHandle, RenderError>;

    /// Re-centers and resizes an existing circle in place.
    fn set_circle(&self, handle: RenderHandle, center: GeoPoint, radius_m: f64) -> Result<(), RenderError>;

    /// Creates a polyline through `points`, in order.
    fn create_polyline(&self, points: &[GeoPoint]) -> Result<RenderHandle, RenderError>;

    /// Replaces the points of an existing polyline in place.
    fn set_polyline_points(&self, handle: RenderHandle, points: &[GeoPoint]) -> Result<(), RenderError>;

    /// Disposes every listed entity. Unknown or already-removed handles are
    /// ignored, so bulk teardown is always safe to repeat.
    fn remove_all(&self, handles: &[RenderHandle]);
}
