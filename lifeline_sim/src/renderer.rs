//! Recording renderer.
//!
//! Stands in for the map widget: keeps the live handle set and an ordered
//! operation log so scenarios can assert renderer-level invariants (one
//! create per role, in-place mutation, full teardown) after the fact. A
//! readiness flag simulates the window between page load and map init,
//! during which every call fails with `RenderTargetMissing`.

use lifeline_env::{GeoPoint, MapRenderer, MarkerStyle, RenderError, RenderHandle};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One recorded renderer operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    CreateMarker { handle: RenderHandle, style: MarkerStyle },
    MoveMarker { handle: RenderHandle, position: GeoPoint },
    CreateCircle { handle: RenderHandle, radius_m: f64 },
    SetCircle { handle: RenderHandle, radius_m: f64 },
    CreatePolyline { handle: RenderHandle, points: Vec<GeoPoint> },
    SetPolylinePoints { handle: RenderHandle, points: Vec<GeoPoint> },
    RemoveAll { handles: Vec<RenderHandle> },
}

impl RenderOp {
    /// Whether this op created a new renderer entity.
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            RenderOp::CreateMarker { .. } | RenderOp::CreateCircle { .. } | RenderOp::CreatePolyline { .. }
        )
    }
}

#[derive(Default)]
struct RecorderState {
    next_handle: RenderHandle,
    live: HashSet<RenderHandle>,
    ops: Vec<RenderOp>,
}

/// Renderer double recording every operation.
pub struct RecordingRenderer {
    ready: AtomicBool,
    state: Mutex<RecorderState>,
}

impl RecordingRenderer {
    /// Creates a ready renderer.
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            state: Mutex::new(RecorderState::default()),
        }
    }

    /// Creates a renderer whose target is not ready yet.
    pub fn not_ready() -> Self {
        let r = Self::new();
        r.ready.store(false, Ordering::SeqCst);
        r
    }

    /// Marks the render target ready (map init finished).
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Number of currently live entities.
    pub fn live_count(&self) -> usize {
        self.state.lock().expect("recorder poisoned").live.len()
    }

    /// Snapshot of the operation log.
    pub fn ops(&self) -> Vec<RenderOp> {
        self.state.lock().expect("recorder poisoned").ops.clone()
    }

    /// Total creations, for flicker assertions.
    pub fn create_count(&self) -> usize {
        self.state
            .lock()
            .expect("recorder poisoned")
            .ops
            .iter()
            .filter(|op| op.is_create())
            .count()
    }

    fn check_ready(&self) -> Result<(), RenderError> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RenderError::RenderTargetMissing)
        }
    }

    fn create_with(&self, make: impl FnOnce(RenderHandle) -> RenderOp) -> Result<RenderHandle, RenderError> {
        self.check_ready()?;
        let mut state = self.state.lock().expect("recorder poisoned");
        state.next_handle += 1;
        let handle = state.next_handle;
        state.live.insert(handle);
        let op = make(handle);
        state.ops.push(op);
        Ok(handle)
    }

    fn mutate(&self, handle: RenderHandle, op: RenderOp) -> Result<(), RenderError> {
        self.check_ready()?;
        let mut state = self.state.lock().expect("recorder poisoned");
        if !state.live.contains(&handle) {
            // A stale handle means the target it pointed at is gone.
            return Err(RenderError::RenderTargetMissing);
        }
        state.ops.push(op);
        Ok(())
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MapRenderer for RecordingRenderer {
    fn create_marker(&self, _position: GeoPoint, style: MarkerStyle) -> Result<RenderHandle, RenderError> {
        self.create_with(|handle| RenderOp::CreateMarker { handle, style })
    }

    fn move_marker(&self, handle: RenderHandle, position: GeoPoint) -> Result<(), RenderError> {
        self.mutate(handle, RenderOp::MoveMarker { handle, position })
    }

    fn create_circle(&self, _center: GeoPoint, radius_m: f64) -> Result<RenderHandle, RenderError> {
        self.create_with(|handle| RenderOp::CreateCircle { handle, radius_m })
    }

    fn set_circle(&self, handle: RenderHandle, _center: GeoPoint, radius_m: f64) -> Result<(), RenderError> {
        self.mutate(handle, RenderOp::SetCircle { handle, radius_m })
    }

    fn create_polyline(&self, points: &[GeoPoint]) -> Result<RenderHandle, RenderError> {
        self.create_with(|handle| RenderOp::CreatePolyline {
            handle,
            points: points.to_vec(),
        })
    }

    fn set_polyline_points(&self, handle: RenderHandle, points: &[GeoPoint]) -> Result<(), RenderError> {
        self.mutate(
            handle,
            RenderOp::SetPolylinePoints {
                handle,
                points: points.to_vec(),
            },
        )
    }

    fn remove_all(&self, handles: &[RenderHandle]) {
        let mut state = self.state.lock().expect("recorder poisoned");
        for handle in handles {
            state.live.remove(handle);
        }
        state.ops.push(RenderOp::RemoveAll {
            handles: handles.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_rejects_then_recovers() {
        let renderer = RecordingRenderer::not_ready();
        assert_eq!(
            renderer.create_marker(GeoPoint::new(0.0, 0.0), MarkerStyle::Pickup),
            Err(RenderError::RenderTargetMissing)
        );

        renderer.set_ready();
        assert!(renderer
            .create_marker(GeoPoint::new(0.0, 0.0), MarkerStyle::Pickup)
            .is_ok());
        assert_eq!(renderer.live_count(), 1);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let renderer = RecordingRenderer::new();
        let handle = renderer
            .create_marker(GeoPoint::new(0.0, 0.0), MarkerStyle::Ambulance)
            .unwrap();
        renderer.remove_all(&[handle]);

        assert_eq!(
            renderer.move_marker(handle, GeoPoint::new(1.0, 1.0)),
            Err(RenderError::RenderTargetMissing)
        );
    }

    #[test]
    fn test_op_log_orders_creates_and_mutations() {
        let renderer = RecordingRenderer::new();
        let marker = renderer
            .create_marker(GeoPoint::new(0.0, 0.0), MarkerStyle::Pickup)
            .unwrap();
        renderer.move_marker(marker, GeoPoint::new(1.0, 1.0)).unwrap();

        let ops = renderer.ops();
        assert_eq!(ops.len(), 2);
        assert!(ops[0].is_create());
        assert!(!ops[1].is_create());
        assert_eq!(renderer.create_count(), 1);
    }
}
