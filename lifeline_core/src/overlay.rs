//! Map overlay ownership.
//!
//! All renderer handles for a tracking session live here, behind semantic
//! roles. The rest of the system asks for "move the pickup marker", never
//! for a renderer object, so handle lifetime has exactly one owner.
//!
//! Update policy: entities are created lazily on first need and mutated in
//! place afterwards. An existing entity is never deleted-and-recreated,
//! which would flicker on screen and churn renderer resources.

use lifeline_env::{GeoPoint, MapRenderer, MarkerStyle, RenderError, RenderHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Radius used for the accuracy circle before the first explicit resize.
const DEFAULT_CIRCLE_RADIUS_M: f64 = 10.0;

/// Semantic role of one overlay entity. Exactly one live entity per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayRole {
    Pickup,
    Ambulance,
    Dropoff,
    AccuracyCircle,
    RouteLine,
}

impl OverlayRole {
    /// Index of the route-line point this role anchors, if any.
    ///
    /// The route is the fixed 3-point polyline
    /// `[pickup, via (ambulance), dropoff]`.
    fn route_point_index(self) -> Option<usize> {
        match self {
            OverlayRole::Pickup => Some(0),
            OverlayRole::Ambulance | OverlayRole::RouteLine => Some(1),
            OverlayRole::Dropoff => Some(2),
            OverlayRole::AccuracyCircle => None,
        }
    }

    fn marker_style(self) -> Option<MarkerStyle> {
        match self {
            OverlayRole::Pickup => Some(MarkerStyle::Pickup),
            OverlayRole::Ambulance => Some(MarkerStyle::Ambulance),
            OverlayRole::Dropoff => Some(MarkerStyle::Dropoff),
            _ => None,
        }
    }
}

/// Registry of the session's overlay entities, keyed by role.
///
/// Holds no business state beyond the role→handle map and the local copy of
/// the route points needed to patch single polyline vertices.
pub struct OverlayController<R: MapRenderer> {
    renderer: Arc<R>,
    handles: HashMap<OverlayRole, RenderHandle>,
    route_points: Option<[GeoPoint; 3]>,
    circle_radius_m: f64,
}

impl<R: MapRenderer> OverlayController<R> {
    /// Creates an empty controller over the given renderer.
    pub fn new(renderer: Arc<R>) -> Self {
        Self {
            renderer,
            handles: HashMap::new(),
            route_points: None,
            circle_radius_m: DEFAULT_CIRCLE_RADIUS_M,
        }
    }

    /// Moves (or lazily creates) the entity for `role`.
    ///
    /// `radius_m` applies to the accuracy circle only. A marker update also
    /// patches the one route-line vertex the role anchors, leaving the
    /// other two untouched.
    ///
    /// Renderer failures degrade to a logged warning: a missing render
    /// target is retried naturally on the next update because creation is
    /// lazy.
    pub fn update_role(&mut self, role: OverlayRole, position: GeoPoint, radius_m: Option<f64>) {
        if let Err(err) = self.try_update(role, position, radius_m) {
            warn!(?role, %position, "overlay update skipped: {err}");
        }
    }

    /// Draws the fixed 3-point route line `[pickup, via, dropoff]`.
    pub fn set_route(&mut self, pickup: GeoPoint, via: GeoPoint, dropoff: GeoPoint) {
        self.route_points = Some([pickup, via, dropoff]);
        if let Err(err) = self.sync_route() {
            warn!("route line update skipped: {err}");
        }
    }

    /// Disposes every registered entity and clears the registry.
    ///
    /// Safe to call with nothing registered.
    pub fn remove_all(&mut self) {
        if !self.handles.is_empty() {
            let handles: Vec<RenderHandle> = self.handles.values().copied().collect();
            self.renderer.remove_all(&handles);
            self.handles.clear();
        }
        self.route_points = None;
        self.circle_radius_m = DEFAULT_CIRCLE_RADIUS_M;
    }

    /// Whether an entity is currently registered for `role`.
    pub fn has_role(&self, role: OverlayRole) -> bool {
        self.handles.contains_key(&role)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.handles.len()
    }

    fn try_update(
        &mut self,
        role: OverlayRole,
        position: GeoPoint,
        radius_m: Option<f64>,
    ) -> Result<(), RenderError> {
        match role {
            OverlayRole::Pickup | OverlayRole::Ambulance | OverlayRole::Dropoff => {
                self.update_marker(role, position)?;
                self.patch_route_point(role, position)
            }
            OverlayRole::AccuracyCircle => {
                if let Some(radius) = radius_m {
                    self.circle_radius_m = radius;
                }
                self.update_circle(position)
            }
            OverlayRole::RouteLine => self.patch_route_point(role, position),
        }
    }

    fn update_marker(&mut self, role: OverlayRole, position: GeoPoint) -> Result<(), RenderError> {
        if let Some(&handle) = self.handles.get(&role) {
            return self.renderer.move_marker(handle, position);
        }
        let style = role.marker_style().unwrap_or(MarkerStyle::Pickup);
        let handle = self.renderer.create_marker(position, style)?;
        self.handles.insert(role, handle);
        Ok(())
    }

    fn update_circle(&mut self, center: GeoPoint) -> Result<(), RenderError> {
        if let Some(&handle) = self.handles.get(&OverlayRole::AccuracyCircle) {
            return self.renderer.set_circle(handle, center, self.circle_radius_m);
        }
        let handle = self.renderer.create_circle(center, self.circle_radius_m)?;
        self.handles.insert(OverlayRole::AccuracyCircle, handle);
        Ok(())
    }

    fn patch_route_point(&mut self, role: OverlayRole, position: GeoPoint) -> Result<(), RenderError> {
        let Some(index) = role.route_point_index() else {
            return Ok(());
        };
        let Some(points) = self.route_points.as_mut() else {
            // No route drawn for this session; nothing to patch.
            return Ok(());
        };
        points[index] = position;
        self.sync_route()
    }

    fn sync_route(&mut self) -> Result<(), RenderError> {
        let Some(points) = self.route_points else {
            return Ok(());
        };
        if let Some(&handle) = self.handles.get(&OverlayRole::RouteLine) {
            return self.renderer.set_polyline_points(handle, &points);
        }
        let handle = self.renderer.create_polyline(&points)?;
        self.handles.insert(OverlayRole::RouteLine, handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Default)]
    struct RenderLog {
        next_handle: RenderHandle,
        creates: usize,
        moves: usize,
        live: Vec<RenderHandle>,
        polylines: HashMap<RenderHandle, Vec<GeoPoint>>,
    }

    /// Minimal renderer double: counts creates vs in-place mutations and
    /// keeps the live handle set.
    #[derive(Debug, Default)]
    struct FakeRenderer {
        ready: AtomicBool,
        log: Mutex<RenderLog>,
    }

    impl FakeRenderer {
        fn ready() -> Arc<Self> {
            let r = Arc::new(Self::default());
            r.ready.store(true, Ordering::SeqCst);
            r
        }

        fn check_ready(&self) -> Result<(), RenderError> {
            if self.ready.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(RenderError::RenderTargetMissing)
            }
        }

        fn create(&self) -> Result<RenderHandle, RenderError> {
            self.check_ready()?;
            let mut log = self.log.lock().unwrap();
            log.next_handle += 1;
            log.creates += 1;
            let handle = log.next_handle;
            log.live.push(handle);
            Ok(handle)
        }
    }

    impl MapRenderer for FakeRenderer {
        fn create_marker(&self, _position: GeoPoint, _style: MarkerStyle) -> Result<RenderHandle, RenderError> {
            self.create()
        }

        fn move_marker(&self, _handle: RenderHandle, _position: GeoPoint) -> Result<(), RenderError> {
            self.check_ready()?;
            self.log.lock().unwrap().moves += 1;
            Ok(())
        }

        fn create_circle(&self, _center: GeoPoint, _radius_m: f64) -> Result<RenderHandle, RenderError> {
            self.create()
        }

        fn set_circle(&self, _handle: RenderHandle, _center: GeoPoint, _radius_m: f64) -> Result<(), RenderError> {
            self.check_ready()?;
            self.log.lock().unwrap().moves += 1;
            Ok(())
        }

        fn create_polyline(&self, points: &[GeoPoint]) -> Result<RenderHandle, RenderError> {
            let handle = self.create()?;
            self.log.lock().unwrap().polylines.insert(handle, points.to_vec());
            Ok(handle)
        }

        fn set_polyline_points(&self, handle: RenderHandle, points: &[GeoPoint]) -> Result<(), RenderError> {
            self.check_ready()?;
            let mut log = self.log.lock().unwrap();
            log.moves += 1;
            log.polylines.insert(handle, points.to_vec());
            Ok(())
        }

        fn remove_all(&self, handles: &[RenderHandle]) {
            let mut log = self.log.lock().unwrap();
            log.live.retain(|h| !handles.contains(h));
        }
    }

    fn p(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng)
    }

    #[test]
    fn test_update_creates_then_moves_in_place() {
        let renderer = FakeRenderer::ready();
        let mut overlay = OverlayController::new(Arc::clone(&renderer));

        overlay.update_role(OverlayRole::Pickup, p(10.0, 20.0), None);
        overlay.update_role(OverlayRole::Pickup, p(10.001, 20.001), None);
        overlay.update_role(OverlayRole::Pickup, p(10.002, 20.002), None);

        let log = renderer.log.lock().unwrap();
        assert_eq!(log.creates, 1, "pickup marker must be created exactly once");
        assert_eq!(log.moves, 2);
    }

    #[test]
    fn test_one_handle_per_role() {
        let renderer = FakeRenderer::ready();
        let mut overlay = OverlayController::new(Arc::clone(&renderer));

        overlay.update_role(OverlayRole::Pickup, p(10.0, 20.0), None);
        overlay.update_role(OverlayRole::Dropoff, p(11.0, 21.0), None);
        overlay.update_role(OverlayRole::AccuracyCircle, p(10.0, 20.0), Some(25.0));
        overlay.update_role(OverlayRole::Pickup, p(10.1, 20.1), None);

        assert_eq!(overlay.entity_count(), 3);
    }

    #[test]
    fn test_pickup_update_patches_only_first_route_point() {
        let renderer = FakeRenderer::ready();
        let mut overlay = OverlayController::new(Arc::clone(&renderer));

        let via = p(10.5, 20.5);
        let dropoff = p(11.0, 21.0);
        overlay.set_route(p(10.0, 20.0), via, dropoff);
        overlay.update_role(OverlayRole::Pickup, p(10.2, 20.2), None);

        let log = renderer.log.lock().unwrap();
        let points = log.polylines.values().next().unwrap();
        assert_eq!(points[0], p(10.2, 20.2));
        assert_eq!(points[1], via);
        assert_eq!(points[2], dropoff);
    }

    #[test]
    fn test_remove_all_idempotent() {
        let renderer = FakeRenderer::ready();
        let mut overlay = OverlayController::new(Arc::clone(&renderer));

        // Nothing registered yet: safe no-op.
        overlay.remove_all();

        overlay.update_role(OverlayRole::Pickup, p(10.0, 20.0), None);
        overlay.set_route(p(10.0, 20.0), p(10.5, 20.5), p(11.0, 21.0));
        overlay.remove_all();
        overlay.remove_all();

        assert_eq!(overlay.entity_count(), 0);
        assert!(renderer.log.lock().unwrap().live.is_empty());
    }

    #[test]
    fn test_missing_render_target_retried_on_next_update() {
        let renderer = Arc::new(FakeRenderer::default());
        let mut overlay = OverlayController::new(Arc::clone(&renderer));

        // Renderer not ready: update degrades to a logged no-op.
        overlay.update_role(OverlayRole::Pickup, p(10.0, 20.0), None);
        assert!(!overlay.has_role(OverlayRole::Pickup));

        renderer.ready.store(true, Ordering::SeqCst);
        overlay.update_role(OverlayRole::Pickup, p(10.0, 20.0), None);
        assert!(overlay.has_role(OverlayRole::Pickup));
    }
}
