//! Scripted location source.
//!
//! Plays back a pre-built list of deliveries (fixes and in-band errors) in
//! order, one per `recv`. The noisy-fix builders derive all jitter from a
//! `ChaCha8Rng` seed, so a scenario replays bit-identically.

use async_trait::async_trait;
use lifeline_env::{
    GeoPoint, LocationError, LocationSample, LocationSource, LocationUpdate, WatchId, WatchOptions,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Rough meters-per-degree at city latitudes, for noise scaling.
const METERS_PER_DEGREE: f64 = 111_000.0;

struct ScriptState {
    cursor: usize,
    watches: HashSet<WatchId>,
}

/// Location source that replays a fixed script of deliveries.
///
/// The script is shared across watches: a session restart picks up the
/// playback where the previous watch left off, which is how a device feed
/// behaves when the consumer resubscribes mid-stream.
pub struct ScriptedLocationSource {
    script: Vec<LocationUpdate>,
    state: Mutex<ScriptState>,
}

impl ScriptedLocationSource {
    /// Creates a source that replays `script` in order.
    pub fn from_script(script: Vec<LocationUpdate>) -> Self {
        Self {
            script,
            state: Mutex::new(ScriptState {
                cursor: 0,
                watches: HashSet::new(),
            }),
        }
    }

    /// Builds a seeded approach script: `steps` fixes walking from `start`
    /// towards `end`, with jitter and accuracy drawn from the seed.
    ///
    /// Accuracy starts poor (cold GPS) and tightens as the fix settles,
    /// which exercises the calibration latch.
    pub fn noisy_approach(seed: u64, start: GeoPoint, end: GeoPoint, steps: usize) -> Self {
        Self::from_script(approach_script(seed, start, end, steps))
    }

    /// Number of deliveries not yet played back.
    pub fn remaining(&self) -> usize {
        let state = self.state.lock().expect("script state poisoned");
        self.script.len().saturating_sub(state.cursor)
    }
}

/// Generates the jittered fix sequence used by [`ScriptedLocationSource::noisy_approach`].
///
/// Capture times are synthetic (epoch + step index); real clock reads would
/// make two scripts from the same seed compare unequal.
pub fn approach_script(seed: u64, start: GeoPoint, end: GeoPoint, steps: usize) -> Vec<LocationUpdate> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut script = Vec::with_capacity(steps);

    for i in 0..steps {
        let t = i as f64 / steps.max(1) as f64;
        // Cold start around 80m, settling towards 5m.
        let accuracy_m: f64 = (80.0 * (1.0 - t) + 5.0) * rng.gen_range(0.6..1.4);
        // Sensor noise proportional to the reported error radius.
        let jitter = accuracy_m / METERS_PER_DEGREE;
        let lat = start.lat + (end.lat - start.lat) * t + rng.gen_range(-jitter..jitter);
        let lng = start.lng + (end.lng - start.lng) * t + rng.gen_range(-jitter..jitter);

        script.push(Ok(LocationSample {
            position: GeoPoint::new(lat, lng),
            accuracy_m,
            captured_at: SystemTime::UNIX_EPOCH + Duration::from_secs(i as u64),
        }));
    }
    script
}

#[async_trait]
impl LocationSource for ScriptedLocationSource {
    async fn subscribe(&self, _options: WatchOptions) -> Result<WatchId, LocationError> {
        let id = WatchId::new();
        self.state
            .lock()
            .expect("script state poisoned")
            .watches
            .insert(id);
        Ok(id)
    }

    async fn recv(&self, watch: WatchId) -> Option<LocationUpdate> {
        let mut state = self.state.lock().expect("script state poisoned");
        if !state.watches.contains(&watch) {
            return None;
        }
        let update = self.script.get(state.cursor)?.clone();
        state.cursor += 1;
        Some(update)
    }

    async fn unsubscribe(&self, watch: WatchId) {
        self.state
            .lock()
            .expect("script state poisoned")
            .watches
            .remove(&watch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeline_core::SampleSmoother;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_script_played_in_order() {
        let source = ScriptedLocationSource::from_script(vec![
            Ok(LocationSample::new(GeoPoint::new(1.0, 1.0), 10.0)),
            Err(LocationError::Unavailable),
            Ok(LocationSample::new(GeoPoint::new(2.0, 2.0), 10.0)),
        ]);
        let watch = source.subscribe(WatchOptions::default()).await.unwrap();

        assert!(source.recv(watch).await.unwrap().is_ok());
        assert_eq!(source.recv(watch).await, Some(Err(LocationError::Unavailable)));
        assert!(source.recv(watch).await.unwrap().is_ok());
        assert!(source.recv(watch).await.is_none(), "script exhausted");
    }

    #[tokio::test]
    async fn test_closed_watch_stops_delivering() {
        let source = ScriptedLocationSource::noisy_approach(
            7,
            GeoPoint::new(19.0760, 72.8777),
            GeoPoint::new(19.1136, 72.8697),
            5,
        );
        let watch = source.subscribe(WatchOptions::default()).await.unwrap();
        source.recv(watch).await.unwrap().unwrap();

        source.unsubscribe(watch).await;
        assert!(source.recv(watch).await.is_none());
        assert_eq!(source.remaining(), 4, "playback pauses for the next watch");
    }

    #[test]
    fn test_same_seed_same_script() {
        let a = approach_script(42, GeoPoint::new(10.0, 20.0), GeoPoint::new(10.1, 20.1), 16);
        let b = approach_script(42, GeoPoint::new(10.0, 20.0), GeoPoint::new(10.1, 20.1), 16);
        assert_eq!(a, b);

        let c = approach_script(43, GeoPoint::new(10.0, 20.0), GeoPoint::new(10.1, 20.1), 16);
        assert_ne!(a, c);
    }

    proptest! {
        /// The smoothed estimate is always a convex combination of the
        /// window contents: inside the bounding box of recent samples, with
        /// the window never exceeding its cap.
        #[test]
        fn prop_smoother_stays_inside_window_bounds(
            samples in prop::collection::vec((0.0f64..60.0, 0.0f64..60.0, 0.0f64..400.0), 1..40)
        ) {
            let mut smoother = SampleSmoother::new();
            let mut window: Vec<(f64, f64)> = Vec::new();

            for (lat, lng, acc) in samples {
                window.push((lat, lng));
                if window.len() > 8 {
                    window.remove(0);
                }
                let smoothed = smoother.add_sample(LocationSample::new(GeoPoint::new(lat, lng), acc));

                prop_assert!(smoother.window_len() <= 8);
                let min_lat = window.iter().map(|p| p.0).fold(f64::MAX, f64::min);
                let max_lat = window.iter().map(|p| p.0).fold(f64::MIN, f64::max);
                let min_lng = window.iter().map(|p| p.1).fold(f64::MAX, f64::min);
                let max_lng = window.iter().map(|p| p.1).fold(f64::MIN, f64::max);
                prop_assert!(smoothed.lat >= min_lat - 1e-9 && smoothed.lat <= max_lat + 1e-9);
                prop_assert!(smoothed.lng >= min_lng - 1e-9 && smoothed.lng <= max_lng + 1e-9);
            }
        }
    }
}
