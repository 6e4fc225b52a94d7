//! Scenario catalog.
//!
//! Each scenario is a named, seeded script of device deliveries plus a
//! driving policy in the runner. Scripts are pure data, so a scenario is
//! reproducible from `(id, seed)` alone.

use crate::provider::approach_script;
use clap::ValueEnum;
use lifeline_env::{GeoPoint, LocationError, LocationSample, LocationUpdate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, SystemTime};

/// Identifier of a runnable scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScenarioId {
    /// Clean approach: cold GPS settling into a calibrated fix
    SteadyApproach,
    /// Calibrated fix degrading again, with transient sensor errors
    NoisyFix,
    /// Permission revoked mid-stream; the session must stop
    PermissionDrop,
    /// New session started while one is live; resources must not leak
    SessionChurn,
}

impl ScenarioId {
    /// Every scenario, in catalog order.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SteadyApproach,
            ScenarioId::NoisyFix,
            ScenarioId::PermissionDrop,
            ScenarioId::SessionChurn,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SteadyApproach => "steady-approach",
            ScenarioId::NoisyFix => "noisy-fix",
            ScenarioId::PermissionDrop => "permission-drop",
            ScenarioId::SessionChurn => "session-churn",
        }
    }

    /// Builds the delivery script for this scenario.
    pub fn script(&self, seed: u64, start: GeoPoint, pickup: GeoPoint) -> Vec<LocationUpdate> {
        match self {
            ScenarioId::SteadyApproach => approach_script(seed, start, pickup, 16),
            ScenarioId::NoisyFix => noisy_fix_script(seed, start, pickup),
            ScenarioId::PermissionDrop => {
                let mut script = approach_script(seed, start, pickup, 5);
                script.push(Err(LocationError::PermissionDenied));
                // Anything after the denial must never be consumed.
                script.extend(approach_script(seed.wrapping_add(1), start, pickup, 3));
                script
            }
            ScenarioId::SessionChurn => approach_script(seed, start, pickup, 12),
        }
    }
}

/// Calibrates, then degrades: good fixes, a sensor dropout, poor-accuracy
/// fixes, a timeout, and a final recovery. Capture times are synthetic, as
/// in [`approach_script`], so the script is a pure function of the seed.
fn noisy_fix_script(seed: u64, start: GeoPoint, pickup: GeoPoint) -> Vec<LocationUpdate> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_mul(0x9e3779b97f4a7c15));
    let mut script = approach_script(seed, start, pickup, 10);
    let stamp = |step: u64| SystemTime::UNIX_EPOCH + Duration::from_secs(100 + step);

    script.push(Err(LocationError::Unavailable));
    for i in 0..4 {
        let accuracy_m = rng.gen_range(120.0..250.0);
        let jitter = accuracy_m / 111_000.0;
        let point = GeoPoint::new(
            pickup.lat + rng.gen_range(-jitter..jitter),
            pickup.lng + rng.gen_range(-jitter..jitter),
        );
        script.push(Ok(LocationSample {
            position: point,
            accuracy_m,
            captured_at: stamp(i),
        }));
    }
    script.push(Err(LocationError::Timeout(15000)));
    script.push(Ok(LocationSample {
        position: pickup,
        accuracy_m: 9.0,
        captured_at: stamp(4),
    }));
    script
}
