//! Scenario runner.
//!
//! Wires the real tracking core to the scripted environment and drives one
//! scenario to completion, logging progress and returning a summary the
//! CLI (and the tests) can assert on.

use crate::booking::InMemoryBookingService;
use crate::provider::ScriptedLocationSource;
use crate::renderer::RecordingRenderer;
use crate::scenarios::ScenarioId;
use lifeline_core::booking::{Address, Addresses, BookingId, ScheduleKind, Urgency};
use lifeline_core::service::{BookingRequest, BookingService, NetworkError};
use lifeline_core::{BookingStatus, SessionEvent, TrackingSession};
use lifeline_env::{GeoPoint, LocationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Failures while setting up or driving a scenario.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Summary of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub scenario: &'static str,
    pub seed: u64,
    /// Fixes folded into the smoother
    pub samples: usize,
    /// In-band sensor errors observed
    pub errors: usize,
    /// Whether the session left calibration at any point
    pub calibrated: bool,
    pub final_status: Option<BookingStatus>,
    pub session_active: bool,
    /// Renderer entities still live after the run
    pub live_entities: usize,
    /// Total renderer create operations (flicker check)
    pub creates: usize,
}

#[derive(Default)]
struct DriveStats {
    samples: usize,
    errors: usize,
    calibrated: bool,
}

type SimSession = TrackingSession<ScriptedLocationSource, RecordingRenderer>;

/// Drives scenarios against the scripted environment.
pub struct ScenarioRunner {
    seed: u64,
}

impl ScenarioRunner {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Runs `scenario` to completion.
    pub async fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, RunnerError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        // A patient a few hundred meters from home, headed to the hospital.
        let start = GeoPoint::new(19.0790, 72.8747);
        let pickup = GeoPoint::new(19.0760, 72.8777);
        let dropoff = GeoPoint::new(19.1136, 72.8697);

        let source = Arc::new(ScriptedLocationSource::from_script(
            scenario.script(self.seed, start, pickup),
        ));
        let renderer = Arc::new(RecordingRenderer::new());
        let service = InMemoryBookingService::new();

        let booking = service
            .create_booking(request(pickup, dropoff, Urgency::Critical))
            .await?;
        let booking_id = booking.id;

        let mut session = TrackingSession::new(Arc::clone(&source), Arc::clone(&renderer));
        session.start(booking).await?;

        let mut stats = DriveStats::default();
        match scenario {
            ScenarioId::SteadyApproach => {
                // Dispatcher progress arrives between fixes.
                let milestones = [
                    (4, BookingStatus::Confirmed),
                    (8, BookingStatus::Dispatched),
                    (12, BookingStatus::EnRoute),
                ];
                self.drive(&mut session, &source, &service, booking_id, &milestones, &mut stats)
                    .await?;
            }
            ScenarioId::NoisyFix => {
                let milestones = [(5, BookingStatus::Confirmed)];
                self.drive(&mut session, &source, &service, booking_id, &milestones, &mut stats)
                    .await?;
            }
            ScenarioId::PermissionDrop => {
                self.drive(&mut session, &source, &service, booking_id, &[], &mut stats)
                    .await?;
            }
            ScenarioId::SessionChurn => {
                // Consume a few fixes, then replace the session mid-stream.
                for _ in 0..4 {
                    if let Some(event) = session.next_event().await {
                        observe(event, &mut stats);
                    }
                }
                let replacement = service
                    .create_booking(request(pickup, dropoff, Urgency::High))
                    .await?;
                let replacement_id = replacement.id;
                session.start(replacement).await?;
                info!("  ↻ Replaced session with booking {replacement_id}");

                self.drive(&mut session, &source, &service, replacement_id, &[], &mut stats)
                    .await?;

                // User cancels while still pending; the lifecycle follows
                // the service's confirmation, never local optimism.
                let confirmed = service.cancel_booking(replacement_id).await?;
                session.reconcile(&confirmed);
            }
        }

        let result = ScenarioResult {
            scenario: scenario.name(),
            seed: self.seed,
            samples: stats.samples,
            errors: stats.errors,
            calibrated: stats.calibrated,
            final_status: session.lifecycle().map(|l| l.status()),
            session_active: session.is_active(),
            live_entities: renderer.live_count(),
            creates: renderer.create_count(),
        };
        info!(
            "✓ {} complete: {} fixes, {} errors, calibrated={}, status={:?}",
            result.scenario, result.samples, result.errors, result.calibrated, result.final_status
        );
        Ok(result)
    }

    /// Consumes the rest of the script through the session, applying
    /// dispatch milestones as fix counts are reached. Stops early on a
    /// fatal watch error. The script is drained by count rather than to
    /// exhaustion, so the session stays live for post-run assertions.
    async fn drive(
        &self,
        session: &mut SimSession,
        source: &ScriptedLocationSource,
        service: &InMemoryBookingService,
        booking_id: BookingId,
        milestones: &[(usize, BookingStatus)],
        stats: &mut DriveStats,
    ) -> Result<(), RunnerError> {
        while source.remaining() > 0 {
            let Some(event) = session.next_event().await else {
                break;
            };
            let fatal = matches!(event, SessionEvent::LocationFailure { fatal: true, .. });
            observe(event, stats);
            if fatal {
                break;
            }

            for (at, status) in milestones {
                if *at == stats.samples {
                    service.dispatch_progress(booking_id, *status);
                    let listed = service.list_user_bookings().await?;
                    if let Some(remote) = listed.iter().find(|b| b.id == booking_id) {
                        session.reconcile(remote);
                        info!("  → dispatch progress: {status}");
                    }
                }
            }
        }
        Ok(())
    }
}

fn observe(event: SessionEvent, stats: &mut DriveStats) {
    match event {
        SessionEvent::PositionUpdated {
            smoothed,
            accuracy_m,
            calibrating,
            eta_to_dropoff,
        } => {
            stats.samples += 1;
            stats.calibrated |= !calibrating;
            debug!(
                "  fix #{} | pos=({:.6}, {:.6}) acc={:.0}m eta={}s",
                stats.samples,
                smoothed.lat,
                smoothed.lng,
                accuracy_m,
                eta_to_dropoff.as_secs()
            );
        }
        SessionEvent::LocationFailure { error, fatal } => {
            stats.errors += 1;
            debug!("  watch error: {error} (fatal={fatal})");
        }
    }
}

fn request(pickup: GeoPoint, dropoff: GeoPoint, urgency: Urgency) -> BookingRequest {
    BookingRequest {
        patient_name: "Sim Patient".into(),
        contact: "+1-555-0100".into(),
        urgency,
        addresses: Addresses {
            pickup: Address {
                label: "Home".into(),
                point: pickup,
            },
            dropoff: Address {
                label: "City Hospital".into(),
                point: dropoff,
            },
        },
        schedule: ScheduleKind::Immediate,
    }
}
