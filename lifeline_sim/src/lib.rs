//! Deterministic scenario harness for Lifeline tracking.
//!
//! Runs the real tracking core against scripted environments: a seeded
//! location source, a recording renderer and an in-memory booking service.
//! Every scenario is reproducible from its seed, so any reported failure
//! replays exactly.

pub mod booking;
pub mod provider;
pub mod renderer;
pub mod runner;
pub mod scenarios;

pub use booking::InMemoryBookingService;
pub use provider::ScriptedLocationSource;
pub use renderer::{RecordingRenderer, RenderOp};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
