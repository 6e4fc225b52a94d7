//! Lifeline scenario simulator CLI
//!
//! Runs deterministic tracking scenarios against the scripted environment.

use clap::Parser;
use lifeline_sim::{ScenarioId, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Lifeline deterministic scenario CLI
#[derive(Parser, Debug)]
#[command(name = "lifeline-sim")]
#[command(about = "Run deterministic tracking scenarios for Lifeline", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run; omit to run the whole catalog
    #[arg(short = 'S', long, value_enum)]
    scenario: Option<ScenarioId>,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Lifeline scenario simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios = match args.scenario {
        Some(id) => vec![id],
        None => ScenarioId::all(),
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos() as u64
    } else {
        args.seed
    };

    let mut results: Vec<ScenarioResult> = Vec::new();
    let mut failed: Vec<(ScenarioId, u64, String)> = Vec::new();

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed);

        for scenario in &scenarios {
            match runner.run(*scenario).await {
                Ok(result) => {
                    if !args.json {
                        info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                    }
                    results.push(result);
                }
                Err(e) => {
                    if !args.json {
                        error!("✗ {} (seed={}) FAILED: {}", scenario.name(), seed, e);
                    }
                    failed.push((*scenario, seed, e.to_string()));
                }
            }
        }
    }

    let total = results.len() + failed.len();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": results.len(),
            "failed": failed.len(),
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario,
                    "seed": r.seed,
                    "samples": r.samples,
                    "errors": r.errors,
                    "calibrated": r.calibrated,
                    "final_status": r.final_status.map(|s| s.to_string()),
                    "session_active": r.session_active,
                    "live_entities": r.live_entities,
                })
            }).collect::<Vec<_>>(),
            "failures": failed.iter().map(|(scenario, seed, reason)| {
                serde_json::json!({
                    "scenario": scenario.name(),
                    "seed": seed,
                    "reason": reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).expect("summary serializes")
        );
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed.is_empty() {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed.len(), total);
            for (scenario, seed, reason) in &failed {
                error!("  - {} seed={}: {}", scenario.name(), seed, reason);
            }
        }
    }

    if !failed.is_empty() {
        std::process::exit(1);
    }
}
