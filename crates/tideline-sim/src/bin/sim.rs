#![forbid(unsafe_code)]

use anyhow::{Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tideline_sim::campaign::{CampaignConfig, run_campaign};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tideline-sim: deterministic rescheduling simulation campaigns",
    long_about = None
)]
struct Cli {
    /// Number of seeds to run, starting at --first-seed.
    #[arg(long, default_value_t = 200)]
    seeds: u64,

    /// First seed of the range.
    #[arg(long, default_value_t = 0)]
    first_seed: u64,

    /// Rounds per seed.
    #[arg(long, default_value_t = 48)]
    rounds: u64,

    /// Draggable events seeded per run.
    #[arg(long, default_value_t = 6)]
    events: u8,

    /// Read-only task deadlines seeded per run.
    #[arg(long, default_value_t = 3)]
    tasks: u8,

    /// Percentage of responses failing.
    #[arg(long, default_value_t = 20)]
    fail_rate: u8,

    /// Percentage of requests hanging until the flush.
    #[arg(long, default_value_t = 5)]
    timeout_rate: u8,

    /// Maximum response delay in rounds.
    #[arg(long, default_value_t = 3)]
    max_delay: u8,

    /// Percentage chance of reordering ready responses each round.
    #[arg(long, default_value_t = 25)]
    reorder_rate: u8,

    /// Emit a JSON summary instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = CampaignConfig {
        seed_range: cli.first_seed..cli.first_seed + cli.seeds,
        rounds: cli.rounds,
        event_count: cli.events,
        task_count: cli.tasks,
        fail_rate_percent: cli.fail_rate,
        timeout_rate_percent: cli.timeout_rate,
        max_delay_rounds: cli.max_delay,
        reorder_rate_percent: cli.reorder_rate,
        ..CampaignConfig::default()
    };

    let report = run_campaign(&config)?;
    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "seeds": report.seeds_run,
                "drags": report.total_drags,
                "rollbacks": report.total_rollbacks,
                "superseded": report.total_superseded,
                "failures": report.failures.len(),
                "first_failing_seed": report.first_failing_seed(),
            })
        );
    } else {
        println!(
            "campaign complete: seeds={} drags={} rollbacks={} superseded={} failures={}",
            report.seeds_run,
            report.total_drags,
            report.total_rollbacks,
            report.total_superseded,
            report.failures.len()
        );
    }

    if let Some(seed) = report.first_failing_seed() {
        for failure in &report.failures {
            eprintln!("seed {} violations: {:?}", failure.seed, failure.violations);
        }
        bail!("campaign failed; replay with --seeds 1 --first-seed {seed}");
    }
    Ok(())
}
