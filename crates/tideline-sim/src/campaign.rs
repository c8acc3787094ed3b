//! Campaign runner: many seeds, one verdict.
//!
//! Executes a seed range with shared parameters, collecting pass/fail per
//! seed and identifying the first failing seed for replay.

use std::ops::Range;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::faults::FaultPlan;
use crate::oracle::InvariantViolation;
use crate::{SimulationConfig, Simulator};

/// Campaign-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Range of seeds to execute, e.g. `0..200`.
    pub seed_range: Range<u64>,
    /// Rounds per seed.
    pub rounds: u64,
    /// Draggable events seeded per run.
    pub event_count: u8,
    /// Read-only tasks seeded per run.
    pub task_count: u8,
    /// Percentage chance per round of starting a drag.
    pub drag_rate_percent: u8,
    /// Percentage of drags generated with inverted intervals.
    pub invalid_rate_percent: u8,
    /// Percentage of responses failing.
    pub fail_rate_percent: u8,
    /// Percentage of requests hanging until the flush.
    pub timeout_rate_percent: u8,
    /// Maximum response delay in rounds.
    pub max_delay_rounds: u8,
    /// Percentage chance of shuffling ready responses each round.
    pub reorder_rate_percent: u8,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            seed_range: 0..200,
            rounds: 48,
            event_count: 6,
            task_count: 3,
            drag_rate_percent: 60,
            invalid_rate_percent: 10,
            fail_rate_percent: 20,
            timeout_rate_percent: 5,
            max_delay_rounds: 3,
            reorder_rate_percent: 25,
        }
    }
}

impl CampaignConfig {
    /// Build a [`SimulationConfig`] for one seed.
    #[must_use]
    pub const fn sim_config_for_seed(&self, seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed,
            rounds: self.rounds,
            event_count: self.event_count,
            task_count: self.task_count,
            drag_rate_percent: self.drag_rate_percent,
            invalid_rate_percent: self.invalid_rate_percent,
            fault: FaultPlan {
                fail_rate_percent: self.fail_rate_percent,
                timeout_rate_percent: self.timeout_rate_percent,
                max_delay_rounds: self.max_delay_rounds,
                reorder_rate_percent: self.reorder_rate_percent,
            },
        }
    }

    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.rounds == 0 {
            bail!("rounds must be > 0");
        }
        if self.event_count == 0 {
            bail!("event_count must be > 0");
        }
        Ok(())
    }
}

/// One seed's failure diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFailure {
    pub seed: u64,
    pub violations: Vec<InvariantViolation>,
}

/// Aggregated campaign outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CampaignReport {
    pub seeds_run: u64,
    pub total_drags: u64,
    pub total_rollbacks: u64,
    pub total_superseded: u64,
    pub failures: Vec<SeedFailure>,
}

impl CampaignReport {
    /// Whether every seed passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// First failing seed, for replay.
    #[must_use]
    pub fn first_failing_seed(&self) -> Option<u64> {
        self.failures.first().map(|failure| failure.seed)
    }
}

/// Run every seed in the range.
///
/// # Errors
///
/// Returns an error for an invalid configuration; individual seed
/// failures land in the report, not in `Err`.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport::default();
    for seed in config.seed_range.clone() {
        let mut simulator = Simulator::new(config.sim_config_for_seed(seed))?;
        let result = simulator.run()?;

        report.seeds_run += 1;
        report.total_drags += result.counters.drags_started;
        report.total_rollbacks += result.counters.rolled_back;
        report.total_superseded += result.counters.superseded;
        if !result.passed() {
            report.failures.push(SeedFailure {
                seed,
                violations: result.oracle.violations,
            });
        }
    }

    info!(
        seeds = report.seeds_run,
        drags = report.total_drags,
        failures = report.failures.len(),
        "campaign finished"
    );
    Ok(report)
}
