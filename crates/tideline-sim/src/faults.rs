//! Fault-injected delivery of reschedule responses.
//!
//! The simulator never talks to a real backend: every begun mutation gets
//! a response queued here, and the queue decides *when* it comes back and
//! in *what order*. Timeouts model the browser giving up on a hung
//! request — the response is withheld until the final flush and then
//! delivered as a failure.

use serde::{Deserialize, Serialize};

use tideline_core::mutation::{MutationTicket, Outcome};

use crate::rng::SimRng;

/// Fault injection configuration for response delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultPlan {
    /// Percentage of responses that come back as failures.
    pub fail_rate_percent: u8,
    /// Percentage of requests that hang until the flush, then fail.
    pub timeout_rate_percent: u8,
    /// Maximum delivery delay in rounds for responses that do arrive.
    pub max_delay_rounds: u8,
    /// Percentage chance of shuffling the ready batch each round.
    pub reorder_rate_percent: u8,
}

impl Default for FaultPlan {
    fn default() -> Self {
        Self {
            fail_rate_percent: 20,
            timeout_rate_percent: 5,
            max_delay_rounds: 3,
            reorder_rate_percent: 25,
        }
    }
}

/// How a queued response will resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedOutcome {
    Confirm,
    Fail,
    Timeout,
}

#[derive(Debug, Clone)]
struct QueuedResponse {
    /// Round at which the response becomes deliverable; `None` hangs until
    /// the flush.
    deliver_at: Option<u64>,
    ticket: MutationTicket,
    planned: PlannedOutcome,
}

/// Deterministic fault-injecting response queue.
#[derive(Debug, Default)]
pub struct ResponseQueue {
    pending: Vec<QueuedResponse>,
}

impl ResponseQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Responses not yet delivered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Decide a response's fate and queue it.
    pub fn submit(
        &mut self,
        rng: &mut SimRng,
        plan: &FaultPlan,
        now_round: u64,
        ticket: MutationTicket,
    ) -> PlannedOutcome {
        let planned = if rng.chance(plan.timeout_rate_percent) {
            PlannedOutcome::Timeout
        } else if rng.chance(plan.fail_rate_percent) {
            PlannedOutcome::Fail
        } else {
            PlannedOutcome::Confirm
        };

        let deliver_at = match planned {
            PlannedOutcome::Timeout => None,
            PlannedOutcome::Confirm | PlannedOutcome::Fail => {
                Some(now_round + 1 + rng.below(u64::from(plan.max_delay_rounds) + 1))
            }
        };

        self.pending.push(QueuedResponse {
            deliver_at,
            ticket,
            planned,
        });
        planned
    }

    /// Responses ready at `round`, possibly shuffled.
    pub fn deliver_ready(
        &mut self,
        rng: &mut SimRng,
        plan: &FaultPlan,
        round: u64,
    ) -> Vec<(MutationTicket, Outcome)> {
        let mut ready = Vec::new();
        self.pending.retain(|queued| {
            if queued.deliver_at.is_some_and(|at| at <= round) {
                ready.push((queued.ticket.clone(), outcome_for(queued.planned)));
                false
            } else {
                true
            }
        });

        if ready.len() > 1 && rng.chance(plan.reorder_rate_percent) {
            rng.shuffle(&mut ready);
        }
        ready
    }

    /// Everything still queued, hung requests included. Hung requests come
    /// back as failures, the way a browser timeout eventually surfaces.
    /// Delivery is in submit order.
    pub fn flush(&mut self) -> Vec<(MutationTicket, Outcome)> {
        self.pending
            .drain(..)
            .map(|queued| (queued.ticket, outcome_for(queued.planned)))
            .collect()
    }
}

fn outcome_for(planned: PlannedOutcome) -> Outcome {
    match planned {
        PlannedOutcome::Confirm => Outcome::Confirmed { canonical: None },
        PlannedOutcome::Fail => Outcome::Failed {
            reason: "injected failure".to_string(),
        },
        PlannedOutcome::Timeout => Outcome::Failed {
            reason: "request timed out".to_string(),
        },
    }
}
