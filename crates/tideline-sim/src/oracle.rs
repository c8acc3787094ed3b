//! Invariant checks for simulated runs.

use chrono::{DateTime, Duration, TimeZone, Utc};

use tideline_core::model::ItemId;
use tideline_core::mutation::MutationController;
use tideline_core::range::DateRange;
use tideline_core::store::TimelineStore;

use crate::{Expectation, ExpectedEnd};

/// Result of an invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    /// `true` iff no violations were found.
    pub passed: bool,
    /// Every invariant that was violated.
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

/// Diagnostic for a single failed invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A stored item ends before it starts.
    IntervalInverted {
        id: ItemId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Pending mutations survived the final flush.
    PendingNotDrained { count: usize },
    /// An item's final times disagree with its last mutation's outcome.
    Diverged {
        id: ItemId,
        expected_start: DateTime<Utc>,
        actual_start: DateTime<Utc>,
    },
    /// An item the simulator seeded disappeared without being deleted.
    ItemVanished { id: ItemId },
}

/// Checks run after every round and again after the flush.
pub struct ConvergenceOracle;

impl ConvergenceOracle {
    /// Per-round invariants: every stored item has an ordered span.
    #[must_use]
    pub fn check_step(store: &TimelineStore) -> OracleResult {
        let everything = everything_range();
        let violations: Vec<InvariantViolation> = store
            .query(&everything)
            .into_iter()
            .filter(|item| item.end < item.start)
            .map(|item| InvariantViolation::IntervalInverted {
                id: item.id.clone(),
                start: item.start,
                end: item.end,
            })
            .collect();

        if violations.is_empty() {
            OracleResult::pass()
        } else {
            OracleResult {
                passed: false,
                violations,
            }
        }
    }

    /// Post-flush invariants: no pending mutations remain, and every item
    /// sits exactly where its last mutation's outcome says it should.
    #[must_use]
    pub fn check_final(
        store: &TimelineStore,
        controller: &MutationController,
        expectations: &[(ItemId, Expectation)],
    ) -> OracleResult {
        let mut result = Self::check_step(store);

        if controller.pending_count() > 0 {
            result = result.merge(OracleResult {
                passed: false,
                violations: vec![InvariantViolation::PendingNotDrained {
                    count: controller.pending_count(),
                }],
            });
        }

        for (id, expectation) in expectations {
            let Some(item) = store.get(id) else {
                result = result.merge(OracleResult {
                    passed: false,
                    violations: vec![InvariantViolation::ItemVanished { id: id.clone() }],
                });
                continue;
            };

            let expected_start = match expectation.expected_end {
                ExpectedEnd::Confirmed => expectation.optimistic_start,
                ExpectedEnd::RolledBack => expectation.fallback_start,
            };
            if item.start != expected_start {
                result = result.merge(OracleResult {
                    passed: false,
                    violations: vec![InvariantViolation::Diverged {
                        id: id.clone(),
                        expected_start,
                        actual_start: item.start,
                    }],
                });
            }
        }

        result
    }
}

fn everything_range() -> DateRange {
    let base = Utc
        .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .expect("valid constant date");
    DateRange::new(base, base + Duration::days(365 * 20)).expect("ordered constant range")
}
