//! Pairwise transition mining.
//!
//! Consecutive runs of one system become an edge when the next run starts
//! within the transition window of the previous one completing. Statistics
//! accumulate over the whole observed history; nothing is ever reset.

use chrono::Duration;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::types::{running_average, LoopTransition, TransitionKey, TransitionTable};
use crate::history::RunRecord;

/// Builds and updates the transition table.
#[derive(Debug, Clone)]
pub struct TransitionMiner {
    window: Duration,
}

impl TransitionMiner {
    /// Create a miner that ignores pairs at or beyond `window` apart.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Record transitions from per-system run lists.
    ///
    /// Each list must be sorted by start time. Returns the number of
    /// transition observations recorded.
    pub fn record_transitions(
        &self,
        table: &mut TransitionTable,
        runs_by_system: &BTreeMap<String, Vec<RunRecord>>,
    ) -> usize {
        let mut recorded = 0;

        for (system, runs) in runs_by_system {
            for pair in runs.windows(2) {
                let (current, next) = (&pair[0], &pair[1]);
                let gap = next.started_at - current.completed_at;
                if gap >= self.window {
                    continue;
                }

                // Overlapping runs count as back-to-back.
                let gap_minutes = (gap.num_seconds() as f64 / 60.0).max(0.0);
                let both_succeeded = current.succeeded() && next.succeeded();
                self.upsert(table, system, current, next, gap_minutes, both_succeeded);
                recorded += 1;
            }
        }

        debug!(
            "Recorded {} transition observations ({} distinct edges)",
            recorded,
            table.len()
        );
        recorded
    }

    fn upsert(
        &self,
        table: &mut TransitionTable,
        system: &str,
        current: &RunRecord,
        next: &RunRecord,
        gap_minutes: f64,
        both_succeeded: bool,
    ) {
        let success = if both_succeeded { 1.0 } else { 0.0 };
        let seen_at = next.started_at;
        let key = TransitionKey::new(&current.loop_id, &next.loop_id);

        match table.get_mut(&key) {
            Some(transition) => {
                transition.occurrences += 1;
                let n = transition.occurrences;
                transition.avg_gap_minutes =
                    running_average(transition.avg_gap_minutes, gap_minutes, n);
                transition.success_rate = running_average(transition.success_rate, success, n);
                transition.contexts.insert(system.to_string());
                if seen_at > transition.last_seen {
                    transition.last_seen = seen_at;
                }
                if seen_at < transition.first_seen {
                    transition.first_seen = seen_at;
                }
            }
            None => {
                table.insert(
                    key,
                    LoopTransition {
                        from_loop: current.loop_id.clone(),
                        to_loop: next.loop_id.clone(),
                        occurrences: 1,
                        success_rate: success,
                        avg_gap_minutes: gap_minutes,
                        contexts: BTreeSet::from([system.to_string()]),
                        first_seen: seen_at,
                        last_seen: seen_at,
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{group_by_system, RunOutcome};
    use crate::testing::fixtures::{alternating_history, run_at};

    fn miner() -> TransitionMiner {
        TransitionMiner::new(Duration::hours(24))
    }

    #[test]
    fn test_alternating_history_counts() {
        let runs = alternating_history("api", 6, 10, RunOutcome::Success);
        let mut table = TransitionTable::new();
        let recorded = miner().record_transitions(&mut table, &group_by_system(&runs));

        assert_eq!(recorded, 11);
        let forward = &table[&TransitionKey::new("engineering-loop", "bugfix-loop")];
        assert_eq!(forward.occurrences, 6);
        assert_eq!(forward.success_rate, 1.0);
        assert!((forward.avg_gap_minutes - 10.0).abs() < 1e-9);

        let backward = &table[&TransitionKey::new("bugfix-loop", "engineering-loop")];
        assert_eq!(backward.occurrences, 5);
    }

    #[test]
    fn test_gap_at_or_beyond_window_is_ignored() {
        let runs = vec![
            run_at("api", "a", 0, 30, RunOutcome::Success),
            // Starts exactly 24h after `a` completed.
            run_at("api", "b", 30 + 24 * 60, 30, RunOutcome::Success),
        ];
        let mut table = TransitionTable::new();
        miner().record_transitions(&mut table, &group_by_system(&runs));
        assert!(table.is_empty());
    }

    #[test]
    fn test_success_rate_requires_both_endpoints() {
        let runs = vec![
            run_at("api", "a", 0, 10, RunOutcome::Success),
            run_at("api", "b", 20, 10, RunOutcome::Failure),
            run_at("api", "a", 40, 10, RunOutcome::Success),
            run_at("api", "b", 60, 10, RunOutcome::Success),
        ];
        let mut table = TransitionTable::new();
        miner().record_transitions(&mut table, &group_by_system(&runs));

        let ab = &table[&TransitionKey::new("a", "b")];
        assert_eq!(ab.occurrences, 2);
        assert!((ab.success_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_accumulate_across_calls() {
        let mut table = TransitionTable::new();
        let first = vec![
            run_at("api", "a", 0, 10, RunOutcome::Success),
            run_at("api", "b", 20, 10, RunOutcome::Success),
        ];
        let second = vec![
            run_at("web", "a", 100, 10, RunOutcome::Success),
            run_at("web", "b", 140, 10, RunOutcome::Failure),
        ];
        miner().record_transitions(&mut table, &group_by_system(&first));
        miner().record_transitions(&mut table, &group_by_system(&second));

        let ab = &table[&TransitionKey::new("a", "b")];
        assert_eq!(ab.occurrences, 2);
        assert!((ab.avg_gap_minutes - 20.0).abs() < 1e-9);
        assert!((ab.success_rate - 0.5).abs() < 1e-9);
        assert_eq!(ab.contexts.len(), 2);
        assert!(ab.last_seen > ab.first_seen);
    }

    #[test]
    fn test_overlapping_runs_count_as_zero_gap() {
        let runs = vec![
            run_at("api", "a", 0, 60, RunOutcome::Success),
            run_at("api", "b", 30, 10, RunOutcome::Success),
        ];
        let mut table = TransitionTable::new();
        miner().record_transitions(&mut table, &group_by_system(&runs));
        assert_eq!(table[&TransitionKey::new("a", "b")].avg_gap_minutes, 0.0);
    }

    #[test]
    fn test_systems_are_not_chained_together() {
        let runs = vec![
            run_at("api", "a", 0, 10, RunOutcome::Success),
            run_at("web", "b", 15, 10, RunOutcome::Success),
        ];
        let mut table = TransitionTable::new();
        miner().record_transitions(&mut table, &group_by_system(&runs));
        assert!(table.is_empty());
    }
}
