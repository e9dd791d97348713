//! Recurring sequence detection.
//!
//! Windows of consecutive runs are matched by their exact ordered tuple of
//! loops. Windows overlap on purpose: a sub-pattern that recurs inside longer
//! histories is counted every time it appears.

use chrono::Duration;
use std::ops::RangeInclusive;
use tracing::debug;
use uuid::Uuid;

use super::types::{running_average, LoopSequence, SequenceContexts, SequenceTable};
use crate::history::RunRecord;

/// Detects recurring 3-5 step sequences.
#[derive(Debug, Clone)]
pub struct SequenceMiner {
    window: Duration,
    lengths: RangeInclusive<usize>,
}

impl SequenceMiner {
    #[must_use]
    pub fn new(window: Duration, lengths: RangeInclusive<usize>) -> Self {
        Self { window, lengths }
    }

    /// Detect sequences in one system's runs, sorted by start time.
    ///
    /// Returns the number of windows recorded.
    pub fn detect_sequences(&self, table: &mut SequenceTable, runs: &[RunRecord]) -> usize {
        let mut recorded = 0;

        for length in self.lengths.clone() {
            if length == 0 || runs.len() < length {
                continue;
            }
            for window in runs.windows(length) {
                let first = &window[0];
                let last = &window[length - 1];
                let span = last.completed_at - first.started_at;
                if span >= self.window {
                    continue;
                }
                self.upsert(table, window, span);
                recorded += 1;
            }
        }

        debug!(
            "Recorded {} sequence windows ({} distinct sequences)",
            recorded,
            table.len()
        );
        recorded
    }

    fn upsert(&self, table: &mut SequenceTable, window: &[RunRecord], span: Duration) {
        let loops: Vec<String> = window.iter().map(|r| r.loop_id.clone()).collect();
        let minutes = (span.num_seconds() as f64 / 60.0).max(0.0);
        let success = if window.iter().all(RunRecord::succeeded) {
            1.0
        } else {
            0.0
        };
        let seen_at = window[0].started_at;

        let sequence = table.entry(loops.clone()).or_insert_with(|| LoopSequence {
            id: Uuid::new_v4().to_string(),
            loops,
            occurrences: 0,
            avg_total_duration: 0.0,
            success_rate: 0.0,
            contexts: SequenceContexts::default(),
            first_seen: seen_at,
            last_seen: seen_at,
        });

        sequence.occurrences += 1;
        let n = sequence.occurrences;
        sequence.avg_total_duration = running_average(sequence.avg_total_duration, minutes, n);
        sequence.success_rate = running_average(sequence.success_rate, success, n);
        if seen_at > sequence.last_seen {
            sequence.last_seen = seen_at;
        }
        if seen_at < sequence.first_seen {
            sequence.first_seen = seen_at;
        }

        for run in window {
            sequence.contexts.systems.insert(run.system.clone());
            if let Some(module) = run.module.as_deref().filter(|m| !m.is_empty()) {
                sequence.contexts.modules.insert(module.to_string());
            }
        }
    }
}
