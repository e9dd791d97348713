//! Test fixtures for reproducible histories and tables.
//!
//! Run timestamps are offsets in minutes from a fixed base instant so that
//! expected gaps and spans can be written down exactly.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::config::{BUGFIX_LOOP, ENGINEERING_LOOP};
use crate::history::{RunOutcome, RunRecord};
use crate::sequencing::{Line, LineMove, LoopSequence, LoopTransition, SequenceContexts};

/// Base instant for every fixture run: 2026-03-01 09:00 UTC.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A run starting `start_minute` minutes after [`base_time`].
#[must_use]
pub fn run_at(
    system: &str,
    loop_id: &str,
    start_minute: i64,
    duration_minutes: i64,
    outcome: RunOutcome,
) -> RunRecord {
    let started_at = base_time() + Duration::minutes(start_minute);
    RunRecord::new(
        system,
        loop_id,
        started_at,
        started_at + Duration::minutes(duration_minutes),
        outcome,
    )
}

/// Engineering and bugfix runs alternating `repetitions` times.
///
/// Every run lasts 30 minutes and the next starts `gap_minutes` after it
/// completes, giving `2 * repetitions` runs starting with engineering.
#[must_use]
pub fn alternating_history(
    system: &str,
    repetitions: usize,
    gap_minutes: i64,
    outcome: RunOutcome,
) -> Vec<RunRecord> {
    (0..repetitions * 2)
        .map(|i| {
            let loop_id = if i % 2 == 0 { ENGINEERING_LOOP } else { BUGFIX_LOOP };
            run_at(system, loop_id, i as i64 * (30 + gap_minutes), 30, outcome)
        })
        .collect()
}

/// A transition with a 10 minute mean gap, seen in system "test".
#[must_use]
pub fn transition_with(from: &str, to: &str, occurrences: u32, success_rate: f64) -> LoopTransition {
    let now = Utc::now();
    LoopTransition {
        from_loop: from.to_string(),
        to_loop: to.to_string(),
        occurrences,
        success_rate,
        avg_gap_minutes: 10.0,
        contexts: BTreeSet::from(["test".to_string()]),
        first_seen: now,
        last_seen: now,
    }
}

#[must_use]
pub fn sequence_with(loops: &[&str], occurrences: u32, success_rate: f64) -> LoopSequence {
    let now = Utc::now();
    LoopSequence {
        id: Uuid::new_v4().to_string(),
        loops: loops.iter().map(|l| (*l).to_string()).collect(),
        occurrences,
        avg_total_duration: 90.0,
        success_rate,
        contexts: SequenceContexts {
            systems: BTreeSet::from(["test".to_string()]),
            modules: BTreeSet::new(),
        },
        first_seen: now,
        last_seen: now,
    }
}

/// A single-move line stamped with `generated_at`.
#[must_use]
pub fn line_generated_at(generated_at: DateTime<Utc>) -> Line {
    Line {
        id: Uuid::new_v4().to_string(),
        moves: vec![LineMove {
            position: 1,
            loop_id: ENGINEERING_LOOP.to_string(),
            target: None,
            leverage: 5.0,
            estimated_duration: 60.0,
            cumulative_leverage: 5.0,
            cumulative_duration: 60.0,
            transition_from_previous: None,
        }],
        total_moves: 1,
        compound_leverage: 5.0,
        expected_duration: 60.0,
        confidence: 1.0,
        reasoning: "Start with engineering-loop (leverage 5.0).".to_string(),
        risks: Vec::new(),
        alternatives: Vec::new(),
        based_on_sequences: Vec::new(),
        generated_at,
    }
}
