//! Custom assertions for domain-specific testing.
//!
//! Provides expressive assertions over generated lines.

use std::collections::HashSet;

use crate::sequencing::{Line, RiskKind};

/// Assert that a line is internally consistent.
///
/// Checks move count, 1-based positions, no repeated loop, confidence in
/// `[0, 1]` and that compound figures match the last move.
///
/// # Panics
///
/// Panics with a descriptive message on the first violated property.
///
/// # Example
///
/// ```rust,ignore
/// let line = sequencer.generate_line(&LineRequest::new())?;
/// assert_line_well_formed(&line);
/// ```
pub fn assert_line_well_formed(line: &Line) {
    assert!(!line.moves.is_empty(), "Expected at least one move");
    assert_eq!(
        line.total_moves,
        line.moves.len(),
        "totalMoves disagrees with the move list"
    );

    for (index, m) in line.moves.iter().enumerate() {
        assert_eq!(m.position, index + 1, "Move positions must be 1-based and contiguous");
    }

    let mut seen = HashSet::new();
    for loop_id in line.loops() {
        assert!(seen.insert(loop_id), "Loop {} appears twice in {:?}", loop_id, line.loops());
    }

    assert!(
        (0.0..=1.0).contains(&line.confidence),
        "Confidence {} is outside [0, 1]",
        line.confidence
    );

    if let Some(last) = line.moves.last() {
        assert!(
            (line.compound_leverage - last.cumulative_leverage).abs() < 1e-9,
            "compoundLeverage {} != last cumulative leverage {}",
            line.compound_leverage,
            last.cumulative_leverage
        );
        assert!(
            (line.expected_duration - last.cumulative_duration).abs() < 1e-9,
            "expectedDuration {} != last cumulative duration {}",
            line.expected_duration,
            last.cumulative_duration
        );
    }
}

/// Assert that a line carries a risk of the given kind.
///
/// # Panics
///
/// Panics listing the risks actually present.
pub fn assert_has_risk(line: &Line, kind: RiskKind) {
    assert!(
        line.has_risk(kind),
        "Expected a {} risk, got: {:?}",
        kind,
        line.risks.iter().map(|r| r.kind).collect::<Vec<_>>()
    );
}
