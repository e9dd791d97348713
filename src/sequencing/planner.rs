//! Multi-move line planning.
//!
//! Greedy best-first search over the implicit transition graph. Each
//! extension step blends single-step leverage with historical transition
//! strength; leverage contributions decay geometrically with depth.
//!
//! ```text
//! seed ──> extend ──> extend ──> ... ──> assemble
//!   │         │                            │
//!   │         └─ no outgoing edges:        ├─ cumulative leverage / duration
//!   │            leverage-only fallback    ├─ confidence
//!   └─ starting loop | top-ranked target   ├─ risks
//!      | most frequent source              └─ alternatives, reasoning
//! ```
//!
//! All inputs are resident before the search starts; no step performs I/O.

use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use super::types::{
    Line, LineAlternative, LineMove, LineRisk, LoopTransition, RiskKind, SequenceTable,
    TransitionEvidence, TransitionKey, TransitionTable,
};
use crate::config::PlannerConfig;
use crate::error::{Result, SequencingError};
use crate::leverage::{LeverageTable, LoopResolver};

/// What the caller wants planned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineRequest {
    pub starting_loop: Option<String>,
    pub target: Option<String>,
    /// Falls back to the configured default depth.
    pub depth: Option<usize>,
}

impl LineRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn starting_at(mut self, loop_id: impl Into<String>) -> Self {
        self.starting_loop = Some(loop_id.into());
        self
    }

    #[must_use]
    pub fn toward(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// A chosen step before cumulative figures are computed.
#[derive(Debug, Clone)]
struct Step {
    loop_id: String,
    target: Option<String>,
    leverage: f64,
}

/// Plans lines over a snapshot of the transition and sequence tables.
pub struct LinePlanner<'a> {
    config: &'a PlannerConfig,
    transitions: &'a TransitionTable,
    sequences: &'a SequenceTable,
    leverage: &'a LeverageTable,
    resolver: &'a dyn LoopResolver,
}

impl<'a> LinePlanner<'a> {
    #[must_use]
    pub fn new(
        config: &'a PlannerConfig,
        transitions: &'a TransitionTable,
        sequences: &'a SequenceTable,
        leverage: &'a LeverageTable,
        resolver: &'a dyn LoopResolver,
    ) -> Self {
        Self {
            config,
            transitions,
            sequences,
            leverage,
            resolver,
        }
    }

    /// Generate a line.
    ///
    /// # Errors
    ///
    /// Returns [`SequencingError::NoStartingLoop`] if there is no starting
    /// loop, no leverage ranking and no transition data.
    pub fn generate_line(&self, request: &LineRequest) -> Result<Line> {
        let depth = request.depth.unwrap_or(self.config.default_depth).max(1);
        let target = request.target.as_deref();

        let mut steps = vec![self.seed(request)?];
        let mut used: HashSet<String> = HashSet::from([steps[0].loop_id.clone()]);
        let mut alternatives = Vec::new();

        while steps.len() < depth {
            let current = steps[steps.len() - 1].loop_id.clone();
            let position = steps.len() + 1;
            let outgoing = self.outgoing(&current);

            let next = if outgoing.is_empty() {
                self.leverage_only_step(&used, target)
            } else {
                let mut candidates: Vec<&LoopTransition> = outgoing
                    .into_iter()
                    .filter(|t| !used.contains(&t.to_loop))
                    .collect();
                if candidates.is_empty() {
                    None
                } else {
                    candidates.sort_by(|a, b| {
                        self.blended_score(b, target)
                            .total_cmp(&self.blended_score(a, target))
                            .then_with(|| b.occurrences.cmp(&a.occurrences))
                            .then_with(|| a.to_loop.cmp(&b.to_loop))
                    });
                    let best = candidates[0];
                    if position <= self.config.alternative_steps + 1 {
                        alternatives.extend(self.alternatives_for(position, best, &candidates[1..]));
                    }
                    Some(Step {
                        loop_id: best.to_loop.clone(),
                        target: request.target.clone(),
                        leverage: self.leverage.score_for(&best.to_loop, target),
                    })
                }
            };

            let Some(step) = next else {
                debug!("No viable move after {}, stopping at {} moves", current, steps.len());
                break;
            };
            debug!("Move {}: {} -> {}", position, current, step.loop_id);
            used.insert(step.loop_id.clone());
            steps.push(step);
        }

        Ok(self.assemble(steps, alternatives))
    }

    /// Blended candidate score: leverage and `occurrences * successRate`.
    #[must_use]
    pub fn blended_score(&self, transition: &LoopTransition, target: Option<&str>) -> f64 {
        self.config.leverage_weight * self.leverage.score_for(&transition.to_loop, target)
            + self.config.history_weight * transition.historical_score()
    }

    /// Estimated minutes for one run of `loop_id`.
    ///
    /// Mean gap of transitions touching the loop, floored; otherwise the
    /// configured per-loop default.
    #[must_use]
    pub fn estimated_duration(&self, loop_id: &str) -> f64 {
        let gaps: Vec<f64> = self
            .transitions
            .values()
            .filter(|t| t.touches(loop_id))
            .map(|t| t.avg_gap_minutes)
            .collect();

        if gaps.is_empty() {
            self.config.duration_for(loop_id)
        } else {
            let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
            mean.max(self.config.min_duration_minutes)
        }
    }

    fn seed(&self, request: &LineRequest) -> Result<Step> {
        if let Some(loop_id) = &request.starting_loop {
            return Ok(Step {
                loop_id: loop_id.clone(),
                target: request.target.clone(),
                leverage: self.leverage.score_for(loop_id, request.target.as_deref()),
            });
        }

        if let Some(top) = self.leverage.top() {
            let loop_id = self.resolver.resolve(&top.target_id);
            debug!("Seeding from top-ranked target {} -> {}", top.target_id, loop_id);
            return Ok(Step {
                loop_id,
                target: request
                    .target
                    .clone()
                    .or_else(|| Some(top.target_id.clone())),
                leverage: top.score,
            });
        }

        let loop_id = self.most_frequent_source().ok_or_else(|| {
            SequencingError::no_starting_loop(
                "no starting loop given, no leverage ranking, and no transition history",
            )
        })?;
        debug!("Seeding from most frequent transition source {}", loop_id);
        Ok(Step {
            leverage: self.leverage.score_for(&loop_id, request.target.as_deref()),
            loop_id,
            target: request.target.clone(),
        })
    }

    fn most_frequent_source(&self) -> Option<String> {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for t in self.transitions.values() {
            *counts.entry(t.from_loop.as_str()).or_insert(0) += t.occurrences;
        }
        // Ties resolve to the alphabetically first loop.
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(loop_id, _)| loop_id.to_string())
    }

    fn outgoing(&self, loop_id: &str) -> Vec<&'a LoopTransition> {
        self.transitions
            .values()
            .filter(|t| t.from_loop == loop_id)
            .collect()
    }

    /// Next step from the ranking alone. A requested target wins over the
    /// ranked one.
    fn leverage_only_step(&self, used: &HashSet<String>, target: Option<&str>) -> Option<Step> {
        self.leverage.ranked().iter().find_map(|score| {
            let loop_id = self.resolver.resolve(&score.target_id);
            (!used.contains(&loop_id)).then(|| Step {
                loop_id,
                target: Some(target.unwrap_or(&score.target_id).to_string()),
                leverage: score.score,
            })
        })
    }

    fn alternatives_for(
        &self,
        position: usize,
        chosen: &LoopTransition,
        rest: &[&LoopTransition],
    ) -> Vec<LineAlternative> {
        let mut rest = rest.to_vec();
        rest.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| a.to_loop.cmp(&b.to_loop))
        });
        rest.into_iter()
            .take(self.config.alternatives_per_step)
            .map(|t| LineAlternative {
                position,
                instead_of: chosen.to_loop.clone(),
                loop_id: t.to_loop.clone(),
                occurrences: t.occurrences,
                success_rate: t.success_rate,
            })
            .collect()
    }

    fn transition(&self, from: &str, to: &str) -> Option<&'a LoopTransition> {
        self.transitions.get(&TransitionKey::new(from, to))
    }

    fn assemble(&self, steps: Vec<Step>, alternatives: Vec<LineAlternative>) -> Line {
        let decay = self.config.decay_factor;
        let mut moves: Vec<LineMove> = Vec::with_capacity(steps.len());
        let mut cumulative_leverage = 0.0;
        let mut cumulative_duration = 0.0;
        let mut confidence = 1.0;
        let mut risks = Vec::new();

        for (index, step) in steps.into_iter().enumerate() {
            let position = index + 1;
            let estimated_duration = self.estimated_duration(&step.loop_id);
            cumulative_leverage += step.leverage * decay.powi(index as i32);
            cumulative_duration += estimated_duration;

            let evidence = match moves.last() {
                Some(previous) => {
                    let previous_loop = previous.loop_id.as_str();
                    match self.transition(previous_loop, &step.loop_id) {
                        Some(t) => {
                            confidence *= 0.5 + 0.5 * t.success_rate;
                            if t.success_rate < self.config.low_success_threshold {
                                risks.push(LineRisk {
                                    kind: RiskKind::LowSuccessRate,
                                    position: Some(position),
                                    message: format!(
                                        "Move {} ({} → {}) has a low historical success rate ({:.0}%)",
                                        position,
                                        previous_loop,
                                        step.loop_id,
                                        t.success_rate * 100.0
                                    ),
                                });
                            }
                            Some(TransitionEvidence::from(t))
                        }
                        None => {
                            confidence *= self.config.no_data_penalty;
                            risks.push(LineRisk {
                                kind: RiskKind::NoHistoricalData,
                                position: Some(position),
                                message: format!(
                                    "Move {} ({} → {}) has no historical data",
                                    position, previous_loop, step.loop_id
                                ),
                            });
                            None
                        }
                    }
                }
                None => None,
            };

            moves.push(LineMove {
                position,
                loop_id: step.loop_id,
                target: step.target,
                leverage: step.leverage,
                estimated_duration,
                cumulative_leverage,
                cumulative_duration,
                transition_from_previous: evidence,
            });
        }

        let loops: Vec<String> = moves.iter().map(|m| m.loop_id.clone()).collect();
        let based_on_sequences: Vec<String> = self
            .sequences
            .values()
            .filter(|s| s.overlaps(&loops))
            .map(|s| s.id.clone())
            .collect();
        if !based_on_sequences.is_empty() {
            confidence *= self.config.sequence_match_boost;
        }
        let confidence = confidence.clamp(0.0, 1.0);

        if cumulative_duration > self.config.long_duration_minutes {
            risks.push(LineRisk {
                kind: RiskKind::LongDuration,
                position: None,
                message: format!(
                    "Total estimated duration ({:.0} minutes) exceeds {:.0} minutes",
                    cumulative_duration, self.config.long_duration_minutes
                ),
            });
        }
        if moves.len() > self.config.multi_move_risk_after {
            risks.push(LineRisk {
                kind: RiskKind::ConfidenceDecay,
                position: None,
                message: format!(
                    "Confidence decays over multiple moves; re-evaluate after move {}",
                    self.config.multi_move_risk_after
                ),
            });
        }

        let reasoning = self.reasoning(&moves, cumulative_leverage, confidence, &based_on_sequences);

        Line {
            id: Uuid::new_v4().to_string(),
            total_moves: moves.len(),
            compound_leverage: cumulative_leverage,
            expected_duration: cumulative_duration,
            confidence,
            reasoning,
            risks,
            alternatives,
            based_on_sequences,
            generated_at: Utc::now(),
            moves,
        }
    }

    fn reasoning(
        &self,
        moves: &[LineMove],
        compound_leverage: f64,
        confidence: f64,
        based_on_sequences: &[String],
    ) -> String {
        let mut parts = Vec::new();

        if let Some(first) = moves.first() {
            let target = first
                .target
                .as_deref()
                .map(|t| format!(" on {}", t))
                .unwrap_or_default();
            parts.push(format!(
                "Start with {}{} (leverage {:.1}).",
                first.loop_id, target, first.leverage
            ));
        }

        for pair in moves.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            let sentence = match &current.transition_from_previous {
                Some(evidence) => format!(
                    "Then {}: followed {} {} times with {:.0}% success.",
                    current.loop_id,
                    previous.loop_id,
                    evidence.occurrences,
                    evidence.success_rate * 100.0
                ),
                None => format!(
                    "Then {}: chosen on leverage alone ({:.1}), never observed after {}.",
                    current.loop_id, current.leverage, previous.loop_id
                ),
            };
            parts.push(sentence);
        }

        let total_duration = moves.last().map_or(0.0, |m| m.cumulative_duration);
        parts.push(format!(
            "Compound leverage {:.1} over ~{:.0} minutes, confidence {:.0}%.",
            compound_leverage,
            total_duration,
            confidence * 100.0
        ));

        if !based_on_sequences.is_empty() {
            parts.push(format!(
                "Resembles {} known sequence{}.",
                based_on_sequences.len(),
                if based_on_sequences.len() == 1 { "" } else { "s" }
            ));
        }

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leverage::{KeywordLoopResolver, LeverageScore};
    use crate::testing::fixtures::{sequence_with, transition_with};

    fn transitions(entries: &[(&str, &str, u32, f64)]) -> TransitionTable {
        entries
            .iter()
            .map(|(from, to, occ, rate)| {
                let t = transition_with(from, to, *occ, *rate);
                (t.key(), t)
            })
            .collect()
    }

    fn ranking(entries: &[(&str, f64)]) -> LeverageTable {
        LeverageTable::new(
            Some(
                entries
                    .iter()
                    .map(|(id, score)| LeverageScore::new(*id, *score))
                    .collect(),
            ),
            5.0,
        )
    }

    fn resolver() -> KeywordLoopResolver {
        KeywordLoopResolver::from_config(&PlannerConfig::default()).unwrap()
    }

    fn plan(
        table: &TransitionTable,
        sequences: &SequenceTable,
        leverage: &LeverageTable,
        request: LineRequest,
    ) -> Result<Line> {
        let config = PlannerConfig::default();
        let resolver = resolver();
        LinePlanner::new(&config, table, sequences, leverage, &resolver).generate_line(&request)
    }

    #[test]
    fn test_blended_score_prefers_strong_history_and_leverage() {
        let table = transitions(&[("A", "B", 10, 0.9), ("A", "C", 2, 0.5)]);
        let leverage = ranking(&[("B", 8.0), ("C", 3.0)]);

        let line = plan(
            &table,
            &SequenceTable::new(),
            &leverage,
            LineRequest::new().starting_at("A").with_depth(2),
        )
        .unwrap();

        assert_eq!(line.loops(), vec!["A", "B"]);
        let config = PlannerConfig::default();
        let resolver = resolver();
        let sequences = SequenceTable::new();
        let planner = LinePlanner::new(&config, &table, &sequences, &leverage, &resolver);
        let ab = &table[&TransitionKey::new("A", "B")];
        let ac = &table[&TransitionKey::new("A", "C")];
        assert!((planner.blended_score(ab, None) - 8.4).abs() < 1e-9);
        assert!((planner.blended_score(ac, None) - 2.2).abs() < 1e-9);
    }

    #[test]
    fn test_no_seed_is_explicit_failure() {
        let err = plan(
            &TransitionTable::new(),
            &SequenceTable::new(),
            &LeverageTable::unavailable(5.0),
            LineRequest::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SequencingError::NoStartingLoop { .. }));
        assert!(err.to_string().contains("Cannot determine starting loop"));
    }

    #[test]
    fn test_seed_from_top_ranked_target() {
        let leverage = ranking(&[("checkout-bugfix", 9.0), ("search", 4.0)]);
        let line = plan(
            &TransitionTable::new(),
            &SequenceTable::new(),
            &leverage,
            LineRequest::new().with_depth(1),
        )
        .unwrap();

        assert_eq!(line.moves[0].loop_id, "bugfix-loop");
        assert_eq!(line.moves[0].target.as_deref(), Some("checkout-bugfix"));
        assert_eq!(line.moves[0].leverage, 9.0);
    }

    #[test]
    fn test_seed_from_most_frequent_source() {
        let table = transitions(&[("a", "b", 2, 1.0), ("c", "b", 3, 1.0), ("c", "d", 2, 1.0)]);
        let line = plan(
            &table,
            &SequenceTable::new(),
            &LeverageTable::unavailable(5.0),
            LineRequest::new().with_depth(1),
        )
        .unwrap();
        assert_eq!(line.moves[0].loop_id, "c");
        assert_eq!(line.moves[0].leverage, 5.0);
    }

    #[test]
    fn test_line_never_revisits_a_loop() {
        let table = transitions(&[
            ("a", "b", 9, 1.0),
            ("b", "a", 9, 1.0),
            ("b", "c", 1, 1.0),
            ("c", "a", 5, 1.0),
        ]);
        let line = plan(
            &table,
            &SequenceTable::new(),
            &LeverageTable::unavailable(5.0),
            LineRequest::new().starting_at("a").with_depth(5),
        )
        .unwrap();

        assert_eq!(line.loops(), vec!["a", "b", "c"]);
        assert_eq!(line.total_moves, line.moves.len());
        let unique: HashSet<_> = line.loops().into_iter().collect();
        assert_eq!(unique.len(), line.moves.len());
    }

    #[test]
    fn test_leverage_only_fallback_when_no_outgoing() {
        let leverage = ranking(&[("payments", 7.0), ("login-fix", 6.0)]);
        let line = plan(
            &TransitionTable::new(),
            &SequenceTable::new(),
            &leverage,
            LineRequest::new().starting_at("engineering-loop").with_depth(3),
        )
        .unwrap();

        // "payments" resolves to engineering-loop, already used.
        assert_eq!(line.loops(), vec!["engineering-loop", "bugfix-loop"]);
        assert_eq!(line.moves[1].target.as_deref(), Some("login-fix"));
        assert!(line.moves[1].transition_from_previous.is_none());
    }

    #[test]
    fn test_leverage_only_fallback_keeps_requested_target() {
        let leverage = ranking(&[("login-fix", 6.0)]);
        let line = plan(
            &TransitionTable::new(),
            &SequenceTable::new(),
            &leverage,
            LineRequest::new()
                .starting_at("engineering-loop")
                .toward("release-42")
                .with_depth(2),
        )
        .unwrap();

        assert_eq!(line.loops(), vec!["engineering-loop", "bugfix-loop"]);
        assert_eq!(line.moves[1].target.as_deref(), Some("release-42"));
    }

    #[test]
    fn test_terminates_early_without_fallback() {
        let line = plan(
            &TransitionTable::new(),
            &SequenceTable::new(),
            &LeverageTable::unavailable(5.0),
            LineRequest::new().starting_at("lonely").with_depth(5),
        )
        .unwrap();
        assert_eq!(line.total_moves, 1);
        assert_eq!(line.confidence, 1.0);
        assert!(line.risks.is_empty());
    }

    #[test]
    fn test_cumulative_leverage_decays_geometrically() {
        let table = transitions(&[("a", "b", 1, 1.0), ("b", "c", 1, 1.0), ("c", "d", 1, 1.0)]);
        let line = plan(
            &table,
            &SequenceTable::new(),
            &LeverageTable::unavailable(5.0),
            LineRequest::new().starting_at("a").with_depth(4),
        )
        .unwrap();

        let d: f64 = 0.85;
        for m in &line.moves {
            let n = m.position as i32;
            let expected = 5.0 * (1.0 - d.powi(n)) / (1.0 - d);
            assert!((m.cumulative_leverage - expected).abs() < 1e-9);
        }
        assert!((line.compound_leverage - line.moves[3].cumulative_leverage).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_multiplies_success_and_penalty() {
        let table = transitions(&[("a", "b", 4, 0.6)]);
        let leverage = ranking(&[("c-target", 9.0)]);
        let line = plan(
            &table,
            &SequenceTable::new(),
            &leverage,
            LineRequest::new().starting_at("a").with_depth(3),
        )
        .unwrap();

        // a -> b observed (0.5 + 0.3), b -> engineering-loop unobserved (0.7).
        assert_eq!(line.loops(), vec!["a", "b", "engineering-loop"]);
        assert!((line.confidence - 0.8 * 0.7).abs() < 1e-9);
        assert!(line.has_risk(RiskKind::NoHistoricalData));
        let risk = line
            .risks
            .iter()
            .find(|r| r.kind == RiskKind::NoHistoricalData)
            .unwrap();
        assert_eq!(risk.position, Some(3));
        assert!(risk.message.contains("no historical data"));
    }

    #[test]
    fn test_sequence_match_boost_is_capped() {
        let table = transitions(&[("a", "b", 10, 1.0), ("b", "c", 10, 1.0)]);
        let mut sequences = SequenceTable::new();
        let seq = sequence_with(&["a", "b", "c"], 4, 1.0);
        let seq_id = seq.id.clone();
        sequences.insert(seq.loops.clone(), seq);

        let line = plan(
            &table,
            &sequences,
            &LeverageTable::unavailable(5.0),
            LineRequest::new().starting_at("a").with_depth(3),
        )
        .unwrap();

        assert_eq!(line.confidence, 1.0);
        assert_eq!(line.based_on_sequences, vec![seq_id]);
        assert!(line.reasoning.contains("Resembles 1 known sequence."));
    }

    #[test]
    fn test_low_success_and_line_wide_risks() {
        let table = transitions(&[
            ("a", "b", 3, 0.2),
            ("b", "c", 3, 1.0),
            ("c", "d", 3, 1.0),
            ("d", "e", 3, 1.0),
        ]);
        let line = plan(
            &table,
            &SequenceTable::new(),
            &LeverageTable::unavailable(5.0),
            LineRequest::new().starting_at("a").with_depth(5),
        )
        .unwrap();

        assert!(line.has_risk(RiskKind::LowSuccessRate));
        assert!(line.has_risk(RiskKind::ConfidenceDecay));
        // Every loop has observed gaps, floored at 15 minutes: 5 * 15 = 75.
        assert!(!line.has_risk(RiskKind::LongDuration));
        assert!(line.confidence > 0.0 && line.confidence <= 1.0);
    }

    #[test]
    fn test_long_duration_risk() {
        let line = plan(
            &TransitionTable::new(),
            &SequenceTable::new(),
            &ranking(&[("x", 1.0)]),
            LineRequest::new().starting_at("a").toward("x").with_depth(5),
        )
        .unwrap();
        assert_eq!(line.total_moves, 2);
        assert!(!line.has_risk(RiskKind::LongDuration));

        let mut slow = transitions(&[("a", "b", 1, 1.0), ("b", "c", 1, 1.0)]);
        for t in slow.values_mut() {
            t.avg_gap_minutes = 200.0;
        }
        let line = plan(
            &slow,
            &SequenceTable::new(),
            &LeverageTable::unavailable(5.0),
            LineRequest::new().starting_at("a").with_depth(3),
        )
        .unwrap();
        assert!(line.has_risk(RiskKind::LongDuration));
        assert!((line.expected_duration - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_alternatives_for_first_two_extension_steps() {
        let table = transitions(&[
            ("a", "b", 10, 1.0),
            ("a", "c", 4, 1.0),
            ("a", "d", 3, 1.0),
            ("a", "e", 1, 1.0),
            ("b", "f", 10, 1.0),
            ("b", "g", 2, 1.0),
            ("f", "h", 10, 1.0),
            ("f", "i", 2, 1.0),
        ]);
        let line = plan(
            &table,
            &SequenceTable::new(),
            &LeverageTable::unavailable(5.0),
            LineRequest::new().starting_at("a").with_depth(4),
        )
        .unwrap();

        assert_eq!(line.loops(), vec!["a", "b", "f", "h"]);
        let summary: Vec<_> = line
            .alternatives
            .iter()
            .map(|a| (a.position, a.loop_id.as_str()))
            .collect();
        assert_eq!(summary, vec![(2, "c"), (2, "d"), (3, "g")]);
        assert_eq!(line.alternatives[0].instead_of, "b");
    }

    #[test]
    fn test_estimated_duration_uses_gaps_then_defaults() {
        let mut table = transitions(&[("a", "b", 1, 1.0), ("b", "c", 1, 1.0)]);
        for (gap, t) in [40.0, 80.0].into_iter().zip(table.values_mut()) {
            t.avg_gap_minutes = gap;
        }
        let config = PlannerConfig::default();
        let resolver = resolver();
        let sequences = SequenceTable::new();
        let leverage = LeverageTable::unavailable(5.0);
        let planner = LinePlanner::new(&config, &table, &sequences, &leverage, &resolver);

        assert!((planner.estimated_duration("b") - 60.0).abs() < 1e-9);
        assert!((planner.estimated_duration("a") - 40.0).abs() < 1e-9);
        assert_eq!(planner.estimated_duration("bugfix-loop"), 30.0);
        assert_eq!(planner.estimated_duration("unknown"), 60.0);
    }
}
