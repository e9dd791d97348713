//! Core types for transition mining and line planning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Composite key of a directed loop-to-loop edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionKey {
    pub from: String,
    pub to: String,
}

impl TransitionKey {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Transitions keyed by ordered pair.
pub type TransitionTable = BTreeMap<TransitionKey, LoopTransition>;

/// Sequences keyed by the exact ordered tuple of loops.
pub type SequenceTable = BTreeMap<Vec<String>, LoopSequence>;

/// Running average over `n` samples where `sample` is the n-th.
#[must_use]
pub(crate) fn running_average(previous: f64, sample: f64, n: u32) -> f64 {
    if n == 0 {
        return sample;
    }
    let n = f64::from(n);
    (previous * (n - 1.0) + sample) / n
}

/// An observed `from -> to` edge with rolling statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopTransition {
    pub from_loop: String,
    pub to_loop: String,
    pub occurrences: u32,
    /// Fraction of occurrences where both endpoints succeeded.
    pub success_rate: f64,
    pub avg_gap_minutes: f64,
    /// Systems this edge was observed in.
    pub contexts: BTreeSet<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl LoopTransition {
    #[must_use]
    pub fn key(&self) -> TransitionKey {
        TransitionKey::new(&self.from_loop, &self.to_loop)
    }

    /// Historical strength used by the planner: `occurrences * successRate`.
    #[must_use]
    pub fn historical_score(&self) -> f64 {
        f64::from(self.occurrences) * self.success_rate
    }

    /// True if the edge touches `loop_id` on either end.
    #[must_use]
    pub fn touches(&self, loop_id: &str) -> bool {
        self.from_loop == loop_id || self.to_loop == loop_id
    }
}

/// Systems and modules a sequence was observed in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceContexts {
    pub systems: BTreeSet<String>,
    pub modules: BTreeSet<String>,
}

/// A recurring ordered run of loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopSequence {
    pub id: String,
    pub loops: Vec<String>,
    pub occurrences: u32,
    /// Minutes from the first start to the last completion.
    pub avg_total_duration: f64,
    /// Fraction of occurrences where every step succeeded.
    pub success_rate: f64,
    pub contexts: SequenceContexts,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl LoopSequence {
    #[must_use]
    pub fn contains(&self, loop_id: &str) -> bool {
        self.loops.iter().any(|l| l == loop_id)
    }

    /// True if one of the two loop lists is a contiguous run inside the other.
    #[must_use]
    pub fn overlaps(&self, loops: &[String]) -> bool {
        is_contiguous_subslice(loops, &self.loops) || is_contiguous_subslice(&self.loops, loops)
    }

    /// Loops joined with arrows, for display.
    #[must_use]
    pub fn label(&self) -> String {
        self.loops.join(" → ")
    }
}

fn is_contiguous_subslice(needle: &[String], haystack: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Historical evidence for the step into a move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvidence {
    pub success_rate: f64,
    pub avg_gap_minutes: f64,
    pub occurrences: u32,
}

impl From<&LoopTransition> for TransitionEvidence {
    fn from(transition: &LoopTransition) -> Self {
        Self {
            success_rate: transition.success_rate,
            avg_gap_minutes: transition.avg_gap_minutes,
            occurrences: transition.occurrences,
        }
    }
}

/// One step of a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineMove {
    /// 1-indexed.
    pub position: usize,
    #[serde(rename = "loop")]
    pub loop_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub leverage: f64,
    pub estimated_duration: f64,
    pub cumulative_leverage: f64,
    pub cumulative_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_from_previous: Option<TransitionEvidence>,
}

/// What a flagged concern is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskKind {
    LowSuccessRate,
    NoHistoricalData,
    LongDuration,
    ConfidenceDecay,
}

impl std::fmt::Display for RiskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowSuccessRate => write!(f, "low-success-rate"),
            Self::NoHistoricalData => write!(f, "no-historical-data"),
            Self::LongDuration => write!(f, "long-duration"),
            Self::ConfidenceDecay => write!(f, "confidence-decay"),
        }
    }
}

/// A flagged concern about a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRisk {
    pub kind: RiskKind,
    /// Move the risk applies to; `None` for line-wide risks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub message: String,
}

/// A historically observed move that could replace the chosen one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAlternative {
    pub position: usize,
    pub instead_of: String,
    #[serde(rename = "loop")]
    pub loop_id: String,
    pub occurrences: u32,
    pub success_rate: f64,
}

/// A generated multi-move plan. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: String,
    pub moves: Vec<LineMove>,
    pub total_moves: usize,
    pub compound_leverage: f64,
    /// Minutes.
    pub expected_duration: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub risks: Vec<LineRisk>,
    pub alternatives: Vec<LineAlternative>,
    pub based_on_sequences: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl Line {
    /// Loop identifiers in move order.
    #[must_use]
    pub fn loops(&self) -> Vec<&str> {
        self.moves.iter().map(|m| m.loop_id.as_str()).collect()
    }

    #[must_use]
    pub fn has_risk(&self, kind: RiskKind) -> bool {
        self.risks.iter().any(|r| r.kind == kind)
    }
}

/// Kind of structural observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightKind {
    FrequentPair,
    CommonStarter,
    CommonFinisher,
    HubLoop,
    IsolatedLoop,
    SuccessPattern,
}

impl std::fmt::Display for InsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrequentPair => write!(f, "frequent-pair"),
            Self::CommonStarter => write!(f, "common-starter"),
            Self::CommonFinisher => write!(f, "common-finisher"),
            Self::HubLoop => write!(f, "hub-loop"),
            Self::IsolatedLoop => write!(f, "isolated-loop"),
            Self::SuccessPattern => write!(f, "success-pattern"),
        }
    }
}

/// A typed, scored observation about the transition graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceInsight {
    pub kind: InsightKind,
    pub loops: Vec<String>,
    pub description: String,
    /// In [0, 1].
    pub significance: f64,
}

/// Snapshot produced by one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceAnalysis {
    pub runs_analyzed: usize,
    pub loops_analyzed: usize,
    pub transitions_analyzed: usize,
    pub sequences_analyzed: usize,
    pub top_transitions: Vec<LoopTransition>,
    pub top_sequences: Vec<LoopSequence>,
    pub insights: Vec<SequenceInsight>,
    pub analyzed_at: DateTime<Utc>,
}
