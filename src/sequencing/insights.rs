//! Structural observations derived from the transition and sequence tables.
//!
//! Pure derivation: nothing here mutates the tables, and empty tables yield
//! an empty list.

use std::collections::{BTreeMap, BTreeSet};

use super::types::{InsightKind, SequenceInsight, SequenceTable, TransitionTable};
use crate::config::AnalysisConfig;

const ISOLATED_SIGNIFICANCE: f64 = 0.2;

/// Generate insights sorted by descending significance.
#[must_use]
pub fn generate_insights(
    transitions: &TransitionTable,
    sequences: &SequenceTable,
    min_occurrences: u32,
) -> Vec<SequenceInsight> {
    InsightGenerator::new(min_occurrences).generate(transitions, sequences)
}

/// Insight rules with an occurrence floor and per-rule limits.
#[derive(Debug, Clone)]
pub struct InsightGenerator {
    min_occurrences: u32,
    frequent_pair_limit: usize,
    endpoint_limit: usize,
    hub_min_degree: usize,
    success_pattern_min_rate: f64,
    success_pattern_limit: usize,
    observed_loops: Option<BTreeSet<String>>,
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl InsightGenerator {
    /// Default limits with the given occurrence floor.
    #[must_use]
    pub fn new(min_occurrences: u32) -> Self {
        Self {
            min_occurrences,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            min_occurrences: config.min_occurrences,
            frequent_pair_limit: config.frequent_pair_limit,
            endpoint_limit: config.endpoint_limit,
            hub_min_degree: config.hub_min_degree,
            success_pattern_min_rate: config.success_pattern_min_rate,
            success_pattern_limit: config.success_pattern_limit,
            observed_loops: None,
        }
    }

    /// Enable isolated-loop detection against the loops seen in history.
    #[must_use]
    pub fn with_observed_loops(mut self, loops: BTreeSet<String>) -> Self {
        self.observed_loops = Some(loops);
        self
    }

    #[must_use]
    pub fn generate(
        &self,
        transitions: &TransitionTable,
        sequences: &SequenceTable,
    ) -> Vec<SequenceInsight> {
        let mut insights = Vec::new();
        insights.extend(self.frequent_pairs(transitions));
        insights.extend(self.endpoints(transitions, InsightKind::CommonStarter));
        insights.extend(self.endpoints(transitions, InsightKind::CommonFinisher));
        insights.extend(self.hubs(transitions));
        insights.extend(self.isolated(transitions));
        insights.extend(self.success_patterns(sequences));

        // Stable sort keeps rule order among equal scores.
        insights.sort_by(|a, b| b.significance.total_cmp(&a.significance));
        insights
    }

    fn frequent_pairs(&self, transitions: &TransitionTable) -> Vec<SequenceInsight> {
        let mut frequent: Vec<_> = transitions
            .values()
            .filter(|t| t.occurrences >= self.min_occurrences)
            .collect();
        frequent.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));

        frequent
            .into_iter()
            .take(self.frequent_pair_limit)
            .map(|t| SequenceInsight {
                kind: InsightKind::FrequentPair,
                loops: vec![t.from_loop.clone(), t.to_loop.clone()],
                description: format!(
                    "{} is followed by {} {} times ({:.0}% success)",
                    t.from_loop,
                    t.to_loop,
                    t.occurrences,
                    t.success_rate * 100.0
                ),
                significance: (f64::from(t.occurrences) / 10.0).min(1.0) * t.success_rate,
            })
            .collect()
    }

    fn endpoints(&self, transitions: &TransitionTable, kind: InsightKind) -> Vec<SequenceInsight> {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for t in transitions.values() {
            let loop_id = match kind {
                InsightKind::CommonStarter => t.from_loop.as_str(),
                _ => t.to_loop.as_str(),
            };
            *counts.entry(loop_id).or_insert(0) += t.occurrences;
        }

        let mut ranked: Vec<_> = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.min_occurrences)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        ranked
            .into_iter()
            .take(self.endpoint_limit)
            .map(|(loop_id, count)| {
                let description = match kind {
                    InsightKind::CommonStarter => {
                        format!("{} leads into other loops {} times", loop_id, count)
                    }
                    _ => format!("{} follows other loops {} times", loop_id, count),
                };
                SequenceInsight {
                    kind,
                    loops: vec![loop_id.to_string()],
                    description,
                    significance: (f64::from(count) / 20.0).min(1.0),
                }
            })
            .collect()
    }

    fn hubs(&self, transitions: &TransitionTable) -> Vec<SequenceInsight> {
        let mut incoming: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut outgoing: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for t in transitions.values() {
            outgoing
                .entry(t.from_loop.as_str())
                .or_default()
                .insert(t.to_loop.as_str());
            incoming
                .entry(t.to_loop.as_str())
                .or_default()
                .insert(t.from_loop.as_str());
        }

        outgoing
            .iter()
            .filter_map(|(loop_id, outs)| {
                let ins = incoming.get(loop_id).map_or(0, BTreeSet::len);
                let outs = outs.len();
                (ins >= self.hub_min_degree && outs >= self.hub_min_degree).then(|| SequenceInsight {
                    kind: InsightKind::HubLoop,
                    loops: vec![loop_id.to_string()],
                    description: format!(
                        "{} is a hub: {} loops lead into it and it leads into {}",
                        loop_id, ins, outs
                    ),
                    significance: ((ins + outs) as f64 / 10.0).min(1.0),
                })
            })
            .collect()
    }

    fn isolated(&self, transitions: &TransitionTable) -> Vec<SequenceInsight> {
        let Some(observed) = &self.observed_loops else {
            return Vec::new();
        };

        observed
            .iter()
            .filter(|loop_id| !transitions.values().any(|t| t.touches(loop_id)))
            .map(|loop_id| SequenceInsight {
                kind: InsightKind::IsolatedLoop,
                loops: vec![loop_id.clone()],
                description: format!("{} never chains with another loop", loop_id),
                significance: ISOLATED_SIGNIFICANCE,
            })
            .collect()
    }

    fn success_patterns(&self, sequences: &SequenceTable) -> Vec<SequenceInsight> {
        let mut patterns: Vec<_> = sequences
            .values()
            .filter(|s| {
                s.success_rate >= self.success_pattern_min_rate && s.occurrences >= self.min_occurrences
            })
            .collect();
        patterns.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));

        patterns
            .into_iter()
            .take(self.success_pattern_limit)
            .map(|s| SequenceInsight {
                kind: InsightKind::SuccessPattern,
                loops: s.loops.clone(),
                description: format!(
                    "{} succeeded {:.0}% of {} times",
                    s.label(),
                    s.success_rate * 100.0,
                    s.occurrences
                ),
                significance: s.success_rate * (f64::from(s.occurrences) / 5.0).min(1.0),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{sequence_with, transition_with};

    fn table(entries: &[(&str, &str, u32, f64)]) -> TransitionTable {
        entries
            .iter()
            .map(|(from, to, occ, rate)| {
                let t = transition_with(from, to, *occ, *rate);
                (t.key(), t)
            })
            .collect()
    }

    #[test]
    fn test_empty_tables_yield_nothing() {
        let insights = generate_insights(&TransitionTable::new(), &SequenceTable::new(), 2);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_frequent_pair_significance() {
        let transitions = table(&[("a", "b", 5, 0.8), ("c", "d", 1, 1.0)]);
        let insights = generate_insights(&transitions, &SequenceTable::new(), 2);

        let pairs: Vec<_> = insights
            .iter()
            .filter(|i| i.kind == InsightKind::FrequentPair)
            .collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].loops, vec!["a", "b"]);
        assert!((pairs[0].significance - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_frequent_pairs_capped_at_five() {
        let transitions = table(&[
            ("a", "b", 9, 1.0),
            ("b", "c", 8, 1.0),
            ("c", "d", 7, 1.0),
            ("d", "e", 6, 1.0),
            ("e", "f", 5, 1.0),
            ("f", "g", 4, 1.0),
        ]);
        let insights = generate_insights(&transitions, &SequenceTable::new(), 2);
        let pairs = insights
            .iter()
            .filter(|i| i.kind == InsightKind::FrequentPair)
            .count();
        assert_eq!(pairs, 5);
    }

    #[test]
    fn test_starters_and_finishers_sum_occurrences() {
        let transitions = table(&[("a", "b", 6, 1.0), ("a", "c", 4, 1.0), ("d", "c", 1, 1.0)]);
        let insights = generate_insights(&transitions, &SequenceTable::new(), 2);

        let starter = insights
            .iter()
            .find(|i| i.kind == InsightKind::CommonStarter)
            .unwrap();
        assert_eq!(starter.loops, vec!["a"]);
        assert!((starter.significance - 0.5).abs() < 1e-9);

        let finishers: Vec<_> = insights
            .iter()
            .filter(|i| i.kind == InsightKind::CommonFinisher)
            .map(|i| i.loops[0].as_str())
            .collect();
        assert_eq!(finishers, vec!["b", "c"]);
    }

    #[test]
    fn test_hub_counts_distinct_partners_not_occurrences() {
        let transitions = table(&[
            ("x1", "hub", 1, 1.0),
            ("x2", "hub", 1, 1.0),
            ("x3", "hub", 1, 1.0),
            ("hub", "y1", 1, 1.0),
            ("hub", "y2", 1, 1.0),
            ("hub", "y3", 1, 1.0),
            ("busy", "z", 50, 1.0),
        ]);
        let insights = generate_insights(&transitions, &SequenceTable::new(), 100);

        let hubs: Vec<_> = insights
            .iter()
            .filter(|i| i.kind == InsightKind::HubLoop)
            .collect();
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0].loops, vec!["hub"]);
        assert!((hubs[0].significance - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_success_patterns() {
        let mut sequences = SequenceTable::new();
        for s in [
            sequence_with(&["a", "b", "c"], 10, 0.95),
            sequence_with(&["b", "c", "d"], 2, 1.0),
            sequence_with(&["c", "d", "e"], 8, 0.5),
        ] {
            sequences.insert(s.loops.clone(), s);
        }

        let insights = generate_insights(&TransitionTable::new(), &sequences, 2);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::SuccessPattern);
        assert_eq!(insights[0].loops, vec!["a", "b", "c"]);
        assert!((insights[0].significance - 0.95).abs() < 1e-9);
        assert!((insights[1].significance - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_isolated_loops_need_observed_set() {
        let transitions = table(&[("a", "b", 3, 1.0)]);
        let observed: BTreeSet<String> = ["a", "b", "lonely"].iter().map(|s| s.to_string()).collect();

        let without = InsightGenerator::new(2).generate(&transitions, &SequenceTable::new());
        assert!(without.iter().all(|i| i.kind != InsightKind::IsolatedLoop));

        let with = InsightGenerator::new(2)
            .with_observed_loops(observed)
            .generate(&transitions, &SequenceTable::new());
        let isolated: Vec<_> = with
            .iter()
            .filter(|i| i.kind == InsightKind::IsolatedLoop)
            .collect();
        assert_eq!(isolated.len(), 1);
        assert_eq!(isolated[0].loops, vec!["lonely"]);
    }

    #[test]
    fn test_sorted_by_significance_and_repeatable() {
        let transitions = table(&[("a", "b", 12, 1.0), ("b", "c", 3, 0.5)]);
        let first = generate_insights(&transitions, &SequenceTable::new(), 2);
        let second = generate_insights(&transitions, &SequenceTable::new(), 2);

        assert_eq!(first, second);
        assert!(first
            .windows(2)
            .all(|w| w[0].significance >= w[1].significance));
    }

    #[test]
    fn test_limits_and_thresholds_follow_config() {
        let config = AnalysisConfig {
            min_occurrences: 100,
            frequent_pair_limit: 1,
            hub_min_degree: 2,
            success_pattern_min_rate: 0.5,
            ..AnalysisConfig::default()
        };
        let transitions = table(&[
            ("x1", "hub", 150, 1.0),
            ("x2", "hub", 120, 1.0),
            ("hub", "y1", 1, 1.0),
            ("hub", "y2", 1, 1.0),
        ]);
        let mut sequences = SequenceTable::new();
        let pattern = sequence_with(&["c", "d", "e"], 100, 0.5);
        sequences.insert(pattern.loops.clone(), pattern);

        fn kinds(insights: &[SequenceInsight], kind: InsightKind) -> usize {
            insights.iter().filter(|i| i.kind == kind).count()
        }

        let defaults = InsightGenerator::new(100).generate(&transitions, &sequences);
        assert_eq!(kinds(&defaults, InsightKind::FrequentPair), 2);
        assert_eq!(kinds(&defaults, InsightKind::HubLoop), 0);
        assert_eq!(kinds(&defaults, InsightKind::SuccessPattern), 0);

        let tuned = InsightGenerator::from_config(&config).generate(&transitions, &sequences);
        assert_eq!(kinds(&tuned, InsightKind::FrequentPair), 1);
        assert_eq!(kinds(&tuned, InsightKind::HubLoop), 1);
        assert_eq!(kinds(&tuned, InsightKind::SuccessPattern), 1);
    }
}
