//! The sequencer: analysis, line generation and the query surface.
//!
//! Collaborators are injected through [`LoopSequencerBuilder`]. The history
//! source is mandatory, so an analysis can never run against a missing
//! source. Every mutating operation saves the full state before notifying
//! observers.
//!
//! Calls are single-writer: a deployment must serialize `analyze_history`
//! and `generate_line` per dataset.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{info, warn};

use super::events::{SequencingEvent, SequencingObserver};
use super::insights::InsightGenerator;
use super::planner::{LinePlanner, LineRequest};
use super::sequences::SequenceMiner;
use super::status::SequencingStatus;
use super::store::{SequencingState, SequencingStore};
use super::transitions::TransitionMiner;
use super::types::{
    Line, LoopSequence, LoopTransition, SequenceAnalysis, SequenceInsight, TransitionKey,
};
use crate::config::SequencingConfig;
use crate::error::{IntoSequencingError, Result, SequencingError};
use crate::history::{group_by_system, HistoryQuery, HistoryReader};
use crate::leverage::{KeywordLoopResolver, LeverageSource, LeverageTable, LoopResolver};

const STATUS_TOP_TRANSITIONS: usize = 5;

/// Options for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Overrides the configured history limit.
    pub limit: Option<usize>,
    /// Earliest run start to include.
    pub since: Option<DateTime<Utc>>,
}

/// Filter for [`LoopSequencer::transitions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionFilter {
    pub min_occurrences: Option<u32>,
    /// Keep transitions touching this loop on either end.
    pub loop_id: Option<String>,
}

/// Filter for [`LoopSequencer::sequences`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceFilter {
    pub min_occurrences: Option<u32>,
    pub containing: Option<String>,
}

/// Wires collaborators into a [`LoopSequencer`].
pub struct LoopSequencerBuilder {
    store: SequencingStore,
    config: SequencingConfig,
    history: Option<Box<dyn HistoryReader>>,
    leverage: Option<Box<dyn LeverageSource>>,
    resolver: Option<Box<dyn LoopResolver>>,
    observers: Vec<Box<dyn SequencingObserver>>,
}

impl LoopSequencerBuilder {
    #[must_use]
    pub fn new(store: SequencingStore) -> Self {
        Self {
            store,
            config: SequencingConfig::default(),
            history: None,
            leverage: None,
            resolver: None,
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: SequencingConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn history(mut self, history: impl HistoryReader + 'static) -> Self {
        self.history = Some(Box::new(history));
        self
    }

    #[must_use]
    pub fn leverage(mut self, leverage: impl LeverageSource + 'static) -> Self {
        self.leverage = Some(Box::new(leverage));
        self
    }

    /// Replace the keyword resolver built from configuration.
    #[must_use]
    pub fn resolver(mut self, resolver: impl LoopResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: impl SequencingObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Validate configuration, load state and emit `Initialized`.
    ///
    /// # Errors
    ///
    /// Returns [`SequencingError::MissingCollaborator`] without a history
    /// source, or [`SequencingError::InvalidConfig`] for bad tunables.
    pub fn build(self) -> Result<LoopSequencer> {
        let history = self
            .history
            .ok_or_else(|| SequencingError::missing_collaborator("history source"))?;
        self.config.validate()?;

        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => Box::new(KeywordLoopResolver::from_config(&self.config.planner)?),
        };

        let state = self.store.load();
        let sequencer = LoopSequencer {
            config: self.config,
            store: self.store,
            history,
            leverage: self.leverage,
            resolver,
            observers: self.observers,
            state,
        };

        info!(
            "Sequencer ready: {} transitions, {} sequences, {} lines",
            sequencer.state.transitions.len(),
            sequencer.state.sequences.len(),
            sequencer.state.lines.len()
        );
        sequencer.notify(&SequencingEvent::Initialized {
            transitions: sequencer.state.transitions.len(),
            sequences: sequencer.state.sequences.len(),
            lines: sequencer.state.lines.len(),
        });
        Ok(sequencer)
    }
}

/// Transition/sequence mining and line planning over persisted state.
pub struct LoopSequencer {
    config: SequencingConfig,
    store: SequencingStore,
    history: Box<dyn HistoryReader>,
    leverage: Option<Box<dyn LeverageSource>>,
    resolver: Box<dyn LoopResolver>,
    observers: Vec<Box<dyn SequencingObserver>>,
    state: SequencingState,
}

impl LoopSequencer {
    /// Start wiring a sequencer around a store.
    #[must_use]
    pub fn builder(store: SequencingStore) -> LoopSequencerBuilder {
        LoopSequencerBuilder::new(store)
    }

    #[must_use]
    pub fn config(&self) -> &SequencingConfig {
        &self.config
    }

    /// Mine the history into the transition and sequence tables.
    ///
    /// Accumulation is additive: analysing overlapping history twice counts
    /// it twice.
    ///
    /// # Errors
    ///
    /// Returns [`SequencingError::History`] if the history source fails, or
    /// an error if the state cannot be saved.
    pub fn analyze_history(&mut self, options: &AnalyzeOptions) -> Result<SequenceAnalysis> {
        let analysis_config = &self.config.analysis;
        let mut query = HistoryQuery::new(options.limit.unwrap_or(analysis_config.history_limit));
        query.since = options.since;

        let runs = self.history.read_runs(&query).into_sequencing_history()?;
        info!("Analyzing {} runs", runs.len());

        let by_system = group_by_system(&runs);
        let observed_loops: BTreeSet<String> = runs.iter().map(|r| r.loop_id.clone()).collect();

        // Mine into a copy so a failed save leaves the live tables untouched.
        let mut next = self.state.clone();
        TransitionMiner::new(analysis_config.transition_window())
            .record_transitions(&mut next.transitions, &by_system);

        let sequence_miner = SequenceMiner::new(
            analysis_config.sequence_window(),
            analysis_config.min_sequence_length..=analysis_config.max_sequence_length,
        );
        for system_runs in by_system.values() {
            sequence_miner.detect_sequences(&mut next.sequences, system_runs);
        }

        let insights = InsightGenerator::from_config(analysis_config)
            .with_observed_loops(observed_loops.clone())
            .generate(&next.transitions, &next.sequences);

        let top_n = analysis_config.top_n;
        let analysis = SequenceAnalysis {
            runs_analyzed: runs.len(),
            loops_analyzed: observed_loops.len(),
            transitions_analyzed: next.transitions.len(),
            sequences_analyzed: next.sequences.len(),
            top_transitions: ranked_transitions(&next).into_iter().take(top_n).cloned().collect(),
            top_sequences: ranked_sequences(&next).into_iter().take(top_n).cloned().collect(),
            insights,
            analyzed_at: Utc::now(),
        };

        next.last_analysis = Some(analysis.clone());
        next.last_updated = analysis.analyzed_at;
        self.store.save(&next)?;
        self.state = next;

        info!(
            "Analysis complete: {} transitions, {} sequences, {} insights",
            analysis.transitions_analyzed,
            analysis.sequences_analyzed,
            analysis.insights.len()
        );
        self.notify(&SequencingEvent::AnalysisComplete {
            runs_analyzed: analysis.runs_analyzed,
            transitions: analysis.transitions_analyzed,
            sequences: analysis.sequences_analyzed,
            insights: analysis.insights.len(),
        });
        Ok(analysis)
    }

    /// Plan a line, store it and return it.
    ///
    /// # Errors
    ///
    /// Returns [`SequencingError::NoStartingLoop`] if no seed move exists, or
    /// an error if the state cannot be saved.
    pub fn generate_line(&mut self, request: &LineRequest) -> Result<Line> {
        let retention = self.config.store.retention().ok_or_else(|| {
            SequencingError::invalid_config(
                "store",
                format!(
                    "lineRetentionDays is too large: {}",
                    self.config.store.line_retention_days
                ),
            )
        })?;
        let leverage = LeverageTable::new(self.fetch_ranking(), self.config.planner.neutral_leverage);

        let line = LinePlanner::new(
            &self.config.planner,
            &self.state.transitions,
            &self.state.sequences,
            &leverage,
            self.resolver.as_ref(),
        )
        .generate_line(request)?;

        let now = Utc::now();
        let mut next = self.state.clone();
        next.lines.push(line.clone());
        let pruned = next.prune_lines(retention, self.config.store.max_stored_lines, now);
        if pruned > 0 {
            info!("Pruned {} stored lines", pruned);
        }
        next.last_updated = now;
        self.store.save(&next)?;
        self.state = next;

        info!(
            "Generated line {} with {} moves (confidence {:.2})",
            line.id, line.total_moves, line.confidence
        );
        self.notify(&SequencingEvent::LineGenerated {
            line_id: line.id.clone(),
            total_moves: line.total_moves,
            confidence: line.confidence,
        });
        Ok(line)
    }

    /// Insights over the current tables. Does not touch stored state.
    #[must_use]
    pub fn insights(&self) -> Vec<SequenceInsight> {
        InsightGenerator::from_config(&self.config.analysis)
            .generate(&self.state.transitions, &self.state.sequences)
    }

    /// Transitions matching the filter, most frequent first.
    #[must_use]
    pub fn transitions(&self, filter: &TransitionFilter) -> Vec<&LoopTransition> {
        ranked_transitions(&self.state)
            .into_iter()
            .filter(|t| filter.min_occurrences.map_or(true, |min| t.occurrences >= min))
            .filter(|t| filter.loop_id.as_deref().map_or(true, |l| t.touches(l)))
            .collect()
    }

    #[must_use]
    pub fn transition(&self, from: &str, to: &str) -> Option<&LoopTransition> {
        self.state.transitions.get(&TransitionKey::new(from, to))
    }

    /// Sequences matching the filter, most frequent first.
    #[must_use]
    pub fn sequences(&self, filter: &SequenceFilter) -> Vec<&LoopSequence> {
        ranked_sequences(&self.state)
            .into_iter()
            .filter(|s| filter.min_occurrences.map_or(true, |min| s.occurrences >= min))
            .filter(|s| filter.containing.as_deref().map_or(true, |l| s.contains(l)))
            .collect()
    }

    #[must_use]
    pub fn sequence(&self, id: &str) -> Option<&LoopSequence> {
        self.state.sequences.values().find(|s| s.id == id)
    }

    /// Stored lines, newest first.
    #[must_use]
    pub fn lines(&self, limit: Option<usize>) -> Vec<&Line> {
        self.state
            .lines
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Look up a stored line.
    ///
    /// # Errors
    ///
    /// Returns [`SequencingError::UnknownLine`] if no line has this id.
    pub fn line(&self, id: &str) -> Result<&Line> {
        self.state
            .lines
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| SequencingError::UnknownLine { id: id.to_string() })
    }

    #[must_use]
    pub fn last_analysis(&self) -> Option<&SequenceAnalysis> {
        self.state.last_analysis.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> SequencingStatus {
        SequencingStatus {
            transitions: self.state.transitions.len(),
            sequences: self.state.sequences.len(),
            lines: self.state.lines.len(),
            last_analysis_at: self.state.last_analysis.as_ref().map(|a| a.analyzed_at),
            top_transitions: ranked_transitions(&self.state)
                .into_iter()
                .take(STATUS_TOP_TRANSITIONS)
                .cloned()
                .collect(),
        }
    }

    fn fetch_ranking(&self) -> Option<Vec<crate::leverage::LeverageScore>> {
        let source = self.leverage.as_ref()?;
        match source.ranking() {
            Ok(ranking) => Some(ranking),
            Err(e) => {
                warn!("Leverage source unavailable, planning from history only: {:#}", e);
                None
            }
        }
    }

    fn notify(&self, event: &SequencingEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

/// Transitions most frequent first.
fn ranked_transitions(state: &SequencingState) -> Vec<&LoopTransition> {
    let mut ranked: Vec<_> = state.transitions.values().collect();
    ranked.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    ranked
}

fn ranked_sequences(state: &SequencingState) -> Vec<&LoopSequence> {
    let mut ranked: Vec<_> = state.sequences.values().collect();
    ranked.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    ranked
}
