//! Lifecycle notifications.
//!
//! Callers that care about completion register a [`SequencingObserver`] with
//! the sequencer builder. Events are delivered synchronously, in registration
//! order, after the state they describe has been saved.

use serde::Serialize;

/// A lifecycle event emitted by the sequencer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SequencingEvent {
    /// State was loaded and the sequencer is ready.
    Initialized {
        transitions: usize,
        sequences: usize,
        lines: usize,
    },
    /// An analysis run finished and its snapshot was stored.
    AnalysisComplete {
        runs_analyzed: usize,
        transitions: usize,
        sequences: usize,
        insights: usize,
    },
    /// A line was generated and stored.
    LineGenerated {
        line_id: String,
        total_moves: usize,
        confidence: f64,
    },
}

impl SequencingEvent {
    /// Short event name, matching the serialized tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "initialized",
            Self::AnalysisComplete { .. } => "analysis-complete",
            Self::LineGenerated { .. } => "line-generated",
        }
    }
}

/// Receives sequencing lifecycle events.
pub trait SequencingObserver {
    fn on_event(&self, event: &SequencingEvent);
}

impl<F> SequencingObserver for F
where
    F: Fn(&SequencingEvent),
{
    fn on_event(&self, event: &SequencingEvent) {
        self(event);
    }
}
