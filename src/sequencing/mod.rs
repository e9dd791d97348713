//! Loop transition and sequence mining, and multi-move line planning.
//!
//! The pipeline is:
//!
//! ```text
//! history ──> TransitionMiner ──> transition table ─┐
//!        └──> SequenceMiner   ──> sequence table  ──┼──> InsightGenerator
//!                                                   └──> LinePlanner ──> Line
//! ```
//!
//! [`LoopSequencer`] owns the tables, persists them through
//! [`SequencingStore`] and notifies [`SequencingObserver`]s.

pub mod events;
pub mod insights;
pub mod planner;
pub mod sequencer;
pub mod sequences;
pub mod status;
pub mod store;
pub mod transitions;
pub mod types;

pub use events::{SequencingEvent, SequencingObserver};
pub use insights::{generate_insights, InsightGenerator};
pub use planner::{LinePlanner, LineRequest};
pub use sequencer::{
    AnalyzeOptions, LoopSequencer, LoopSequencerBuilder, SequenceFilter, TransitionFilter,
};
pub use sequences::SequenceMiner;
pub use status::SequencingStatus;
pub use store::{SequencingState, SequencingStore, STATE_FILENAME, STATE_VERSION};
pub use transitions::TransitionMiner;
pub use types::{
    InsightKind, Line, LineAlternative, LineMove, LineRisk, LoopSequence, LoopTransition,
    RiskKind, SequenceAnalysis, SequenceContexts, SequenceInsight, SequenceTable,
    TransitionEvidence, TransitionKey, TransitionTable,
};
