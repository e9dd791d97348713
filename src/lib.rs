//! loopline - loop transition mining and line planning
//!
//! Learns from execution history which loops tend to follow which, detects
//! recurring multi-loop sequences, and plans ordered multi-move "lines" that
//! blend leverage with historical evidence.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`] - Tunables loaded from `.loopline/settings.json`
//! - [`error`] - Custom error types and handling
//! - [`history`] - Run records and the history source seam
//! - [`leverage`] - Leverage ranking seam and loop resolution
//! - [`sequencing`] - Miners, insights, the planner, the store and the sequencer
//! - [`testing`] - Testing infrastructure (mocks, fixtures, assertions)
//!
//! # Example
//!
//! ```rust,ignore
//! use loopline::history::JsonlHistoryReader;
//! use loopline::sequencing::{AnalyzeOptions, LineRequest, LoopSequencer, SequencingStore};
//!
//! let mut sequencer = LoopSequencer::builder(SequencingStore::new("."))
//!     .history(JsonlHistoryReader::new(".loopline/runs.jsonl"))
//!     .build()?;
//!
//! sequencer.analyze_history(&AnalyzeOptions::default())?;
//! let line = sequencer.generate_line(&LineRequest::new().starting_at("engineering-loop"))?;
//! println!("{}", line.reasoning);
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod leverage;
pub mod sequencing;
pub mod testing;

// Re-export commonly used types
pub use error::{IntoSequencingError, Result, SequencingError};

// Re-export config types
pub use config::{
    AnalysisConfig, LoopRule, PlannerConfig, SequencingConfig, StoreConfig, BUGFIX_LOOP, DATA_DIR,
    ENGINEERING_LOOP,
};

// Re-export collaborator seams
pub use history::{HistoryQuery, HistoryReader, JsonlHistoryReader, RunOutcome, RunRecord};
pub use leverage::{
    JsonLeverageSource, KeywordLoopResolver, LeverageScore, LeverageSource, LeverageTable,
    LoopResolver,
};

// Re-export sequencing types
pub use sequencing::{
    AnalyzeOptions, Line, LineRequest, LoopSequence, LoopSequencer, LoopTransition,
    SequenceAnalysis, SequenceInsight, SequencingEvent, SequencingObserver, SequencingStatus,
    SequencingStore,
};

// Re-export testing types for convenience
pub use testing::{MockHistoryReader, MockLeverageSource, RecordingObserver};
