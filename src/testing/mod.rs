//! Testing infrastructure for loopline.
//!
//! This module provides mocks, fixtures, and assertions for testing the
//! sequencer without real history files or leverage rankings.
//!
//! # Architecture
//!
//! - **Mocks**: Test doubles for the history source, leverage source and observer seams
//! - **Fixtures**: Pre-built runs, transitions, sequences and lines (test-only)
//! - **Assertions**: Structural checks over generated lines
//!
//! # Example
//!
//! ```rust,ignore
//! use loopline::testing::{MockHistoryReader, RecordingObserver};
//!
//! let history = MockHistoryReader::new().with_runs(runs);
//! let observer = RecordingObserver::new();
//! let sequencer = LoopSequencer::builder(store)
//!     .history(history)
//!     .observer(observer.clone())
//!     .build()?;
//! ```

pub mod assertions;
#[cfg(test)]
pub mod fixtures;
pub mod mocks;

// Re-export commonly used types
pub use assertions::*;
#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;
