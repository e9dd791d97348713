//! Mock implementations of the sequencer's collaborators.
//!
//! These mocks provide controllable test doubles for the history source, the
//! leverage ranking and the observer seam, enabling deterministic tests.

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::history::{HistoryQuery, HistoryReader, RunRecord};
use crate::leverage::{LeverageScore, LeverageSource};
use crate::sequencing::{SequencingEvent, SequencingObserver};

/// Mock history source.
///
/// Clones share their call log, so a test can keep one handle and hand the
/// other to the sequencer.
///
/// # Example
///
/// ```rust,ignore
/// let history = MockHistoryReader::new().with_runs(runs);
/// let sequencer = LoopSequencer::builder(store).history(history.clone()).build()?;
/// assert_eq!(history.calls(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHistoryReader {
    runs: Vec<RunRecord>,
    error: Option<String>,
    calls: Arc<AtomicU32>,
    last_query: Arc<Mutex<Option<HistoryQuery>>>,
}

impl MockHistoryReader {
    /// Create a mock with no runs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the runs to return. The query bounds are still applied.
    #[must_use]
    pub fn with_runs(mut self, runs: Vec<RunRecord>) -> Self {
        self.runs = runs;
        self
    }

    /// Configure every read to fail.
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Number of reads so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The query passed to the most recent read.
    #[must_use]
    pub fn last_query(&self) -> Option<HistoryQuery> {
        self.last_query
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

impl HistoryReader for MockHistoryReader {
    fn read_runs(&self, query: &HistoryQuery) -> Result<Vec<RunRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_query.lock() {
            *last = Some(query.clone());
        }
        if let Some(error) = &self.error {
            bail!("{}", error);
        }
        Ok(query.apply(self.runs.clone()))
    }
}

/// Mock leverage ranking.
#[derive(Debug, Clone, Default)]
pub struct MockLeverageSource {
    ranking: Vec<LeverageScore>,
    error: Option<String>,
}

impl MockLeverageSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ranking(mut self, ranking: Vec<LeverageScore>) -> Self {
        self.ranking = ranking;
        self
    }

    /// Configure the ranking to be unavailable.
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

impl LeverageSource for MockLeverageSource {
    fn ranking(&self) -> Result<Vec<LeverageScore>> {
        match &self.error {
            Some(error) => bail!("{}", error),
            None => Ok(self.ranking.clone()),
        }
    }
}

/// Observer that records every event it sees.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<SequencingEvent>>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far, in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<SequencingEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Event names so far, in delivery order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(SequencingEvent::name).collect()
    }
}

impl SequencingObserver for RecordingObserver {
    fn on_event(&self, event: &SequencingEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
