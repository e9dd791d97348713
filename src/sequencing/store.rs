//! Sequencing state persistence layer.
//!
//! The whole state is one JSON document, rewritten atomically on every save.
//! Loading never fails: a missing, unreadable, corrupt or incompatible
//! document yields an empty state so the system can always cold-start.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{
    Line, LoopSequence, LoopTransition, SequenceAnalysis, SequenceTable, TransitionTable,
};
use crate::config::DATA_DIR;

/// Current schema version for the sequencing document.
pub const STATE_VERSION: u32 = 1;

/// Minimum supported version for backward compatibility.
pub const MIN_STATE_VERSION: u32 = 1;

/// Default filename for the sequencing document.
pub const STATE_FILENAME: &str = "sequencing.json";

/// In-memory sequencing state.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencingState {
    pub transitions: TransitionTable,
    pub sequences: SequenceTable,
    /// Oldest first.
    pub lines: Vec<Line>,
    pub last_analysis: Option<SequenceAnalysis>,
    pub last_updated: DateTime<Utc>,
}

impl Default for SequencingState {
    fn default() -> Self {
        Self {
            transitions: TransitionTable::new(),
            sequences: SequenceTable::new(),
            lines: Vec::new(),
            last_analysis: None,
            last_updated: Utc::now(),
        }
    }
}

impl SequencingState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.sequences.is_empty() && self.lines.is_empty()
    }

    /// Drop lines older than `max_age`, then keep only the newest `max_lines`.
    ///
    /// The newest line always survives, whatever its age or the capacity.
    /// Returns the number of lines removed.
    pub fn prune_lines(&mut self, max_age: Duration, max_lines: usize, now: DateTime<Utc>) -> usize {
        let Some(newest) = self.lines.pop() else {
            return 0;
        };
        let before = self.lines.len() + 1;

        self.lines.retain(|line| now - line.generated_at <= max_age);
        let keep = max_lines.max(1) - 1;
        if self.lines.len() > keep {
            let excess = self.lines.len() - keep;
            self.lines.drain(..excess);
        }
        self.lines.push(newest);
        before - self.lines.len()
    }
}

/// Persisted shape of [`SequencingState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencingDocument {
    version: u32,
    #[serde(default)]
    transitions: Vec<LoopTransition>,
    #[serde(default)]
    sequences: Vec<LoopSequence>,
    #[serde(default)]
    generated_lines: Vec<Line>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_analysis: Option<SequenceAnalysis>,
    last_updated: DateTime<Utc>,
}

impl SequencingDocument {
    /// Returns the schema version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Checks if the version is compatible.
    #[must_use]
    pub fn is_compatible_version(&self) -> bool {
        self.version >= MIN_STATE_VERSION && self.version <= STATE_VERSION
    }
}

impl From<&SequencingState> for SequencingDocument {
    fn from(state: &SequencingState) -> Self {
        Self {
            version: STATE_VERSION,
            transitions: state.transitions.values().cloned().collect(),
            sequences: state.sequences.values().cloned().collect(),
            generated_lines: state.lines.clone(),
            last_analysis: state.last_analysis.clone(),
            last_updated: state.last_updated,
        }
    }
}

impl From<SequencingDocument> for SequencingState {
    fn from(document: SequencingDocument) -> Self {
        Self {
            transitions: document
                .transitions
                .into_iter()
                .map(|t| (t.key(), t))
                .collect(),
            sequences: document
                .sequences
                .into_iter()
                .map(|s| (s.loops.clone(), s))
                .collect(),
            lines: document.generated_lines,
            last_analysis: document.last_analysis,
            last_updated: document.last_updated,
        }
    }
}

/// Persistence layer for the sequencing document.
#[derive(Debug, Clone)]
pub struct SequencingStore {
    /// Directory holding the document.
    dir: PathBuf,
}

impl SequencingStore {
    /// Creates a store under `<project_dir>/.loopline`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(project_dir: P) -> Self {
        Self::in_dir(project_dir.as_ref().join(DATA_DIR))
    }

    /// Creates a store writing directly into `dir`.
    #[must_use]
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the path to the document.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILENAME)
    }

    /// Saves the full state, replacing any previous document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, state: &SequencingState) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let temp_path = self.dir.join(format!("{}.tmp", STATE_FILENAME));
        let state_path = self.state_path();

        let json = serde_json::to_string_pretty(&SequencingDocument::from(state))?;
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &state_path)?;

        debug!(
            "Saved sequencing state ({} transitions, {} sequences, {} lines)",
            state.transitions.len(),
            state.sequences.len(),
            state.lines.len()
        );
        Ok(())
    }

    /// Loads the state, or an empty one when nothing usable is on disk.
    #[must_use]
    pub fn load(&self) -> SequencingState {
        let state_path = self.state_path();

        if !state_path.exists() {
            return SequencingState::default();
        }

        let content = match std::fs::read_to_string(&state_path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read sequencing state, starting fresh: {}", e);
                return SequencingState::default();
            }
        };

        let document: SequencingDocument = match serde_json::from_str(&content) {
            Ok(d) => d,
            Err(e) => {
                warn!("Sequencing state is corrupted, starting fresh: {}", e);
                return SequencingState::default();
            }
        };

        if !document.is_compatible_version() {
            warn!(
                "Sequencing state version {} is incompatible, starting fresh",
                document.version
            );
            return SequencingState::default();
        }

        document.into()
    }

    /// Checks if the document exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }
}
