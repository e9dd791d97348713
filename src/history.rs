//! Execution history consumed by the miners.
//!
//! The sequencer only needs read access to finished runs. [`HistoryReader`]
//! is the seam; [`JsonlHistoryReader`] is the file-backed implementation the
//! CLI uses.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Success,
    Failure,
    /// Anything else the history source reports (cancelled, partial, ...).
    #[serde(other)]
    Other,
}

impl RunOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One finished loop execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(rename = "loop")]
    pub loop_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub outcome: RunOutcome,
}

impl RunRecord {
    /// Create a run record without a module.
    #[must_use]
    pub fn new(
        system: impl Into<String>,
        loop_id: impl Into<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        outcome: RunOutcome,
    ) -> Self {
        Self {
            system: system.into(),
            module: None,
            loop_id: loop_id.into(),
            started_at,
            completed_at,
            outcome,
        }
    }

    /// Set the module the run worked on.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Bounds on how much history an analysis reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Maximum number of most recent runs.
    pub limit: usize,
    /// Earliest `started_at` to include.
    pub since: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit, since: None }
    }

    #[must_use]
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Apply the bounds to an in-memory run list.
    ///
    /// Keeps runs started at or after `since`, then the `limit` most recent,
    /// returned oldest first.
    #[must_use]
    pub fn apply(&self, mut runs: Vec<RunRecord>) -> Vec<RunRecord> {
        if let Some(since) = self.since {
            runs.retain(|run| run.started_at >= since);
        }
        runs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        if runs.len() > self.limit {
            runs.drain(..runs.len() - self.limit);
        }
        runs
    }
}

/// Source of execution history.
///
/// # Example
///
/// ```rust,ignore
/// use loopline::history::{HistoryQuery, HistoryReader};
///
/// fn recent(reader: &dyn HistoryReader) -> anyhow::Result<usize> {
///     Ok(reader.read_runs(&HistoryQuery::new(500))?.len())
/// }
/// ```
pub trait HistoryReader {
    /// Read finished runs within the query bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying history cannot be read.
    fn read_runs(&self, query: &HistoryQuery) -> Result<Vec<RunRecord>>;
}

/// Reads run records from a JSONL file, one record per line.
#[derive(Debug, Clone)]
pub struct JsonlHistoryReader {
    path: PathBuf,
}

impl JsonlHistoryReader {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryReader for JsonlHistoryReader {
    fn read_runs(&self, query: &HistoryQuery) -> Result<Vec<RunRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open history file {}", self.path.display()))?;
        let reader = BufReader::new(file);

        let mut runs = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read history file")?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RunRecord>(&line) {
                Ok(run) => runs.push(run),
                Err(e) => debug!("Skipping malformed history line {}: {}", index + 1, e),
            }
        }

        Ok(query.apply(runs))
    }
}

/// Group runs by system, each group sorted by start time.
#[must_use]
pub fn group_by_system(runs: &[RunRecord]) -> BTreeMap<String, Vec<RunRecord>> {
    let mut grouped: BTreeMap<String, Vec<RunRecord>> = BTreeMap::new();
    for run in runs {
        grouped
            .entry(run.system.clone())
            .or_default()
            .push(run.clone());
    }
    for system_runs in grouped.values_mut() {
        system_runs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::io::Write;
    use tempfile::TempDir;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn run(system: &str, loop_id: &str, start: i64) -> RunRecord {
        RunRecord::new(system, loop_id, at(start), at(start + 30), RunOutcome::Success)
    }

    #[test]
    fn test_outcome_parses_unknown_as_other() {
        let outcome: RunOutcome = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(outcome, RunOutcome::Other);
        let outcome: RunOutcome = serde_json::from_str("\"success\"").unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn test_run_record_wire_shape() {
        let json = r#"{"system":"api","module":"auth","loop":"bugfix-loop","started_at":"2026-03-01T09:00:00Z","completed_at":"2026-03-01T09:30:00Z","outcome":"failure"}"#;
        let run: RunRecord = serde_json::from_str(json).unwrap();
        assert_eq!(run.loop_id, "bugfix-loop");
        assert_eq!(run.module.as_deref(), Some("auth"));
        assert!(!run.succeeded());
    }

    #[test]
    fn test_query_applies_since_and_limit() {
        let runs = vec![run("a", "x", 30), run("a", "y", 0), run("a", "z", 60)];

        let recent = HistoryQuery::new(2).apply(runs.clone());
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].loop_id, "x");
        assert_eq!(recent[1].loop_id, "z");

        let bounded = HistoryQuery::new(10).with_since(at(30)).apply(runs);
        assert_eq!(bounded.len(), 2);
        assert_eq!(bounded[0].loop_id, "x");
    }

    #[test]
    fn test_group_by_system_sorts_each_group() {
        let runs = vec![run("b", "late", 90), run("a", "only", 10), run("b", "early", 0)];
        let grouped = group_by_system(&runs);

        assert_eq!(grouped.len(), 2);
        let b: Vec<_> = grouped["b"].iter().map(|r| r.loop_id.as_str()).collect();
        assert_eq!(b, vec!["early", "late"]);
    }

    #[test]
    fn test_jsonl_reader_skips_malformed_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("runs.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}", serde_json::to_string(&run("a", "x", 0)).unwrap()).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", serde_json::to_string(&run("a", "y", 40)).unwrap()).unwrap();

        let runs = JsonlHistoryReader::new(&path)
            .read_runs(&HistoryQuery::new(500))
            .unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn test_jsonl_reader_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let reader = JsonlHistoryReader::new(temp.path().join("absent.jsonl"));
        let err = reader.read_runs(&HistoryQuery::new(10)).unwrap_err();
        assert!(err.to_string().contains("absent.jsonl"));
    }
}
