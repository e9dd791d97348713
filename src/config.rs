//! Configuration management for loopline.
//!
//! Every threshold the miners and the planner use is a named field here so a
//! deployment can tune it from `.loopline/settings.json` without a rebuild.

use crate::error::{IntoSequencingError, Result, SequencingError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory (relative to the project) holding settings and state.
pub const DATA_DIR: &str = ".loopline";

/// Loop chosen when no rule matches a target.
pub const ENGINEERING_LOOP: &str = "engineering-loop";

/// Loop chosen for bug/fix targets by the default rules.
pub const BUGFIX_LOOP: &str = "bugfix-loop";

/// A keyword rule mapping a target identifier to a loop.
///
/// # Example settings.json
///
/// ```json
/// {
///   "planner": {
///     "loopRules": [
///       { "pattern": "(?i)bug|fix", "loop": "bugfix-loop" },
///       { "pattern": "(?i)docs?", "loop": "docs-loop" }
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoopRule {
    /// Regex matched against the target identifier.
    pub pattern: String,
    /// Loop to run when the pattern matches.
    #[serde(rename = "loop")]
    pub loop_id: String,
}

impl LoopRule {
    #[must_use]
    pub fn new(pattern: impl Into<String>, loop_id: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            loop_id: loop_id.into(),
        }
    }
}

fn default_leverage_weight() -> f64 {
    0.6
}

fn default_history_weight() -> f64 {
    0.4
}

fn default_decay_factor() -> f64 {
    0.85
}

fn default_depth() -> usize {
    5
}

fn default_neutral_leverage() -> f64 {
    5.0
}

fn default_min_duration() -> f64 {
    15.0
}

fn default_duration() -> f64 {
    60.0
}

fn default_loop_durations() -> BTreeMap<String, f64> {
    [(ENGINEERING_LOOP.to_string(), 60.0), (BUGFIX_LOOP.to_string(), 30.0)]
        .into_iter()
        .collect()
}

fn default_no_data_penalty() -> f64 {
    0.7
}

fn default_sequence_match_boost() -> f64 {
    1.1
}

fn default_low_success_threshold() -> f64 {
    0.5
}

fn default_long_duration() -> f64 {
    240.0
}

fn default_multi_move_risk_after() -> usize {
    3
}

fn default_alternative_steps() -> usize {
    2
}

fn default_alternatives_per_step() -> usize {
    2
}

fn default_loop_rules() -> Vec<LoopRule> {
    vec![LoopRule::new("(?i)bug|fix", BUGFIX_LOOP)]
}

fn default_loop() -> String {
    ENGINEERING_LOOP.to_string()
}

/// Tunables for line planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Weight of single-step leverage in the blended candidate score (default: 0.6).
    #[serde(default = "default_leverage_weight")]
    pub leverage_weight: f64,

    /// Weight of `occurrences * successRate` in the blended score (default: 0.4).
    #[serde(default = "default_history_weight")]
    pub history_weight: f64,

    /// Per-move discount on leverage contributions (default: 0.85).
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Moves planned when the caller does not ask for a depth (default: 5).
    #[serde(default = "default_depth")]
    pub default_depth: usize,

    /// Leverage assumed when the ranking has nothing for a loop (default: 5.0).
    #[serde(default = "default_neutral_leverage")]
    pub neutral_leverage: f64,

    /// Floor for durations derived from observed gaps, in minutes (default: 15).
    #[serde(default = "default_min_duration")]
    pub min_duration_minutes: f64,

    /// Duration for loops with no history and no entry in `loopDurations`.
    #[serde(default = "default_duration")]
    pub default_duration_minutes: f64,

    /// Per-loop duration used when a loop has no observed transitions.
    #[serde(default = "default_loop_durations")]
    pub loop_durations: BTreeMap<String, f64>,

    /// Confidence multiplier for a step with no transition record (default: 0.7).
    #[serde(default = "default_no_data_penalty")]
    pub no_data_penalty: f64,

    /// Confidence multiplier when the line resembles a known sequence (default: 1.1).
    #[serde(default = "default_sequence_match_boost")]
    pub sequence_match_boost: f64,

    /// Steps below this transition success rate are flagged (default: 0.5).
    #[serde(default = "default_low_success_threshold")]
    pub low_success_threshold: f64,

    /// Lines longer than this many minutes are flagged (default: 240).
    #[serde(default = "default_long_duration")]
    pub long_duration_minutes: f64,

    /// Lines with more moves than this get a decay warning (default: 3).
    #[serde(default = "default_multi_move_risk_after")]
    pub multi_move_risk_after: usize,

    /// Number of extension steps that list alternatives (default: 2).
    #[serde(default = "default_alternative_steps")]
    pub alternative_steps: usize,

    /// Alternatives listed per step (default: 2).
    #[serde(default = "default_alternatives_per_step")]
    pub alternatives_per_step: usize,

    /// Keyword rules for mapping a ranked target to a loop.
    #[serde(default = "default_loop_rules")]
    pub loop_rules: Vec<LoopRule>,

    /// Loop used when no rule matches.
    #[serde(default = "default_loop")]
    pub default_loop: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            leverage_weight: default_leverage_weight(),
            history_weight: default_history_weight(),
            decay_factor: default_decay_factor(),
            default_depth: default_depth(),
            neutral_leverage: default_neutral_leverage(),
            min_duration_minutes: default_min_duration(),
            default_duration_minutes: default_duration(),
            loop_durations: default_loop_durations(),
            no_data_penalty: default_no_data_penalty(),
            sequence_match_boost: default_sequence_match_boost(),
            low_success_threshold: default_low_success_threshold(),
            long_duration_minutes: default_long_duration(),
            multi_move_risk_after: default_multi_move_risk_after(),
            alternative_steps: default_alternative_steps(),
            alternatives_per_step: default_alternatives_per_step(),
            loop_rules: default_loop_rules(),
            default_loop: default_loop(),
        }
    }
}

impl PlannerConfig {
    /// Default duration for a loop that has never been observed.
    #[must_use]
    pub fn duration_for(&self, loop_id: &str) -> f64 {
        self.loop_durations
            .get(loop_id)
            .copied()
            .unwrap_or(self.default_duration_minutes)
    }

    /// Validates the planner tunables.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first offending field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let non_negative = [
            ("leverageWeight", self.leverage_weight),
            ("historyWeight", self.history_weight),
            ("neutralLeverage", self.neutral_leverage),
            ("minDurationMinutes", self.min_duration_minutes),
            ("defaultDurationMinutes", self.default_duration_minutes),
            ("longDurationMinutes", self.long_duration_minutes),
        ];

        for (name, value) in non_negative {
            if !value.is_finite() {
                return Err(format!("{} is not a finite number", name));
            }
            if value < 0.0 {
                return Err(format!("{} is negative: {}", name, value));
            }
        }

        if self.leverage_weight + self.history_weight == 0.0 {
            return Err("leverageWeight and historyWeight are both zero".to_string());
        }

        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(format!(
                "decayFactor must be in (0, 1], got {}",
                self.decay_factor
            ));
        }

        let unit = [
            ("noDataPenalty", self.no_data_penalty),
            ("lowSuccessThreshold", self.low_success_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be in [0, 1], got {}", name, value));
            }
        }

        if !self.sequence_match_boost.is_finite() || self.sequence_match_boost < 1.0 {
            return Err(format!(
                "sequenceMatchBoost must be >= 1.0, got {}",
                self.sequence_match_boost
            ));
        }

        if self.default_depth == 0 {
            return Err("defaultDepth must be at least 1".to_string());
        }

        for (loop_id, minutes) in &self.loop_durations {
            if !minutes.is_finite() || *minutes < 0.0 {
                return Err(format!("loopDurations.{} is invalid: {}", loop_id, minutes));
            }
        }

        for rule in &self.loop_rules {
            if let Err(e) = regex::Regex::new(&rule.pattern) {
                return Err(format!("loopRules pattern '{}' is invalid: {}", rule.pattern, e));
            }
        }

        if self.default_loop.trim().is_empty() {
            return Err("defaultLoop is empty".to_string());
        }

        Ok(())
    }
}

fn default_transition_window() -> f64 {
    24.0
}

fn default_sequence_window() -> f64 {
    48.0
}

fn default_min_sequence_length() -> usize {
    3
}

fn default_max_sequence_length() -> usize {
    5
}

fn default_history_limit() -> usize {
    500
}

fn default_min_occurrences() -> u32 {
    2
}

fn default_top_n() -> usize {
    10
}

fn default_frequent_pair_limit() -> usize {
    5
}

fn default_endpoint_limit() -> usize {
    3
}

fn default_hub_min_degree() -> usize {
    3
}

fn default_success_pattern_min_rate() -> f64 {
    0.9
}

fn default_success_pattern_limit() -> usize {
    3
}

/// Tunables for history mining and insight generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Runs further apart than this are unrelated (default: 24 hours).
    #[serde(default = "default_transition_window")]
    pub transition_window_hours: f64,

    /// Windows spanning longer than this are not sequences (default: 48 hours).
    #[serde(default = "default_sequence_window")]
    pub sequence_window_hours: f64,

    /// Shortest sequence mined (default: 3).
    #[serde(default = "default_min_sequence_length")]
    pub min_sequence_length: usize,

    /// Longest sequence mined (default: 5).
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    /// Most recent runs read per analysis (default: 500).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Occurrence floor for insights (default: 2).
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: u32,

    /// Transitions and sequences kept in the analysis snapshot (default: 10).
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Most frequent-pair insights reported (default: 5).
    #[serde(default = "default_frequent_pair_limit")]
    pub frequent_pair_limit: usize,

    /// Most starter and finisher insights reported, each (default: 3).
    #[serde(default = "default_endpoint_limit")]
    pub endpoint_limit: usize,

    /// Distinct predecessors and successors a hub needs (default: 3).
    #[serde(default = "default_hub_min_degree")]
    pub hub_min_degree: usize,

    /// Success rate a sequence needs to count as a pattern (default: 0.9).
    #[serde(default = "default_success_pattern_min_rate")]
    pub success_pattern_min_rate: f64,

    /// Most success-pattern insights reported (default: 3).
    #[serde(default = "default_success_pattern_limit")]
    pub success_pattern_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            transition_window_hours: default_transition_window(),
            sequence_window_hours: default_sequence_window(),
            min_sequence_length: default_min_sequence_length(),
            max_sequence_length: default_max_sequence_length(),
            history_limit: default_history_limit(),
            min_occurrences: default_min_occurrences(),
            top_n: default_top_n(),
            frequent_pair_limit: default_frequent_pair_limit(),
            endpoint_limit: default_endpoint_limit(),
            hub_min_degree: default_hub_min_degree(),
            success_pattern_min_rate: default_success_pattern_min_rate(),
            success_pattern_limit: default_success_pattern_limit(),
        }
    }
}

impl AnalysisConfig {
    /// Transition window as a chrono duration.
    #[must_use]
    pub fn transition_window(&self) -> chrono::Duration {
        hours(self.transition_window_hours)
    }

    /// Sequence window as a chrono duration.
    #[must_use]
    pub fn sequence_window(&self) -> chrono::Duration {
        hours(self.sequence_window_hours)
    }

    /// Validates the analysis tunables.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first offending field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let windows = [
            ("transitionWindowHours", self.transition_window_hours),
            ("sequenceWindowHours", self.sequence_window_hours),
        ];
        for (name, value) in windows {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be a positive number, got {}", name, value));
            }
        }

        if self.min_sequence_length < 2 || self.max_sequence_length > 10 {
            return Err(format!(
                "sequence lengths must be within 2..=10, got {}..={}",
                self.min_sequence_length, self.max_sequence_length
            ));
        }
        if self.min_sequence_length > self.max_sequence_length {
            return Err(format!(
                "minSequenceLength ({}) exceeds maxSequenceLength ({})",
                self.min_sequence_length, self.max_sequence_length
            ));
        }

        if self.history_limit == 0 {
            return Err("historyLimit must be at least 1".to_string());
        }

        if self.hub_min_degree == 0 {
            return Err("hubMinDegree must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.success_pattern_min_rate) {
            return Err(format!(
                "successPatternMinRate must be within 0..=1, got {}",
                self.success_pattern_min_rate
            ));
        }

        Ok(())
    }
}

fn hours(value: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((value * 3_600_000.0).round() as i64)
}

fn default_max_stored_lines() -> usize {
    100
}

fn default_line_retention_days() -> i64 {
    30
}

/// Retention of generated lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Newest lines kept after pruning (default: 100).
    #[serde(default = "default_max_stored_lines")]
    pub max_stored_lines: usize,

    /// Lines older than this are pruned (default: 30 days).
    #[serde(default = "default_line_retention_days")]
    pub line_retention_days: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_stored_lines: default_max_stored_lines(),
            line_retention_days: default_line_retention_days(),
        }
    }
}

impl StoreConfig {
    /// Retention window as a chrono duration, `None` when out of range.
    #[must_use]
    pub fn retention(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_days(self.line_retention_days)
    }

    /// Validates the retention settings.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first offending field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_stored_lines == 0 {
            return Err("maxStoredLines must be at least 1".to_string());
        }
        if self.line_retention_days < 0 {
            return Err(format!(
                "lineRetentionDays is negative: {}",
                self.line_retention_days
            ));
        }
        if self.retention().is_none() {
            return Err(format!(
                "lineRetentionDays is too large: {}",
                self.line_retention_days
            ));
        }
        Ok(())
    }
}

/// Configuration loaded from `.loopline/settings.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequencingConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl SequencingConfig {
    /// Load configuration from a project directory.
    ///
    /// A missing settings file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or malformed.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let settings_path = Self::settings_path(project_dir);

        if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path).into_sequencing_config()?;
            let config: SequencingConfig = serde_json::from_str(&content).map_err(|e| {
                SequencingError::config_with_path(e.to_string(), settings_path.clone())
            })?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`SequencingError::InvalidConfig`] for the first bad section.
    pub fn validate(&self) -> Result<()> {
        self.analysis
            .validate()
            .map_err(|reason| SequencingError::invalid_config("analysis", reason))?;
        self.planner
            .validate()
            .map_err(|reason| SequencingError::invalid_config("planner", reason))?;
        self.store
            .validate()
            .map_err(|reason| SequencingError::invalid_config("store", reason))?;
        Ok(())
    }

    /// Get the data directory for a project
    pub fn data_dir(project_dir: &Path) -> PathBuf {
        project_dir.join(DATA_DIR)
    }

    /// Get the settings.json path for a project
    pub fn settings_path(project_dir: &Path) -> PathBuf {
        Self::data_dir(project_dir).join("settings.json")
    }

    /// Default location of the run history
    pub fn history_path(project_dir: &Path) -> PathBuf {
        Self::data_dir(project_dir).join("runs.jsonl")
    }

    /// Default location of the leverage ranking
    pub fn leverage_path(project_dir: &Path) -> PathBuf {
        Self::data_dir(project_dir).join("leverage.json")
    }
}
