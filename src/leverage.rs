//! Single-step leverage supplied by the roadmap collaborator.
//!
//! The planner treats the ranking as a black box. It must keep working when
//! the ranking is missing or the source fails, so everything here degrades to
//! a neutral score instead of erroring.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::PlannerConfig;
use crate::error::SequencingError;

/// Value of working on one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageScore {
    pub target_id: String,
    pub score: f64,
}

impl LeverageScore {
    #[must_use]
    pub fn new(target_id: impl Into<String>, score: f64) -> Self {
        Self {
            target_id: target_id.into(),
            score,
        }
    }
}

/// Source of the leverage ranking.
pub trait LeverageSource {
    /// Produce the current ranking. Order is not significant.
    ///
    /// # Errors
    ///
    /// Returns an error if the ranking cannot be computed; callers degrade to
    /// history-only planning.
    fn ranking(&self) -> Result<Vec<LeverageScore>>;
}

/// Reads a ranking from a JSON array of `{targetId, score}`.
#[derive(Debug, Clone)]
pub struct JsonLeverageSource {
    path: PathBuf,
}

impl JsonLeverageSource {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl LeverageSource for JsonLeverageSource {
    fn ranking(&self) -> Result<Vec<LeverageScore>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read leverage file {}", self.path.display()))?;
        let scores: Vec<LeverageScore> =
            serde_json::from_str(&content).context("Leverage file is not a ranking array")?;
        Ok(scores)
    }
}

/// A ranking resident in memory for the duration of one planning run.
#[derive(Debug, Clone)]
pub struct LeverageTable {
    ranked: Vec<LeverageScore>,
    neutral: f64,
}

impl LeverageTable {
    /// Build a table from an optional ranking, sorted best first.
    ///
    /// Non-finite scores are dropped.
    #[must_use]
    pub fn new(ranking: Option<Vec<LeverageScore>>, neutral: f64) -> Self {
        let mut ranked: Vec<LeverageScore> = ranking
            .unwrap_or_default()
            .into_iter()
            .filter(|s| s.score.is_finite())
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });
        Self { ranked, neutral }
    }

    /// A table with no ranking at all.
    #[must_use]
    pub fn unavailable(neutral: f64) -> Self {
        Self::new(None, neutral)
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.ranked.is_empty()
    }

    #[must_use]
    pub fn top(&self) -> Option<&LeverageScore> {
        self.ranked.first()
    }

    #[must_use]
    pub fn ranked(&self) -> &[LeverageScore] {
        &self.ranked
    }

    #[must_use]
    pub fn neutral(&self) -> f64 {
        self.neutral
    }

    /// Leverage of running `loop_id` toward `target`.
    ///
    /// An entry for the loop itself wins, then the entry for the target,
    /// then the neutral default.
    #[must_use]
    pub fn score_for(&self, loop_id: &str, target: Option<&str>) -> f64 {
        self.lookup(loop_id)
            .or_else(|| target.and_then(|t| self.lookup(t)))
            .unwrap_or(self.neutral)
    }

    fn lookup(&self, id: &str) -> Option<f64> {
        self.ranked
            .iter()
            .find(|s| s.target_id == id)
            .map(|s| s.score)
    }
}

/// Maps a ranked target identifier to the loop that should work on it.
pub trait LoopResolver {
    fn resolve(&self, target_id: &str) -> String;
}

/// Keyword rules from configuration, first match wins.
#[derive(Debug, Clone)]
pub struct KeywordLoopResolver {
    rules: Vec<(Regex, String)>,
    default_loop: String,
}

impl KeywordLoopResolver {
    /// Compile the rules in a planner configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SequencingError::InvalidConfig`] for a pattern that does not compile.
    pub fn from_config(config: &PlannerConfig) -> crate::Result<Self> {
        let mut rules = Vec::with_capacity(config.loop_rules.len());
        for rule in &config.loop_rules {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                SequencingError::invalid_config(
                    "planner.loopRules",
                    format!("'{}': {}", rule.pattern, e),
                )
            })?;
            rules.push((regex, rule.loop_id.clone()));
        }
        Ok(Self {
            rules,
            default_loop: config.default_loop.clone(),
        })
    }
}

impl LoopResolver for KeywordLoopResolver {
    fn resolve(&self, target_id: &str) -> String {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(target_id))
            .map(|(_, loop_id)| loop_id.clone())
            .unwrap_or_else(|| self.default_loop.clone())
    }
}
