//! Status summary for the textual dashboard.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::types::LoopTransition;

/// Counts plus the strongest transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencingStatus {
    pub transitions: usize,
    pub sequences: usize,
    pub lines: usize,
    pub last_analysis_at: Option<DateTime<Utc>>,
    pub top_transitions: Vec<LoopTransition>,
}

impl SequencingStatus {
    /// Render the dashboard as printable text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = Vec::new();
        out.push(format!("\n{} Loop Sequencing", "Status:".cyan().bold()));
        out.push("─".repeat(60));

        let analyzed = self
            .last_analysis_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        out.push(format!("   Last analysis: {}", analyzed));
        out.push(format!(
            "   Transitions: {} | Sequences: {} | Lines: {}",
            self.transitions, self.sequences, self.lines
        ));

        if self.top_transitions.is_empty() {
            out.push(format!(
                "\n   {} No transitions recorded yet. Run `loopline analyze`.",
                "Note:".yellow()
            ));
        } else {
            out.push(format!("\n{}", "Top transitions".bold()));
            for (i, t) in self.top_transitions.iter().enumerate() {
                out.push(format!(
                    "{} {} → {}  {}x, {:.0}% success, ~{:.0}m gap",
                    format!("[{}]", i + 1).bright_blue(),
                    t.from_loop,
                    t.to_loop,
                    t.occurrences,
                    t.success_rate * 100.0,
                    t.avg_gap_minutes
                ));
            }
        }

        out.push("─".repeat(60));
        out.join("\n")
    }
}
