//! loopline - loop transition mining and line planning
//!
//! Learns which loops tend to follow which from execution history and plans
//! multi-move lines over what it learned.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use loopline::history::JsonlHistoryReader;
use loopline::leverage::JsonLeverageSource;
use loopline::sequencing::{
    AnalyzeOptions, Line, LineRequest, LoopSequencer, LoopSequencerBuilder, SequenceAnalysis,
    SequenceFilter, SequencingStore, TransitionFilter,
};
use loopline::SequencingConfig;

#[derive(Parser)]
#[command(name = "loopline")]
#[command(version)]
#[command(about = "Mine loop transitions from run history and plan multi-move lines", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine transitions and sequences from run history
    Analyze {
        /// History file (defaults to .loopline/runs.jsonl)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Maximum number of most recent runs to read
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only runs started at or after this RFC 3339 timestamp
        #[arg(long, value_parser = parse_timestamp)]
        since: Option<DateTime<Utc>>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plan a multi-move line
    Line {
        /// Loop to start from
        #[arg(short, long)]
        start: Option<String>,

        /// Target the line works toward
        #[arg(short, long)]
        target: Option<String>,

        /// Maximum number of moves
        #[arg(short, long)]
        depth: Option<usize>,

        /// Leverage ranking file (defaults to .loopline/leverage.json if present)
        #[arg(long)]
        leverage: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List learned transitions
    Transitions {
        /// Minimum occurrences
        #[arg(long)]
        min: Option<u32>,

        /// Only transitions into or out of this loop
        #[arg(long = "loop")]
        loop_id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List learned sequences
    Sequences {
        /// Minimum occurrences
        #[arg(long)]
        min: Option<u32>,

        /// Only sequences containing this loop
        #[arg(long)]
        containing: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List generated lines, newest first
    Lines {
        /// Show only the last N lines
        #[arg(long)]
        last: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one generated line
    ShowLine {
        /// Line id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show structural insights over the learned tables
    Insights {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the sequencing dashboard
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or validate configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the settings file
    Validate,

    /// Show data file paths
    Paths,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "loopline=debug,info"
    } else {
        "loopline=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Resolve project path
    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    if !project_path.exists() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project_path.display()
        );
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command, &project_path) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn sequencer_builder(
    project_path: &Path,
    history: Option<PathBuf>,
) -> loopline::Result<LoopSequencerBuilder> {
    let config = SequencingConfig::load(project_path)?;
    let history_path =
        history.unwrap_or_else(|| SequencingConfig::history_path(project_path));

    Ok(LoopSequencer::builder(SequencingStore::new(project_path))
        .config(config)
        .history(JsonlHistoryReader::new(history_path)))
}

fn open(project_path: &Path) -> loopline::Result<LoopSequencer> {
    sequencer_builder(project_path, None)?.build()
}

fn print_json<T: serde::Serialize>(value: &T) -> loopline::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Commands, project_path: &Path) -> loopline::Result<()> {
    match command {
        Commands::Analyze {
            history,
            limit,
            since,
            json,
        } => {
            let mut sequencer = sequencer_builder(project_path, history)?.build()?;
            let analysis = sequencer.analyze_history(&AnalyzeOptions { limit, since })?;

            if json {
                print_json(&analysis)?;
            } else {
                print_analysis(&analysis);
            }
        }

        Commands::Line {
            start,
            target,
            depth,
            leverage,
            json,
        } => {
            let mut builder = sequencer_builder(project_path, None)?;
            let leverage_path = leverage
                .unwrap_or_else(|| SequencingConfig::leverage_path(project_path));
            if leverage_path.exists() {
                builder = builder.leverage(JsonLeverageSource::new(leverage_path));
            }
            let mut sequencer = builder.build()?;

            let request = LineRequest {
                starting_loop: start,
                target,
                depth,
            };
            let line = sequencer.generate_line(&request)?;

            if json {
                print_json(&line)?;
            } else {
                print_line(&line);
            }
        }

        Commands::Transitions { min, loop_id, json } => {
            let sequencer = open(project_path)?;
            let transitions = sequencer.transitions(&TransitionFilter {
                min_occurrences: min,
                loop_id,
            });

            if json {
                print_json(&transitions)?;
            } else if transitions.is_empty() {
                println!("{} No transitions recorded", "Info:".blue());
            } else {
                println!("\n{} Loop Transitions", "Transitions:".cyan().bold());
                println!("{}", "─".repeat(60));
                for t in transitions {
                    println!(
                        "   {} → {}  {}x, {:.0}% success, ~{:.0}m gap, {} system(s)",
                        t.from_loop.bold(),
                        t.to_loop.bold(),
                        t.occurrences,
                        t.success_rate * 100.0,
                        t.avg_gap_minutes,
                        t.contexts.len()
                    );
                }
            }
        }

        Commands::Sequences {
            min,
            containing,
            json,
        } => {
            let sequencer = open(project_path)?;
            let sequences = sequencer.sequences(&SequenceFilter {
                min_occurrences: min,
                containing,
            });

            if json {
                print_json(&sequences)?;
            } else if sequences.is_empty() {
                println!("{} No sequences recorded", "Info:".blue());
            } else {
                println!("\n{} Loop Sequences", "Sequences:".cyan().bold());
                println!("{}", "─".repeat(60));
                for s in sequences {
                    println!(
                        "   {}  {}x, {:.0}% success, ~{:.0}m total",
                        s.label().bold(),
                        s.occurrences,
                        s.success_rate * 100.0,
                        s.avg_total_duration
                    );
                    println!("      {}", s.id.dimmed());
                }
            }
        }

        Commands::Lines { last, json } => {
            let sequencer = open(project_path)?;
            let lines = sequencer.lines(last);

            if json {
                print_json(&lines)?;
            } else if lines.is_empty() {
                println!("{} No lines generated yet", "Info:".blue());
            } else {
                println!("\n{} Generated Lines", "Lines:".cyan().bold());
                println!("{}", "─".repeat(60));
                for line in lines {
                    println!(
                        "   {}  {}  ({} moves, confidence {:.0}%)",
                        line.generated_at.format("%Y-%m-%d %H:%M"),
                        line.loops().join(" → "),
                        line.total_moves,
                        line.confidence * 100.0
                    );
                    println!("      {}", line.id.dimmed());
                }
            }
        }

        Commands::ShowLine { id, json } => {
            let sequencer = open(project_path)?;
            let line = sequencer.line(&id)?;

            if json {
                print_json(line)?;
            } else {
                print_line(line);
            }
        }

        Commands::Insights { json } => {
            let sequencer = open(project_path)?;
            let insights = sequencer.insights();

            if json {
                print_json(&insights)?;
            } else if insights.is_empty() {
                println!("{} Not enough history for insights yet", "Info:".blue());
            } else {
                println!("\n{} Sequence Insights", "Insights:".cyan().bold());
                println!("{}", "─".repeat(60));
                for insight in insights {
                    println!(
                        "   [{}] {} ({:.2})",
                        insight.kind.to_string().yellow(),
                        insight.description,
                        insight.significance
                    );
                }
            }
        }

        Commands::Status { json } => {
            let status = open(project_path)?.status();

            if json {
                print_json(&status)?;
            } else {
                println!("{}", status.render());
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                let config = SequencingConfig::load(project_path)?;

                if json {
                    print_json(&config)?;
                } else {
                    println!("\n{} Sequencing Configuration", "Config:".cyan().bold());
                    println!("{}", "─".repeat(40));
                    println!(
                        "   Transition window: {}h",
                        config.analysis.transition_window_hours
                    );
                    println!(
                        "   Sequence window: {}h (lengths {}..={})",
                        config.analysis.sequence_window_hours,
                        config.analysis.min_sequence_length,
                        config.analysis.max_sequence_length
                    );
                    println!("   History limit: {}", config.analysis.history_limit);
                    println!(
                        "   Weights: leverage {} / history {}",
                        config.planner.leverage_weight, config.planner.history_weight
                    );
                    println!("   Decay factor: {}", config.planner.decay_factor);
                    println!("   Default depth: {}", config.planner.default_depth);
                    println!("   Loop rules: {}", config.planner.loop_rules.len());
                    println!(
                        "   Line retention: {} lines, {} days",
                        config.store.max_stored_lines, config.store.line_retention_days
                    );
                }
            }

            ConfigAction::Validate => {
                let settings_path = SequencingConfig::settings_path(project_path);

                if !settings_path.exists() {
                    println!(
                        "{} settings.json not found (using defaults)",
                        "Info:".blue()
                    );
                }

                let config = SequencingConfig::load(project_path)?;
                config.validate()?;
                loopline::leverage::KeywordLoopResolver::from_config(&config.planner)?;
                println!("{} configuration is valid", "OK".green());

                let history_path = SequencingConfig::history_path(project_path);
                if history_path.exists() {
                    println!("{} runs.jsonl found", "OK".green());
                } else {
                    println!("{} runs.jsonl not found", "Warning:".yellow());
                }
            }

            ConfigAction::Paths => {
                println!("\n{} Data Paths", "Config:".cyan().bold());
                println!("{}", "─".repeat(40));
                println!(
                    "   Settings: {}",
                    SequencingConfig::settings_path(project_path).display()
                );
                println!(
                    "   History: {}",
                    SequencingConfig::history_path(project_path).display()
                );
                println!(
                    "   Leverage: {}",
                    SequencingConfig::leverage_path(project_path).display()
                );
                println!(
                    "   State: {}",
                    SequencingStore::new(project_path).state_path().display()
                );
            }
        },
    }

    Ok(())
}

fn print_analysis(analysis: &SequenceAnalysis) {
    println!("\n{} History Analysis", "Analysis:".cyan().bold());
    println!("{}", "─".repeat(60));
    println!(
        "   Runs: {} | Loops: {} | Transitions: {} | Sequences: {}",
        analysis.runs_analyzed,
        analysis.loops_analyzed,
        analysis.transitions_analyzed,
        analysis.sequences_analyzed
    );

    if !analysis.top_transitions.is_empty() {
        println!("\n{}", "Top transitions".bold());
        for t in &analysis.top_transitions {
            println!(
                "   {} → {}  {}x, {:.0}% success",
                t.from_loop, t.to_loop, t.occurrences, t.success_rate * 100.0
            );
        }
    }

    if !analysis.top_sequences.is_empty() {
        println!("\n{}", "Top sequences".bold());
        for s in &analysis.top_sequences {
            println!("   {}  {}x", s.label(), s.occurrences);
        }
    }

    if !analysis.insights.is_empty() {
        println!("\n{}", "Insights".bold());
        for insight in &analysis.insights {
            println!("   [{}] {}", insight.kind.to_string().yellow(), insight.description);
        }
    }
}

fn print_line(line: &Line) {
    println!("\n{} {}", "Line:".cyan().bold(), line.id);
    println!("{}", "─".repeat(60));

    for m in &line.moves {
        let target = m
            .target
            .as_deref()
            .map(|t| format!(" on {}", t))
            .unwrap_or_default();
        println!(
            "   {} {}{}  leverage {:.1}, ~{:.0}m",
            format!("{}.", m.position).bright_blue(),
            m.loop_id.bold(),
            target,
            m.leverage,
            m.estimated_duration
        );
    }

    println!(
        "\n   Compound leverage: {:.1} | Duration: ~{:.0}m | Confidence: {:.0}%",
        line.compound_leverage,
        line.expected_duration,
        line.confidence * 100.0
    );
    println!("   {}", line.reasoning);

    for risk in &line.risks {
        println!("   {} {}", "Risk:".yellow(), risk.message);
    }
    for alt in &line.alternatives {
        println!(
            "   {} move {}: {} instead of {} ({}x, {:.0}% success)",
            "Alt:".dimmed(),
            alt.position,
            alt.loop_id,
            alt.instead_of,
            alt.occurrences,
            alt.success_rate * 100.0
        );
    }
}

