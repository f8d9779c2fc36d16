mod cmd_analyze;
mod cmd_community;
mod cmd_probe;
mod cmd_profile;
mod cmd_rules;
mod input;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vibe_core::AnalysisConfig;

#[derive(Parser)]
#[command(name = "vibe", version, about = "Commit-history personas for AI-assisted development")]
struct Cli {
    /// Config file (YAML or JSON). Defaults to the user config if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Alternative persona rule table (YAML or JSON)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score one repository's commits and pick a persona
    Analyze {
        /// Commit list as JSON (`-` for stdin)
        input: PathBuf,
        /// Repository name (defaults to the input file stem)
        #[arg(long)]
        repo: Option<String>,
        /// Override the episode idle gap, in hours
        #[arg(long)]
        episode_gap_hours: Option<f64>,
        /// Emit a stored summary record instead of the full analysis
        #[arg(long)]
        summary: bool,
        /// Job id stamped on the summary (defaults to a digest of the input)
        #[arg(long)]
        job_id: Option<String>,
    },
    /// Merge stored repo summaries into one profile
    Profile {
        /// Summary list as JSON (`-` for stdin)
        input: PathBuf,
    },
    /// Roll up opted-in profiles into community statistics
    Community {
        /// Snapshot list as JSON (`-` for stdin)
        input: PathBuf,
        /// Minimum cohort size before anything is published
        #[arg(long)]
        threshold: Option<usize>,
    },
    /// Sweep the axis space and report rule coverage
    Probe {
        /// Grid step for swept axes
        #[arg(long)]
        step: Option<u8>,
        /// Maximum fallback vectors to keep
        #[arg(long)]
        sample_limit: Option<usize>,
        /// Pin an axis to one value, e.g. `automation_intensity=80` (repeatable)
        #[arg(long = "fix")]
        fixed: Vec<String>,
        /// Live user axes (JSON) to cross-reference against the fallback
        #[arg(long)]
        users: Option<PathBuf>,
    },
    /// Show the active rule table, its digest and shadowed rules
    Rules {
        /// Exit with an error if any rule is shadowed
        #[arg(long)]
        strict: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VIBE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AnalysisConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let table = input::load_rules(cli.rules.as_deref())?;

    match cli.cmd {
        Command::Analyze {
            input,
            repo,
            episode_gap_hours,
            summary,
            job_id,
        } => cmd_analyze::execute(
            &cmd_analyze::AnalyzeParams {
                input: &input,
                repo: repo.as_deref(),
                episode_gap_hours,
                summary,
                job_id: job_id.as_deref(),
            },
            &config,
            &table,
        ),
        Command::Profile { input } => cmd_profile::execute(&input, &config, &table),
        Command::Community { input, threshold } => {
            cmd_community::execute(&input, threshold, &config)
        }
        Command::Probe {
            step,
            sample_limit,
            fixed,
            users,
        } => cmd_probe::execute(
            &cmd_probe::ProbeParams {
                step,
                sample_limit,
                fixed: &fixed,
                users: users.as_deref(),
            },
            &config,
            &table,
        ),
        Command::Rules { strict } => cmd_rules::execute(&table, strict),
    }
}
