use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use countdown_plugins::pipeline::VideoPhase;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "countdown", version, about = "Top 5 countdown video pipeline")]
pub struct Args {
    /// Config file; skips the default search order
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the phase table and the waves a successful run launches
    Plan(PlanArgs),
    /// Build the pipeline and check the phase table
    Validate,
    /// Run the pipeline against simulated collaborators
    Simulate(SimulateArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    /// Emit the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SimulateArgs {
    /// Make the collaborator behind this phase fail (e.g. render_video)
    #[arg(long, value_parser = parse_phase)]
    pub fail_phase: Option<VideoPhase>,

    /// Simulated latency of every collaborator call
    #[arg(long, default_value_t = 50)]
    pub latency_ms: u64,

    /// Event output; defaults to `executor.output` from config
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Cap on phases in flight at once
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,
}

fn parse_phase(s: &str) -> Result<VideoPhase, String> {
    s.parse()
}
