mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sequava",
    about = "Task compiler and dispatcher for pump/valve command sequences",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a task for structural errors and device conflicts
    Validate {
        /// Task file (.yaml or .json)
        #[arg(long)]
        task: PathBuf,

        /// Device registry file (.yaml or .json)
        #[arg(long)]
        devices: PathBuf,
    },

    /// Estimate a task's wall-clock duration, with a per-step breakdown
    Estimate {
        #[arg(long)]
        task: PathBuf,
    },

    /// Flatten a task into its command timeline
    Compile {
        #[arg(long)]
        task: PathBuf,

        #[arg(long)]
        devices: PathBuf,
    },

    /// Validate, compile, and execute a task against the logging sink
    Run {
        #[arg(long)]
        task: PathBuf,

        #[arg(long)]
        devices: PathBuf,

        /// Operator duration estimate in ms, logged alongside the compiled figure
        #[arg(long)]
        hint_ms: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Validate { task, devices } => cmd::validate::run(&task, &devices, cli.json),
        Commands::Estimate { task } => cmd::estimate::run(&task, cli.json),
        Commands::Compile { task, devices } => cmd::compile::run(&task, &devices, cli.json),
        Commands::Run {
            task,
            devices,
            hint_ms,
        } => cmd::run::run(&task, &devices, hint_ms, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
