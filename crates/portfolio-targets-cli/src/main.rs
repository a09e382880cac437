mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::constraints::{BoundsArgs, SectorsArgs};
use commands::optimize::OptimizeArgs;

/// Constrained target portfolio allocation
#[derive(Parser)]
#[command(
    name = "ptargets",
    version,
    about = "Constrained target portfolio allocation",
    long_about = "Computes target weights for a portfolio by blending a constrained \
                  mean-variance optimization with hierarchical risk parity, honouring \
                  per-security locks, concentration caps and country/industry targets."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full blended optimization on a portfolio snapshot
    Optimize(OptimizeArgs),
    /// Show the per-security weight bounds derived from the snapshot
    Bounds(BoundsArgs),
    /// Show the country and industry constraints derived from the snapshot
    Sectors(SectorsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Optimize(args) => commands::optimize::run_optimize(args),
        Commands::Bounds(args) => commands::constraints::run_bounds(args),
        Commands::Sectors(args) => commands::constraints::run_sectors(args),
        Commands::Version => {
            println!("ptargets {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
