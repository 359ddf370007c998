//! Grove CLI - Command-line interface for evolving expression trees.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Grove - tree-based genetic programming for symbolic regression
#[derive(Parser, Debug)]
#[command(name = "grove")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evolve a population described by a JSON run file
    Evolve {
        /// Run file (.json)
        #[arg(required = true)]
        run: std::path::PathBuf,

        /// Random seed (overrides the run file)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of generations (overrides the run file)
        #[arg(short, long)]
        generations: Option<usize>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,

        /// Suppress per-generation output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run the built-in three-sample regression problem
    Demo {
        /// Random seed (default: 12345)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Suppress per-generation output
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command {
        Commands::Evolve {
            run,
            seed,
            generations,
            format,
            progress,
            quiet,
        } => cli::evolve::execute(&run, seed, generations, format, progress, quiet),

        Commands::Demo {
            seed,
            format,
            quiet,
        } => cli::demo::execute(seed, format, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
