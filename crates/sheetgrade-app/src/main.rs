// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheetgrade: command-line answer-sheet grader
//
// Entry point. Initialises logging, parses the command line and dispatches to
// the grading and reporting commands.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use sheetgrade_core::human_errors::humanize_error;

#[derive(Parser)]
#[command(name = "sheetgrade")]
#[command(about = "Grade photographed bubble answer sheets against an answer key")]
#[command(version)]
struct Cli {
    /// Settings file (JSON). Missing fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one answer sheet photo.
    Evaluate(EvaluateArgs),

    /// List recently stored results.
    Results {
        /// Number of evaluations to show.
        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Print as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EvaluateArgs {
    /// Photo of the filled answer sheet (JPEG, PNG, ...).
    #[arg(long)]
    pub image: PathBuf,

    /// Answer key (JSON object of subject -> letters).
    #[arg(long)]
    pub key: PathBuf,

    /// Student name stored with the result.
    #[arg(long)]
    pub student: String,

    /// Write the binary ink mask to this PNG.
    #[arg(long)]
    pub save_mask: Option<PathBuf>,

    /// Write the rectified color sheet to this PNG.
    #[arg(long)]
    pub save_rectified: Option<PathBuf>,

    /// Grade only; do not append to the results database or CSV file.
    #[arg(long)]
    pub no_store: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = commands::load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Evaluate(args) => commands::evaluate(&config, &args).map(|summary| {
            println!("{summary}");
        }),
        Commands::Results { limit, json } => commands::results(&config, limit, json).map(|listing| {
            println!("{listing}");
        }),
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            let human = humanize_error(&e);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}
