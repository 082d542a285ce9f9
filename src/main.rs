//! CLI entry point for papergrab.

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod app_config;
mod cli;
mod commands;
mod progress;

use app_config::{FileConfig, load_default_file_config};
use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = load_default_file_config()?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(resolve_default_log_level(&args, &file_config)));

    // Logs go to stderr so `papers --json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let context = commands::Context::new(&args, &file_config)?;
    match &args.command {
        Command::Sites => commands::run_sites_command(&context),
        Command::Levels(site) => commands::run_levels_command(&context, site),
        Command::Subjects(level) => commands::run_subjects_command(&context, level).await,
        Command::Papers(papers) => commands::run_papers_command(&context, papers).await,
        Command::Get(get) => commands::run_get_command(&context, get).await,
    }
}

fn resolve_default_log_level(args: &Args, file_config: &FileConfig) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .verbosity
                .map_or("info", app_config::VerbositySetting::log_level),
            1 => "debug",
            _ => "trace",
        }
    }
}
