//! Ergo - live-preview pipeline for form-driven Typst documents.

mod cli;
mod compiler;
mod config;
mod core;
mod document;
mod generator;
mod logger;
mod pipeline;
mod supervisor;
mod tracker;
mod utils;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = cli::load_config(&cli)?;

    match &cli.command {
        Commands::Generate { from } => cli::generate::generate(&config, from.as_deref()),
        Commands::Preview { no_generate, json } => {
            runtime()?.block_on(cli::preview::preview(&config, *no_generate, *json))
        }
        Commands::Export { destination } => {
            runtime()?.block_on(cli::export::export(&config, destination))
        }
        Commands::Pages => cli::inspect::pages(&config),
        Commands::Resolve => cli::inspect::resolve(&config),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}
