//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Live-preview pipeline for Typst papers
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Project directory (default: searched upward from the current directory)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub project: Option<PathBuf>,

    /// Config file path (default: ergo.toml)
    #[arg(short = 'C', long, global = true, default_value = "ergo.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Compiler executable, overrides `[compiler] path`
    #[arg(long, global = true, value_hint = clap::ValueHint::ExecutablePath)]
    pub compiler: Option<PathBuf>,

    /// Enable verbose output for debugging (`-V` is `--version`)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write the source tree from the saved form data
    #[command(visible_alias = "g")]
    Generate {
        /// Read the document from this JSON file instead of the snapshot
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        from: Option<PathBuf>,
    },

    /// Run the compiler in watch mode and report changed pages
    #[command(visible_alias = "p")]
    Preview {
        /// Start from the existing sources without regenerating
        #[arg(long)]
        no_generate: bool,

        /// Print pipeline events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Compile a PDF once and move it into a directory
    #[command(visible_alias = "e")]
    Export {
        /// Existing directory receiving `<project-name>.pdf`
        #[arg(value_hint = clap::ValueHint::DirPath)]
        destination: PathBuf,
    },

    /// List the current page artifacts
    Pages,

    /// Show which compiler executable would be used
    Resolve,
}
