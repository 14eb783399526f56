//! Command-line interface module.
//!
//! Each subcommand is a thin driver over one pipeline stage, except
//! `preview`, which runs the whole pipeline.

mod args;
pub mod export;
pub mod generate;
pub mod inspect;
pub mod preview;

pub use args::{Cli, Commands};

use anyhow::{Context, Result};

use crate::config::{ProjectConfig, find_project_root};
use crate::debug;
use crate::utils::path::{normalize_path, resolve_against};

/// Load the project configuration the command line points at.
///
/// Without `--project`, the root is the nearest ancestor holding the config
/// file, or the current directory when there is none.
pub fn load_config(cli: &Cli) -> Result<ProjectConfig> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;

    let root = match &cli.project {
        Some(dir) => normalize_path(dir),
        None => find_project_root(&cwd, &cli.config).unwrap_or_else(|| cwd.clone()),
    };
    debug!("config"; "project root: {}", root.display());

    let mut config = ProjectConfig::load(&root, &cli.config)
        .with_context(|| format!("Failed to load config for `{}`", root.display()))?;

    if let Some(path) = &cli.compiler {
        config.compiler.path = Some(resolve_against(path, &cwd));
    }

    Ok(config)
}
