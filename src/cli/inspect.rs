//! `ergo pages` and `ergo resolve`: read-only views of the project.

use anyhow::{Context, Result};

use crate::compiler::Compiler;
use crate::config::ProjectConfig;
use crate::log;
use crate::tracker::OutputTracker;

/// Print the URL of every page artifact, in page order.
pub fn pages(config: &ProjectConfig) -> Result<()> {
    let mut tracker = OutputTracker::new(config.output_dir(), config.page_pattern());
    let scan = tracker.scan();

    if scan.pages.is_empty() {
        log!("pages"; "no pages in {}", tracker.output_dir().display());
        return Ok(());
    }

    for url in scan.urls() {
        println!("{url}");
    }
    Ok(())
}

/// Print the compiler executable the project would run.
pub fn resolve(config: &ProjectConfig) -> Result<()> {
    let compiler = Compiler::locate(config).context("Cannot resolve the compiler")?;
    println!("{}", compiler.exe().display());
    Ok(())
}
