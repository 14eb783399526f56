//! `ergo export`: one-shot PDF export.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;

use crate::compiler::Compiler;
use crate::config::ProjectConfig;
use crate::log;
use crate::supervisor::{ProcessEvent, WatchSupervisor};

/// Export the project into `destination` and wait for the result.
pub async fn export(config: &ProjectConfig, destination: &Path) -> Result<()> {
    let compiler = Compiler::locate(config).context("Cannot export without a compiler")?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut supervisor = WatchSupervisor::new(
        Ok(compiler),
        Some(config.get_root().to_path_buf()),
        config.watch.timeouts(),
        tx,
    );

    let id = supervisor.spawn_export(destination)?;
    while let Some(event) = rx.recv().await {
        if let ProcessEvent::ExportFinished { id: done, result } = event
            && done == id
        {
            let path = result?;
            log!("export"; "exported to {}", path.display());
            return Ok(());
        }
    }

    bail!("export {} ended without a result", id)
}
