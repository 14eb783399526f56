//! One-shot export jobs.
//!
//! Each export spawns its own compiler process writing to the project's
//! intermediate output. On completion the artifact is moved to
//! `<destination>/<project-name>.<ext>`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use thiserror::Error;

use super::{ProcessEvent, WatchSupervisor};
use crate::utils::exec::COMPILER_FILTER;
use crate::utils::fs::move_file;
use crate::{debug, log};

/// Identifier of an export job, increasing per supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExportId(pub u64);

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("project path not set")]
    NoProject,

    #[error("compiler unavailable: {0}")]
    Compiler(String),

    #[error("destination `{}` is not a valid folder", .0.display())]
    InvalidDestination(PathBuf),

    #[error("failed to start export: {0}")]
    Spawn(String),

    #[error("export failed ({})\n\n{stderr}", describe_exit(.code))]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("compiler reported success, but `{}` was not found", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("failed to move export to `{}`: {message}", target.display())]
    Move { target: PathBuf, message: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated abnormally".into(),
    }
}

/// Exit information of a finished export process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportExit {
    /// `Some(0)` is the only success.
    pub code: Option<i32>,
    pub stderr: String,
}

impl ExportExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<Output> for ExportExit {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Decide the outcome of a finished export.
///
/// Success requires a zero exit AND the artifact at `source`, which is then
/// moved to `target`.
pub fn finish_export(exit: &ExportExit, source: &Path, target: &Path) -> Result<PathBuf, ExportError> {
    if !exit.success() {
        return Err(ExportError::ProcessFailed {
            code: exit.code,
            stderr: COMPILER_FILTER.significant(exit.stderr.trim()),
        });
    }

    if !source.is_file() {
        return Err(ExportError::ArtifactMissing(source.to_path_buf()));
    }

    move_file(source, target).map_err(|e| ExportError::Move {
        target: target.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(target.to_path_buf())
}

/// Final location of an export: `<destination>/<project-name>.<ext>`.
pub fn export_target(root: &Path, destination: &Path, source: &Path) -> PathBuf {
    let name = root
        .file_name()
        .map_or_else(|| "document".into(), |n| n.to_string_lossy().into_owned());
    let ext = source
        .extension()
        .map_or_else(|| "pdf".into(), |e| e.to_string_lossy().into_owned());
    destination.join(format!("{name}.{ext}"))
}

impl WatchSupervisor {
    /// Spawn an export job independent of the watch process.
    ///
    /// Errors found before spawning are returned directly; everything after
    /// is reported once through [`ProcessEvent::ExportFinished`].
    pub fn spawn_export(&mut self, destination: &Path) -> Result<ExportId, ExportError> {
        let root = self.project.clone().ok_or(ExportError::NoProject)?;
        let compiler = self
            .compiler
            .as_ref()
            .map_err(|e| ExportError::Compiler(e.to_string()))?;

        if !destination.is_dir() {
            return Err(ExportError::InvalidDestination(destination.to_path_buf()));
        }

        let output_dir = compiler.export_output_dir(&root);
        fs::create_dir_all(&output_dir).map_err(|e| {
            ExportError::Spawn(format!("cannot create `{}`: {e}", output_dir.display()))
        })?;

        let source = root.join(compiler.export_output());
        let target = export_target(&root, destination, &source);
        let cmd = compiler.compile(&root);
        debug!("export"; "spawning `{}`", cmd);

        let child = cmd
            .into_command()
            .spawn()
            .map_err(|e| ExportError::Spawn(e.to_string()))?;

        self.next_export += 1;
        let id = ExportId(self.next_export);
        log!("export"; "job {} started", id);

        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match child.wait_with_output().await {
                Ok(output) => finish_export(&ExportExit::from(output), &source, &target),
                Err(e) => Err(ExportError::ProcessFailed {
                    code: None,
                    stderr: e.to_string(),
                }),
            };
            let _ = events.send(ProcessEvent::ExportFinished { id, result });
        });

        Ok(id)
    }
}
