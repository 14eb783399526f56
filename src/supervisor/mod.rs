//! Build process supervisor.
//!
//! Owns at most one long-running watch process and any number of one-shot
//! export processes. The two never share a child handle.
//!
//! # Watch lifecycle
//!
//! ```text
//!            start()              spawned
//! Stopped ─────────────► Starting ───────► Running
//!    ▲                                        │ stop()
//!    │         TERM, wait grace               ▼
//!    └───────── KILL, wait kill_grace ◄── Stopping
//! ```
//!
//! A process that exits on its own is reported through
//! [`ProcessEvent::Exited`]; the owner acknowledges it with
//! [`WatchSupervisor::on_exited`].
//!
//! Everything the children say arrives as [`ProcessEvent`]s on the channel
//! passed to [`WatchSupervisor::new`], so the owning loop never blocks on a
//! child.

mod export;
mod watch;

#[cfg(test)]
mod tests;

pub use export::{ExportError, ExportId};

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::compiler::{Compiler, ResolveError};
use watch::WatchHandle;

/// Watch process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Bounded waits of the two-phase stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTimeouts {
    /// Wait after the graceful termination signal.
    pub grace: Duration,
    /// Wait after the forceful kill.
    pub kill_grace: Duration,
}

impl Default for StopTimeouts {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(2),
            kill_grace: Duration::from_secs(1),
        }
    }
}

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running.
    NotRunning,
    /// Exited within the grace period.
    Graceful,
    /// Exited after the forceful kill.
    Killed,
    /// Still alive after the kill grace period; abandoned.
    Unresponsive,
}

/// Events emitted by supervised processes.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// Watch process `generation` was spawned.
    Started { generation: u64 },
    /// A stdout line of the watch process.
    Output { line: String },
    /// A stderr line of the watch process. Benign lines are routine status.
    Error { line: String, benign: bool },
    /// Watch process `generation` exited. `code` is `None` when killed by a
    /// signal.
    Exited { generation: u64, code: Option<i32> },
    /// An export job completed.
    ExportFinished {
        id: ExportId,
        result: Result<PathBuf, ExportError>,
    },
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("project path not set, cannot start the compiler")]
    NoProject,

    #[error(transparent)]
    Compiler(#[from] ResolveError),

    #[error("failed to create output directory `{}`: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to start `{}`: {source}", exe.display())]
    Spawn {
        exe: PathBuf,
        source: std::io::Error,
    },
}

/// Supervisor of the compiler processes of one project.
pub struct WatchSupervisor {
    compiler: Result<Compiler, ResolveError>,
    project: Option<PathBuf>,
    timeouts: StopTimeouts,
    events: UnboundedSender<ProcessEvent>,
    state: WatchState,
    handle: Option<WatchHandle>,
    generation: u64,
    next_export: u64,
    kills_sent: u32,
}

impl WatchSupervisor {
    /// Create a supervisor.
    ///
    /// A failed compiler resolution is kept and reported by every start or
    /// export request.
    pub fn new(
        compiler: Result<Compiler, ResolveError>,
        project: Option<PathBuf>,
        timeouts: StopTimeouts,
        events: UnboundedSender<ProcessEvent>,
    ) -> Self {
        Self {
            compiler,
            project,
            timeouts,
            events,
            state: WatchState::Stopped,
            handle: None,
            generation: 0,
            next_export: 0,
            kills_sent: 0,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == WatchState::Running
    }

    /// Generation of the current watch process, if any.
    pub fn generation(&self) -> Option<u64> {
        self.handle.as_ref().map(|h| h.generation)
    }

    /// Forceful kills sent over the supervisor's lifetime.
    pub fn kills_sent(&self) -> u32 {
        self.kills_sent
    }
}
