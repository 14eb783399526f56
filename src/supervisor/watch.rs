//! Watch process lifecycle.

use std::fs;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::timeout;

use super::{ProcessEvent, StopOutcome, SupervisorError, WatchState, WatchSupervisor};
use crate::utils::exec::COMPILER_FILTER;
use crate::{debug, log};

/// Requests to the task that owns the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Terminate,
    Kill,
}

/// Owner-side handle of a running watch process.
pub(super) struct WatchHandle {
    pub(super) generation: u64,
    control: UnboundedSender<Control>,
    exited: oneshot::Receiver<Option<i32>>,
}

impl WatchSupervisor {
    /// Start the watch process.
    ///
    /// Only valid from [`WatchState::Stopped`]; any other state logs a
    /// warning and leaves the running process alone.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if self.state != WatchState::Stopped {
            log!("warning"; "watch process is already running");
            return Ok(());
        }

        let root = self.project.clone().ok_or(SupervisorError::NoProject)?;
        let compiler = self.compiler.as_ref().map_err(|e| e.clone())?;

        let output_dir = compiler.watch_output_dir(&root);
        fs::create_dir_all(&output_dir).map_err(|source| SupervisorError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        self.state = WatchState::Starting;
        let cmd = compiler.watch(&root);
        debug!("watch"; "spawning `{}` in {}", cmd, root.display());

        let mut child = match cmd.into_command().spawn() {
            Ok(child) => child,
            Err(source) => {
                self.state = WatchState::Stopped;
                return Err(SupervisorError::Spawn {
                    exe: compiler.exe().to_path_buf(),
                    source,
                });
            }
        };

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, self.events.clone(), false);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, self.events.clone(), true);
        }

        self.generation += 1;
        let generation = self.generation;
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited_rx) = oneshot::channel();
        tokio::spawn(supervise(
            child,
            control_rx,
            exited_tx,
            self.events.clone(),
            generation,
        ));

        self.handle = Some(WatchHandle {
            generation,
            control: control_tx,
            exited: exited_rx,
        });
        self.state = WatchState::Running;
        let _ = self.events.send(ProcessEvent::Started { generation });
        Ok(())
    }

    /// Stop the watch process in two phases.
    ///
    /// Sends a graceful termination and waits `grace`; if the process is
    /// still alive, kills it once and waits `kill_grace`. Always ends in
    /// [`WatchState::Stopped`].
    pub async fn stop(&mut self) -> StopOutcome {
        let Some(mut handle) = self.handle.take() else {
            self.state = WatchState::Stopped;
            debug!("watch"; "no watch process is running");
            return StopOutcome::NotRunning;
        };

        self.state = WatchState::Stopping;
        let _ = handle.control.send(Control::Terminate);

        let outcome = if timeout(self.timeouts.grace, &mut handle.exited).await.is_ok() {
            StopOutcome::Graceful
        } else {
            log!("warning"; "watch process did not terminate gracefully, killing");
            self.kills_sent += 1;
            let _ = handle.control.send(Control::Kill);

            if timeout(self.timeouts.kill_grace, &mut handle.exited).await.is_ok() {
                StopOutcome::Killed
            } else {
                log!("error"; "watch process did not exit after kill");
                StopOutcome::Unresponsive
            }
        };

        self.state = WatchState::Stopped;
        outcome
    }

    /// Acknowledge an exit reported by [`ProcessEvent::Exited`].
    ///
    /// Returns `true` when `generation` is the current process, which is
    /// then forgotten. Exits of processes already stopped are ignored.
    pub fn on_exited(&mut self, generation: u64) -> bool {
        match &self.handle {
            Some(handle) if handle.generation == generation => {
                self.handle = None;
                self.state = WatchState::Stopped;
                true
            }
            _ => false,
        }
    }
}

/// Own the child until it exits, applying control requests.
async fn supervise(
    mut child: Child,
    mut control: UnboundedReceiver<Control>,
    exited: oneshot::Sender<Option<i32>>,
    events: UnboundedSender<ProcessEvent>,
    generation: u64,
) {
    let code = loop {
        tokio::select! {
            status = child.wait() => {
                break status.ok().and_then(|s| s.code());
            }
            Some(request) = control.recv() => match request {
                Control::Terminate => terminate(&mut child),
                Control::Kill => {
                    if let Err(e) = child.start_kill() {
                        debug!("watch"; "kill failed: {}", e);
                    }
                }
            },
        }
    };

    debug!("watch"; "process {} exited with {:?}", generation, code);
    // event first, so a stopper woken by the oneshot finds it queued
    let _ = events.send(ProcessEvent::Exited { generation, code });
    let _ = exited.send(code);
}

/// Ask the child to exit.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(id) = child.id() else { return };
    let Ok(pid) = i32::try_from(id) else { return };
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!("watch"; "SIGTERM failed: {}", e);
    }
}

/// Ask the child to exit. No graceful signal exists here, so this kills.
#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("watch"; "kill failed: {}", e);
    }
}

/// Forward each line of a child stream as a [`ProcessEvent`].
///
/// Bytes that are not UTF-8 are replaced, so one bad line never ends the
/// stream.
fn forward_lines<R>(reader: R, events: UnboundedSender<ProcessEvent>, is_stderr: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("watch"; "stream read failed: {}", e);
                    break;
                }
            }

            let line = decode_line(&buf);
            let event = if is_stderr {
                let benign = COMPILER_FILTER.is_benign(&line);
                ProcessEvent::Error { line, benign }
            } else {
                ProcessEvent::Output { line }
            };
            if events.send(event).is_err() {
                break;
            }
        }
    });
}

/// One raw line without its terminator, decoded lossily.
pub(super) fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
