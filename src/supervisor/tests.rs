//! Process tests against a fake compiler script.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::*;

const WAIT: Duration = Duration::from_secs(10);

/// Scratch project plus a fake compiler running `body` as its shell script.
struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    exe: PathBuf,
}

impl Fixture {
    fn new(body: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("paper");
        fs::create_dir_all(&root).unwrap();

        let exe = temp.path().join("typst");
        fs::write(&exe, format!("#!/bin/sh\n[ \"$1\" = probe ] && exit 0\n{body}\n")).unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        wait_until_executable(&exe);

        Self {
            _temp: temp,
            root,
            exe,
        }
    }

    fn supervisor(&self, timeouts: StopTimeouts) -> (WatchSupervisor, UnboundedReceiver<ProcessEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let compiler = Compiler::new(&self.exe, "main.typ", "output/p{p}.svg", "output/main.pdf");
        let supervisor = WatchSupervisor::new(Ok(compiler), Some(self.root.clone()), timeouts, tx);
        (supervisor, rx)
    }
}

/// A freshly written script can briefly fail with ETXTBSY while a
/// concurrently forked test process still holds the write handle.
fn wait_until_executable(exe: &Path) {
    for _ in 0..100 {
        if std::process::Command::new(exe).arg("probe").status().is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("fake compiler never became executable");
}

fn short_timeouts() -> StopTimeouts {
    StopTimeouts {
        grace: Duration::from_millis(300),
        kill_grace: Duration::from_secs(2),
    }
}

async fn next_matching(
    rx: &mut UnboundedReceiver<ProcessEvent>,
    pred: impl Fn(&ProcessEvent) -> bool,
) -> ProcessEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for process event")
}

const WATCH_FOREVER: &str = r#"
echo "watching $2" >&2
mkdir -p output
echo '<svg/>' > output/p1.svg
echo "compiled"
while true; do sleep 0.05; done
"#;

#[tokio::test]
async fn test_start_runs_in_project_root() {
    let fixture = Fixture::new(WATCH_FOREVER);
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());

    supervisor.start().unwrap();
    assert_eq!(supervisor.state(), WatchState::Running);
    assert_eq!(
        next_matching(&mut rx, |e| matches!(e, ProcessEvent::Started { .. })).await,
        ProcessEvent::Started { generation: 1 }
    );

    let event = next_matching(&mut rx, |e| matches!(e, ProcessEvent::Output { .. })).await;
    assert_eq!(event, ProcessEvent::Output { line: "compiled".into() });
    assert!(fixture.root.join("output/p1.svg").exists());

    supervisor.stop().await;
}

#[tokio::test]
async fn test_status_lines_benign() {
    let fixture = Fixture::new(
        r#"
echo "watching $2" >&2
echo "error: unknown variable: x" >&2
while true; do sleep 0.05; done
"#,
    );
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());
    supervisor.start().unwrap();

    let is_error = |e: &ProcessEvent| matches!(e, ProcessEvent::Error { .. });
    assert_eq!(
        next_matching(&mut rx, is_error).await,
        ProcessEvent::Error {
            line: "watching main.typ".into(),
            benign: true
        }
    );
    assert_eq!(
        next_matching(&mut rx, is_error).await,
        ProcessEvent::Error {
            line: "error: unknown variable: x".into(),
            benign: false
        }
    );

    supervisor.stop().await;
}

#[tokio::test]
async fn test_stderr_survives_invalid_utf8() {
    let fixture = Fixture::new(
        r#"
printf 'error: bad path \377\376 here\r\n' >&2
echo "error: second line" >&2
while true; do sleep 0.05; done
"#,
    );
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());
    supervisor.start().unwrap();

    let is_error = |e: &ProcessEvent| matches!(e, ProcessEvent::Error { .. });
    assert_eq!(
        next_matching(&mut rx, is_error).await,
        ProcessEvent::Error {
            line: "error: bad path \u{FFFD}\u{FFFD} here".into(),
            benign: false
        }
    );
    assert_eq!(
        next_matching(&mut rx, is_error).await,
        ProcessEvent::Error {
            line: "error: second line".into(),
            benign: false
        }
    );

    supervisor.stop().await;
}

#[test]
fn test_decode_line_terminators() {
    use super::watch::decode_line;

    assert_eq!(decode_line(b"compiled\n"), "compiled");
    assert_eq!(decode_line(b"compiled\r\n"), "compiled");
    assert_eq!(decode_line(b"tail without newline"), "tail without newline");
    assert_eq!(decode_line(b"a\xffb\n"), "a\u{FFFD}b");
}

#[tokio::test]
async fn test_double_start_is_noop() {
    let fixture = Fixture::new(WATCH_FOREVER);
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());

    supervisor.start().unwrap();
    supervisor.start().unwrap();
    assert_eq!(supervisor.generation(), Some(1));

    assert_eq!(supervisor.stop().await, StopOutcome::Graceful);
    let exited = next_matching(&mut rx, |e| matches!(e, ProcessEvent::Exited { .. })).await;
    assert!(matches!(exited, ProcessEvent::Exited { generation: 1, .. }));

    // only one process was ever started
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, ProcessEvent::Started { generation } if generation != 1));
    }
}

#[tokio::test]
async fn test_stop_while_stopped() {
    let fixture = Fixture::new(WATCH_FOREVER);
    let (mut supervisor, _rx) = fixture.supervisor(short_timeouts());

    assert_eq!(supervisor.stop().await, StopOutcome::NotRunning);
    assert_eq!(supervisor.state(), WatchState::Stopped);
    assert_eq!(supervisor.kills_sent(), 0);
}

#[tokio::test]
async fn test_graceful_stop() {
    let fixture = Fixture::new(WATCH_FOREVER);
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());
    supervisor.start().unwrap();

    assert_eq!(supervisor.stop().await, StopOutcome::Graceful);
    assert_eq!(supervisor.state(), WatchState::Stopped);
    assert_eq!(supervisor.kills_sent(), 0);

    // already forgotten by stop()
    next_matching(&mut rx, |e| matches!(e, ProcessEvent::Exited { .. })).await;
    assert!(!supervisor.on_exited(1));
}

#[tokio::test]
async fn test_unresponsive_process_killed_once() {
    let fixture = Fixture::new(
        r#"
trap '' TERM
while true; do sleep 0.05; done
"#,
    );
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());
    supervisor.start().unwrap();
    // let the shell install its trap
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(supervisor.stop().await, StopOutcome::Killed);
    assert_eq!(supervisor.kills_sent(), 1);
    assert_eq!(supervisor.state(), WatchState::Stopped);

    let exited = next_matching(&mut rx, |e| matches!(e, ProcessEvent::Exited { .. })).await;
    assert_eq!(exited, ProcessEvent::Exited { generation: 1, code: None });
}

#[tokio::test]
async fn test_crash_reported_and_restartable() {
    let fixture = Fixture::new("exit 3");
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());
    supervisor.start().unwrap();

    let exited = next_matching(&mut rx, |e| matches!(e, ProcessEvent::Exited { .. })).await;
    assert_eq!(exited, ProcessEvent::Exited { generation: 1, code: Some(3) });

    assert!(supervisor.on_exited(1));
    assert_eq!(supervisor.state(), WatchState::Stopped);
    assert!(!supervisor.on_exited(1));

    // not restarted automatically, but a new start works
    supervisor.start().unwrap();
    assert_eq!(supervisor.generation(), Some(2));
    supervisor.stop().await;
}

#[tokio::test]
async fn test_start_without_project() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let compiler = Compiler::new("/bin/true", "main.typ", "output/p{p}.svg", "output/main.pdf");
    let mut supervisor = WatchSupervisor::new(Ok(compiler), None, StopTimeouts::default(), tx);

    assert!(matches!(supervisor.start(), Err(SupervisorError::NoProject)));
    assert_eq!(supervisor.state(), WatchState::Stopped);
}

#[tokio::test]
async fn test_start_with_unresolved_compiler() {
    let temp = TempDir::new().unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let missing = ResolveError::ExecutableNotFound(PathBuf::from("bin/linux-x86_64/typst_0.14.0"));
    let mut supervisor = WatchSupervisor::new(
        Err(missing.clone()),
        Some(temp.path().to_path_buf()),
        StopTimeouts::default(),
        tx,
    );

    assert!(matches!(supervisor.start(), Err(SupervisorError::Compiler(e)) if e == missing));
    assert!(matches!(
        supervisor.spawn_export(temp.path()),
        Err(ExportError::Compiler(_))
    ));
}

const EXPORT_OK: &str = r#"
mkdir -p output
echo '%PDF' > "$3"
"#;

#[tokio::test]
async fn test_export_moves_pdf() {
    let fixture = Fixture::new(EXPORT_OK);
    let dest = TempDir::new().unwrap();
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());

    let id = supervisor.spawn_export(dest.path()).unwrap();
    assert_eq!(id, ExportId(1));

    let event = next_matching(&mut rx, |e| matches!(e, ProcessEvent::ExportFinished { .. })).await;
    let expected = dest.path().join("paper.pdf");
    assert_eq!(
        event,
        ProcessEvent::ExportFinished {
            id,
            result: Ok(expected.clone())
        }
    );
    assert!(expected.exists());
    assert!(!fixture.root.join("output/main.pdf").exists());
    assert_eq!(supervisor.state(), WatchState::Stopped);
}

#[tokio::test]
async fn test_export_success_without_artifact() {
    let fixture = Fixture::new("exit 0");
    let dest = TempDir::new().unwrap();
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());

    supervisor.spawn_export(dest.path()).unwrap();
    let event = next_matching(&mut rx, |e| matches!(e, ProcessEvent::ExportFinished { .. })).await;
    assert!(matches!(
        event,
        ProcessEvent::ExportFinished {
            result: Err(ExportError::ArtifactMissing(_)),
            ..
        }
    ));
}

#[tokio::test]
async fn test_export_failure_carries_stderr() {
    let fixture = Fixture::new("echo 'error: file not found: main.typ' >&2\nexit 1");
    let dest = TempDir::new().unwrap();
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());

    supervisor.spawn_export(dest.path()).unwrap();
    let event = next_matching(&mut rx, |e| matches!(e, ProcessEvent::ExportFinished { .. })).await;
    let ProcessEvent::ExportFinished { result: Err(err), .. } = event else {
        panic!("expected failed export, got {event:?}");
    };
    assert_eq!(
        err,
        ExportError::ProcessFailed {
            code: Some(1),
            stderr: "error: file not found: main.typ".into()
        }
    );
}

#[tokio::test]
async fn test_export_invalid_destination() {
    let fixture = Fixture::new(EXPORT_OK);
    let (mut supervisor, _rx) = fixture.supervisor(short_timeouts());
    let dest = fixture.root.join("no-such-folder");

    assert_eq!(
        supervisor.spawn_export(&dest),
        Err(ExportError::InvalidDestination(dest))
    );
}

#[tokio::test]
async fn test_export_while_watching() {
    let fixture = Fixture::new(
        r#"
case "$1" in
  watch) while true; do sleep 0.05; done ;;
  compile) mkdir -p output; echo '%PDF' > "$3" ;;
esac
"#,
    );
    let dest = TempDir::new().unwrap();
    let (mut supervisor, mut rx) = fixture.supervisor(short_timeouts());
    let is_export = |e: &ProcessEvent| matches!(e, ProcessEvent::ExportFinished { .. });

    supervisor.start().unwrap();
    let first = supervisor.spawn_export(dest.path()).unwrap();
    let event = next_matching(&mut rx, is_export).await;
    assert!(matches!(event, ProcessEvent::ExportFinished { id, result: Ok(_) } if id == first));

    let second = supervisor.spawn_export(dest.path()).unwrap();
    assert!(second > first);
    let event = next_matching(&mut rx, is_export).await;
    assert!(matches!(event, ProcessEvent::ExportFinished { id, result: Ok(_) } if id == second));

    // the watch process is untouched by exports
    assert!(supervisor.is_running());
    assert_eq!(supervisor.generation(), Some(1));
    assert_eq!(supervisor.stop().await, StopOutcome::Graceful);
}
