//! `ergo preview`: the live-preview session.
//!
//! Requests are read from stdin as JSON lines; events are printed as log
//! lines, or as JSON lines with `--json`. Ctrl+C stops the compiler before
//! exiting.

use std::io::BufRead;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::compiler::Compiler;
use crate::config::ProjectConfig;
use crate::document::Snapshot;
use crate::logger::{status_compiled, status_detach, status_failed};
use crate::pipeline::{Pipeline, PipelineEvent, Request};
use crate::{core, debug, log};

/// Capacity of the stdin request channel.
const REQUEST_BUFFER: usize = 16;

pub async fn preview(config: &ProjectConfig, no_generate: bool, json: bool) -> Result<()> {
    let shutdown = core::register_preview();

    let compiler = Compiler::locate(config);
    if let Err(e) = &compiler {
        log!("error"; "{}", e);
    }

    let snapshot = Snapshot::new(config.root_join(&config.document.snapshot));
    let document = snapshot.load_or_default();

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let pipeline = Pipeline::new(config, compiler, events_tx).with_document(document.clone());

    let (requests_tx, requests_rx) = mpsc::channel(REQUEST_BUFFER);
    if !no_generate {
        let _ = requests_tx
            .send(Request::Generate {
                document: Box::new(document),
            })
            .await;
    }
    let _ = requests_tx.send(Request::StartWatch).await;
    spawn_stdin_reader(requests_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => debug!("preview"; "cannot encode event: {}", e),
                }
            } else {
                report(&event);
            }
        }
    });

    log!("preview"; "watching {}", config.get_root().display());
    pipeline.run(requests_rx, Some(shutdown)).await;
    // the pipeline held the only sender
    let _ = printer.await;
    Ok(())
}

/// Forward stdin lines as requests until EOF.
fn spawn_stdin_reader(requests: mpsc::Sender<Request>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if core::is_shutdown() {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Request>(&line) {
                Ok(request) => {
                    if requests.blocking_send(request).is_err() {
                        break;
                    }
                }
                Err(e) => log!("preview"; "ignoring malformed request: {}", e),
            }
        }
        debug!("preview"; "stdin closed");
    });
}

/// Print an event for a human.
fn report(event: &PipelineEvent) {
    match event {
        PipelineEvent::Generated { root } => log!("generate"; "wrote {}", root.display()),
        PipelineEvent::GenerationFailed { message } => log!("error"; "{}", message),
        PipelineEvent::Warning { message } => log!("warning"; "{}", message),
        PipelineEvent::ProcessStarted => log!("watch"; "compiler started"),
        PipelineEvent::ProcessStopped { code } => {
            status_detach();
            match code {
                Some(code) => log!("watch"; "compiler stopped (exit code {})", code),
                None => log!("watch"; "compiler stopped"),
            }
        }
        PipelineEvent::ProcessOutput { line } => {
            let line = line.trim();
            if !line.is_empty() {
                status_compiled(line);
            }
        }
        PipelineEvent::ProcessError { line } => status_failed(line),
        PipelineEvent::ExportFinished { path } => log!("export"; "exported to {}", path.display()),
        PipelineEvent::ExportFailed { message } => log!("error"; "export failed: {}", message),
        PipelineEvent::PagesChanged { pages } => {
            debug!("watch"; "{} page(s)", pages.len());
            for page in pages {
                debug!("watch"; "  {}", page);
            }
        }
        PipelineEvent::ActivePageChanged { index } => {
            debug!("watch"; "page {} changed", index + 1);
        }
    }
}
