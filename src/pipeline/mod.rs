//! Live-preview pipeline.
//!
//! Wires the three stages together on a single control loop:
//!
//! ```text
//! Request::Generate ──► Generator ──► sources
//!                                        │ (watched by)
//! Request::StartWatch ─► Supervisor ──► compiler ──► output/p{N}.svg
//!                                                        │
//!             PipelineEvent ◄── OutputTracker ◄── Monitor / poll
//! ```
//!
//! The loop owns all mutable state. Subprocess output, filesystem events
//! and the poll tick arrive as messages, so no state is shared across
//! threads.

mod messages;


pub use messages::{PipelineEvent, Request};

use std::time::Duration;

use crossbeam::channel::Receiver as ShutdownReceiver;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

use crate::compiler::{Compiler, ResolveError};
use crate::config::ProjectConfig;
use crate::document::Document;
use crate::generator::Generator;
use crate::supervisor::{ProcessEvent, StopOutcome, WatchSupervisor};
use crate::tracker::{FirstChange, FsChange, Monitor, OutputTracker};
use crate::{debug, log};

/// The pipeline and the inboxes its loop drains.
pub struct Pipeline {
    stages: Stages,
    process_rx: UnboundedReceiver<ProcessEvent>,
    fs_rx: UnboundedReceiver<FsChange>,
}

/// Mutable state of the loop.
struct Stages {
    generator: Generator,
    supervisor: WatchSupervisor,
    tracker: OutputTracker,
    /// Live filesystem watch; `None` if notify failed or tracking is off.
    monitor: Option<Monitor>,
    /// Tracking is on between a watch start and its stop or exit.
    tracking: bool,
    fs_tx: UnboundedSender<FsChange>,
    /// Latest document, source of labels for the next edit.
    document: Document,
    /// Page URLs of the last `PagesChanged`.
    last_pages: Option<Vec<String>>,
    poll_interval: Duration,
    events: UnboundedSender<PipelineEvent>,
}

impl Pipeline {
    /// Build a pipeline for the project described by `config`.
    ///
    /// A failed compiler resolution does not prevent generation; it is
    /// reported when a watch or export is requested.
    pub fn new(
        config: &ProjectConfig,
        compiler: Result<Compiler, ResolveError>,
        events: UnboundedSender<PipelineEvent>,
    ) -> Self {
        let root = config.get_root().to_path_buf();
        let (process_tx, process_rx) = mpsc::unbounded_channel();
        let (fs_tx, fs_rx) = mpsc::unbounded_channel();

        let stages = Stages {
            generator: Generator::new(&root, config.document.clone()),
            supervisor: WatchSupervisor::new(
                compiler,
                Some(root),
                config.watch.timeouts(),
                process_tx,
            ),
            tracker: OutputTracker::new(config.output_dir(), config.page_pattern()),
            monitor: None,
            tracking: false,
            fs_tx,
            document: Document::default(),
            last_pages: None,
            poll_interval: config.tracker.poll_interval(),
            events,
        };

        Self {
            stages,
            process_rx,
            fs_rx,
        }
    }

    /// Seed the session with a previously saved document, so its image
    /// labels carry over to the first edit.
    pub fn with_document(mut self, document: Document) -> Self {
        self.stages.document = document;
        self
    }

    pub fn document(&self) -> &Document {
        &self.stages.document
    }

    /// Run the control loop until a [`Request::Shutdown`] or the shutdown
    /// signal.
    ///
    /// A closed request channel does not end the loop; the watch keeps
    /// running until shutdown.
    pub async fn run(self, mut requests: mpsc::Receiver<Request>, shutdown: Option<ShutdownReceiver<()>>) {
        let Self {
            mut stages,
            mut process_rx,
            mut fs_rx,
        } = self;

        let mut poll = tokio::time::interval(stages.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut requests_open = true;

        loop {
            tokio::select! {
                request = requests.recv(), if requests_open => match request {
                    Some(Request::Shutdown) => break,
                    Some(request) => stages.handle(request).await,
                    None => {
                        debug!("pipeline"; "request channel closed");
                        requests_open = false;
                    }
                },
                Some(event) = process_rx.recv() => stages.on_process_event(event),
                Some(change) = fs_rx.recv() => {
                    if stages.tracking {
                        debug!("pipeline"; "{} path(s) changed", change.paths.len());
                        stages.rescan();
                    }
                }
                _ = poll.tick() => {
                    if shutdown.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
                        debug!("pipeline"; "shutdown signal received");
                        break;
                    }
                    stages.poll();
                }
            }
        }

        stages.stop_watch().await;
        while let Ok(event) = process_rx.try_recv() {
            stages.on_process_event(event);
        }
        debug!("pipeline"; "stopped");
    }
}

impl Stages {
    fn emit(&self, event: PipelineEvent) {
        // receiver gone means nobody is listening any more
        let _ = self.events.send(event);
    }

    async fn handle(&mut self, request: Request) {
        match request {
            Request::Generate { document } => self.generate(*document),
            Request::StartWatch => self.start_watch(),
            Request::StopWatch => self.stop_watch().await,
            Request::Export { destination } => {
                match self.supervisor.spawn_export(&destination) {
                    Ok(id) => debug!("export"; "export {} started", id),
                    Err(e) => self.emit(PipelineEvent::ExportFailed {
                        message: e.to_string(),
                    }),
                }
            }
            // handled by the loop
            Request::Shutdown => {}
        }
    }

    fn generate(&mut self, mut document: Document) {
        document.adopt_labels(&self.document);

        match self.generator.generate(&mut document) {
            Ok(report) => {
                if let Some(message) = report.snapshot_warning {
                    self.emit(PipelineEvent::Warning { message });
                }
                self.emit(PipelineEvent::Generated { root: report.root });
            }
            Err(e) => {
                log!("error"; "generation failed: {}", e);
                self.emit(PipelineEvent::GenerationFailed {
                    message: e.to_string(),
                });
            }
        }

        self.document = document;
    }

    fn start_watch(&mut self) {
        if let Err(e) = self.supervisor.start() {
            log!("error"; "{}", e);
            self.emit(PipelineEvent::Warning {
                message: e.to_string(),
            });
            return;
        }
        self.start_tracking();
    }

    async fn stop_watch(&mut self) {
        if self.supervisor.stop().await == StopOutcome::Unresponsive {
            self.emit(PipelineEvent::Warning {
                message: "watch process did not exit after kill".into(),
            });
        }
        self.stop_tracking();
    }

    fn start_tracking(&mut self) {
        if self.tracking {
            return;
        }
        self.tracking = true;

        match Monitor::start(self.tracker.output_dir(), self.fs_tx.clone()) {
            Ok(monitor) => self.monitor = Some(monitor),
            Err(e) => {
                // polling still runs
                log!("warning"; "cannot watch {}: {}", self.tracker.output_dir().display(), e);
            }
        }
        self.rescan();
        if let Some(monitor) = &self.monitor {
            debug!("watch"; "tracking {} page file(s)", monitor.watched_files());
        }
    }

    fn stop_tracking(&mut self) {
        self.tracking = false;
        self.monitor = None;
    }

    fn on_process_event(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Started { generation } => {
                debug!("watch"; "process {} started", generation);
                self.emit(PipelineEvent::ProcessStarted);
            }
            ProcessEvent::Output { line } => self.emit(PipelineEvent::ProcessOutput { line }),
            ProcessEvent::Error { line, benign: true } => {
                self.emit(PipelineEvent::ProcessOutput { line });
            }
            ProcessEvent::Error { line, benign: false } => {
                self.emit(PipelineEvent::ProcessError { line });
            }
            ProcessEvent::Exited { generation, code } => {
                if self.supervisor.on_exited(generation) {
                    log!("watch"; "watch process exited on its own ({:?})", code);
                    self.stop_tracking();
                }
                self.emit(PipelineEvent::ProcessStopped { code });
            }
            ProcessEvent::ExportFinished { id, result } => match result {
                Ok(path) => {
                    log!("export"; "export {} written to {}", id, path.display());
                    self.emit(PipelineEvent::ExportFinished { path });
                }
                Err(e) => {
                    log!("export"; "export {} failed: {}", id, e);
                    self.emit(PipelineEvent::ExportFailed {
                        message: e.to_string(),
                    });
                }
            },
        }
    }

    /// Poll tick: keep the watch attached and rescan.
    fn poll(&mut self) {
        if !self.tracking {
            return;
        }
        if let Some(monitor) = &mut self.monitor {
            monitor.maintain();
        }
        self.rescan();
    }

    /// Rescan the output directory and report what the viewer must redraw.
    fn rescan(&mut self) {
        let scan = self.tracker.scan();
        if let Some(monitor) = &mut self.monitor {
            monitor.apply(&scan);
        }

        let pages = scan.urls();
        if self.last_pages.as_ref() != Some(&pages) {
            self.last_pages = Some(pages.clone());
            self.emit(PipelineEvent::PagesChanged { pages });
        }

        if let FirstChange::At(index) = scan.first_changed {
            self.emit(PipelineEvent::ActivePageChanged { index });
        }
    }
}
