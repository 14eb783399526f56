//! Pipeline message protocol.
//!
//! Requests flow in from the UI, events flow out. Both serialize as
//! internally tagged JSON so the command line can speak them line by line:
//!
//! ```text
//! {"request":"generate","document":{...}}
//! {"request":"start_watch"}
//! {"event":"pages_changed","pages":["file:///.../p1.svg?t=1700000000123"]}
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Requests handled by the pipeline loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    /// Regenerate the source tree from a form edit.
    Generate {
        /// Boxed to keep the enum small
        document: Box<Document>,
    },
    /// Start the watch process and artifact tracking.
    StartWatch,
    /// Stop the watch process and artifact tracking.
    StopWatch,
    /// Export a PDF into `destination`.
    Export { destination: PathBuf },
    /// Stop everything and end the loop.
    Shutdown,
}

/// Events emitted by the pipeline loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Sources written; `root` is the root document.
    Generated { root: PathBuf },
    GenerationFailed { message: String },
    /// Something degraded but the pipeline keeps going.
    Warning { message: String },
    ProcessStarted,
    /// The watch process ended. `code` is absent when killed by a signal.
    ProcessStopped {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
    },
    /// Compiler output, including routine status lines from stderr.
    ProcessOutput { line: String },
    /// A compiler error line.
    ProcessError { line: String },
    ExportFinished { path: PathBuf },
    ExportFailed { message: String },
    /// Ordered page URLs; sent only when the list differs from the last one.
    PagesChanged { pages: Vec<String> },
    /// 0-based position of the first changed page.
    ActivePageChanged { index: usize },
}
