//! Terminal output.
//!
//! - `log!(module; ...)` prints a line behind a colored `[module]` tag
//! - `debug!(module; ...)` does the same, only with `--verbose`
//! - [`CompilerStatus`] keeps one overwritable block showing the watch
//!   compiler's latest result
//!
//! ```ignore
//! log!("export"; "exported to {}", path.display());
//! status_compiled("compiled successfully in 12ms");
//! status_failed("error: unknown variable: x");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable `debug!` output (set from `--verbose`)
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Print a line with a colored module tag
///
/// ```ignore
/// log!("watch"; "compiler started");
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, but silent unless `--verbose`
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let tag = tag(module);
    let mut out = stdout().lock();
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{tag} {message}").ok();
    out.flush().ok();
}

/// `[module]`, colored by pipeline stage.
fn tag(module: &str) -> String {
    let tag = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "generate" => tag.bright_cyan().bold().to_string(),
        "watch" | "preview" => tag.bright_green().bold().to_string(),
        "export" => tag.bright_blue().bold().to_string(),
        "error" => tag.bright_red().bold().to_string(),
        _ => tag.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Compiler status block
// ============================================================================

/// Wall clock as `HH:MM:SS` (UTC)
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

/// Latest compiler result, redrawn in place.
///
/// Error lines of one failed compile accumulate into a single block; the
/// next success replaces the whole block.
pub struct CompilerStatus {
    /// Terminal lines drawn by the previous render
    drawn: usize,
    errors: Vec<String>,
    last_success: Option<String>,
}

static STATUS: LazyLock<Mutex<CompilerStatus>> = LazyLock::new(|| Mutex::new(CompilerStatus::new()));

impl CompilerStatus {
    pub const fn new() -> Self {
        Self {
            drawn: 0,
            errors: Vec::new(),
            last_success: None,
        }
    }

    /// Show a success line. A repeat of the line on screen is skipped.
    pub fn compiled(&mut self, message: &str) {
        self.errors.clear();
        if self.last_success.as_deref() == Some(message) && self.drawn > 0 {
            return;
        }
        self.last_success = Some(message.to_owned());
        self.render(&"✓".green().to_string(), message);
    }

    /// Add an error line to the current failure block.
    pub fn failed(&mut self, line: &str) {
        self.last_success = None;
        self.errors.push(line.to_owned());
        let block = self.errors.join("\n");
        self.render(&"✗".red().to_string(), &block);
    }

    /// Keep the block on screen and start a fresh one below it.
    pub fn detach(&mut self) {
        self.drawn = 0;
        self.errors.clear();
        self.last_success = None;
    }

    fn render(&mut self, mark: &str, body: &str) {
        let mut out = stdout().lock();
        if let Ok(lines) = u16::try_from(self.drawn)
            && lines > 0
        {
            execute!(out, cursor::MoveUp(lines), Clear(ClearType::FromCursorDown)).ok();
        }

        let time = format!("[{}]", clock()).dimmed().to_string();
        writeln!(out, "{time} {mark} {body}").ok();
        out.flush().ok();
        self.drawn = body.lines().count().max(1);
    }
}

pub fn status_compiled(message: &str) {
    STATUS.lock().compiled(message);
}

pub fn status_failed(line: &str) {
    STATUS.lock().failed(line);
}

pub fn status_detach() {
    STATUS.lock().detach();
}
