//! External command construction and output filtering.
//!
//! [`Cmd`] collects program, arguments and working directory, then turns
//! into a [`tokio::process::Command`] with both output streams piped so the
//! caller can forward them line by line.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::{Cmd, COMPILER_FILTER};
//!
//! let mut child = Cmd::new(exe)
//!     .args(["watch", "main.typ", "output/p{p}.svg"])
//!     .cwd(root)
//!     .into_command()
//!     .spawn()?;
//!
//! if COMPILER_FILTER.is_benign(&line) { /* status chatter */ }
//! ```

use regex::Regex;
use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
    sync::OnceLock,
};

/// Program, arguments and working directory of a compiler invocation.
#[derive(Debug, Clone, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append `arg`; empty strings are dropped.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.push(arg.as_ref());
        self
    }

    /// Append every non-empty item of `args`.
    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Self {
        args.into_iter().for_each(|arg| self.push(arg.as_ref()));
        self
    }

    /// Run the child inside `dir`.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn push(&mut self, arg: &OsStr) {
        if !arg.is_empty() {
            self.args.push(arg.into());
        }
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Build an async command: stdin closed, stdout and stderr piped, and
    /// the child killed if its handle is dropped.
    pub fn into_command(self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(self.program);
        command
            .args(self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.cwd {
            command.current_dir(dir);
        }
        command
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Classifies compiler output lines.
///
/// Lines starting with one of `skip_prefixes` are routine status chatter: still forwarded,
/// but never surfaced as errors.
pub struct FilterRule {
    /// Prefixes of benign lines.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Blank lines and lines with a skip prefix.
    fn matches(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|prefix| line.starts_with(prefix))
    }

    /// Whether a raw output line is benign once color codes and surrounding
    /// whitespace are removed.
    pub fn is_benign(&self, line: &str) -> bool {
        let plain = strip_ansi(line);
        self.matches(plain.trim())
    }

    /// Lines of `output` that are not benign, joined by newlines.
    pub fn significant(&self, output: &str) -> String {
        output
            .lines()
            .filter(|line| !self.is_benign(line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Watch-mode status lines printed by the compiler on stderr.
pub const COMPILER_FILTER: FilterRule = FilterRule::new(&["watching ", "writing to "]);

/// `s` without ANSI escape sequences.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").ok());
    match re {
        Some(re) => re.replace_all(s, ""),
        None => Cow::Borrowed(s),
    }
}
