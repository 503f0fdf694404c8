// crates/core/src/console.rs
//! Structured console sink for collaborator output.
//!
//! Instead of printing to stdout (and having the caller redirect it behind
//! their back), every collaborator takes a `&dyn Console` and writes lines
//! and progress milestones through it. The job engine backs the sink with
//! its per-job event channel; tests back it with a plain `Vec`.
//!
//! [`AnsiLineBuffer`] is the adapter for output we *don't* control:
//! subprocess stdout/stderr arrives as raw byte chunks, gets split into
//! lines, stripped of terminal escape sequences, trimmed, and forwarded as
//! `info` lines — with any unterminated tail flushed when the process ends.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Severity of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Sink for collaborator output. Implementations must not block: a push
/// to the job event channel and an append to the log history both return
/// immediately regardless of attached readers.
pub trait Console: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    /// Report a progress milestone (0–100, collaborator-specific
    /// checkpoints). `title` labels the phase for the progress bar.
    fn progress(&self, value: u8, title: Option<&str>);

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn success(&self, message: &str) {
        self.log(LogLevel::Success, message);
    }

    fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// A `Console` that discards everything. Useful for probes where the
/// caller only wants the return value.
pub struct NullConsole;

impl Console for NullConsole {
    fn log(&self, _level: LogLevel, _message: &str) {}
    fn progress(&self, _value: u8, _title: Option<&str>) {}
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // CSI sequences (colors, cursor movement) plus stray single-char escapes.
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b.").expect("valid ANSI regex"))
}

/// Strip terminal escape sequences from a line.
pub fn strip_ansi(s: &str) -> String {
    ansi_re().replace_all(s, "").into_owned()
}

/// Clean one raw output line: drop escapes, trim whitespace (including any
/// `\r` from progress redraws). Returns `None` when nothing is left.
pub fn clean_line(raw: &str) -> Option<String> {
    let cleaned = strip_ansi(raw);
    let trimmed = cleaned.trim().trim_matches('\r').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Accumulates raw output bytes and yields cleaned, complete lines.
///
/// Splitting happens only at `\n`, so multi-byte characters spanning read
/// chunks are never broken; each complete line is decoded lossily on its
/// own. Call [`AnsiLineBuffer::finish`] when the stream ends to flush a
/// trailing line that never got its newline.
#[derive(Debug, Default)]
pub struct AnsiLineBuffer {
    pending: Vec<u8>,
}

impl AnsiLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes; returns the cleaned lines it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let raw = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                if let Some(line) = clean_line(&raw) {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flush the unterminated tail, if any survives cleaning.
    pub fn finish(mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        clean_line(&raw)
    }
}
