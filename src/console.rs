//! Scrolling on-screen log
//!
//! Everything the demo has to tell the user ends up here. Lines are kept in a bounded
//! buffer (oldest dropped first) and repainted by whichever loop owns the screen.
//! Each line is mirrored to `tracing` at debug level, so the history shows up in the log
//! output with `RUST_LOG=debug` without cluttering the repainted screen otherwise.

use chrono::Local;
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug)]
struct ConsoleBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
    dirty: bool,
}

/// Shared handle to the log console
#[derive(Clone, Debug)]
pub struct LogConsole {
    inner: Arc<Mutex<ConsoleBuffer>>,
}

impl LogConsole {
    pub fn new(max_lines: usize) -> Self {
        let max_lines = max_lines.max(1);
        Self {
            inner: Arc::new(Mutex::new(ConsoleBuffer {
                lines: VecDeque::with_capacity(max_lines),
                max_lines,
                dirty: true,
            })),
        }
    }

    fn buffer(&self) -> MutexGuard<'_, ConsoleBuffer> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a timestamped line
    pub fn print(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(target: "console", "{}", line);
        self.push(line);
    }

    /// Appends `<operation> failed! <error>`
    pub fn print_failure(&self, operation: &str, error: impl fmt::Display) {
        let line = format!("{} failed! {}", operation, error);
        debug!(target: "console", "{}", line);
        self.push(line);
    }

    fn push(&self, line: String) {
        let stamped = format!("[{}] {}", Local::now().format("%H:%M:%S"), line);
        let mut buffer = self.buffer();
        if buffer.lines.len() == buffer.max_lines {
            buffer.lines.pop_front();
        }
        buffer.lines.push_back(stamped);
        buffer.dirty = true;
    }

    /// Repaints the console if anything was printed since the last draw
    ///
    /// Returns whether a repaint happened.
    pub fn draw(&self, out: &mut impl Write) -> io::Result<bool> {
        let mut buffer = self.buffer();
        if !buffer.dirty {
            return Ok(false);
        }

        out.write_all(CLEAR_SCREEN.as_bytes())?;
        for line in &buffer.lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;

        buffer.dirty = false;
        Ok(true)
    }

    /// Lines currently held, without timestamps
    pub fn lines(&self) -> Vec<String> {
        self.buffer()
            .lines
            .iter()
            .map(|line| match line.split_once("] ") {
                Some((_, text)) => text.to_string(),
                None => line.clone(),
            })
            .collect()
    }
}
