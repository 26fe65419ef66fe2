//! Log sinks for request outcomes and server lifecycle messages.
//!
//! The server never writes these lines through a global logger: every
//! component receives the [`LogSinks`] it should use. Diagnostic output that
//! is not part of the server's contract still goes through the `log` facade.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// A destination for complete log lines.
///
/// Implementations must serialize concurrent writers so lines never
/// interleave.
pub trait LogSink: Send + Sync {
    /// Write one line. The line carries no trailing newline.
    fn write_line(&self, line: &str);
}

/// A sink writing `PREFIX timestamp line` records to any writer.
pub struct WriterSink {
    prefix: &'static str,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WriterSink {
    /// Create a sink that prefixes each line with `prefix`.
    pub fn new(prefix: &'static str, writer: impl Write + Send + 'static) -> Self {
        Self {
            prefix,
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// `INFO: ` records on standard output.
    pub fn stdout() -> Self {
        Self::new("INFO: ", io::stdout())
    }

    /// `ERROR: ` records on standard error.
    pub fn stderr() -> Self {
        Self::new("ERROR: ", io::stderr())
    }
}

impl LogSink for WriterSink {
    fn write_line(&self, line: &str) {
        let timestamp = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
        // A poisoned lock only means another writer panicked mid-line.
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(writer, "{}{} {}", self.prefix, timestamp, line).and_then(|_| writer.flush()) {
            log::warn!("Failed to write log line: {e}");
        }
    }
}

/// A sink that keeps every line in memory.
///
/// Handy for tests and for embedding the server where lines are collected
/// by the caller.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the lines written so far.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(line.to_string());
    }
}

/// The pair of sinks the server writes to.
#[derive(Clone)]
pub struct LogSinks {
    /// Access log, startup and stop lines.
    pub info: Arc<dyn LogSink>,
    /// Mapped request errors and lifecycle failures.
    pub error: Arc<dyn LogSink>,
}

impl LogSinks {
    pub fn new(info: Arc<dyn LogSink>, error: Arc<dyn LogSink>) -> Self {
        Self { info, error }
    }

    /// Info lines to stdout, error lines to stderr.
    pub fn stdio() -> Self {
        Self::new(Arc::new(WriterSink::stdout()), Arc::new(WriterSink::stderr()))
    }

    pub fn info(&self, line: impl AsRef<str>) {
        self.info.write_line(line.as_ref());
    }

    pub fn error(&self, line: impl AsRef<str>) {
        self.error.write_line(line.as_ref());
    }
}

impl Default for LogSinks {
    fn default() -> Self {
        Self::stdio()
    }
}

impl fmt::Debug for LogSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSinks").finish_non_exhaustive()
    }
}
