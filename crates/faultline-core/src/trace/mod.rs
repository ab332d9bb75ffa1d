//! The instrumentation sink.
//!
//! The instrumented program calls `trace(name, value)` for every assignment;
//! the collector appends `name = value` to a per-test in-memory buffer and,
//! when configured, to a buffered log file. `flush` hands the buffer to the
//! caller and clears it between tests. The shared handle serializes callers
//! behind one mutex, so a threaded host cannot interleave lines.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Separator written between tests; the aggregator skips these lines.
pub const TEST_SEPARATOR: &str = "-----";

pub struct TraceCollector {
    writer: Option<BufWriter<File>>,
    buffer: Vec<String>,
}

impl Default for TraceCollector {
    fn default() -> Self {
        TraceCollector::new()
    }
}

impl TraceCollector {
    /// In-memory collector.
    pub fn new() -> Self {
        TraceCollector {
            writer: None,
            buffer: Vec::new(),
        }
    }

    /// Collector that mirrors every line into `path`.
    pub fn with_log_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        Ok(TraceCollector {
            writer: Some(BufWriter::new(file)),
            buffer: Vec::new(),
        })
    }

    /// Record one `name = value` line.
    pub fn trace(&mut self, name: &str, value: impl Display) {
        let line = format!("{name} = {value}");
        if let Some(writer) = &mut self.writer {
            // A failed mirror write loses the file copy only.
            let _ = writeln!(writer, "{line}");
        }
        self.buffer.push(line);
    }

    /// Drain and return the per-test buffer.
    pub fn flush(&mut self) -> Vec<String> {
        if let Some(writer) = &mut self.writer {
            let _ = writeln!(writer, "{TEST_SEPARATOR}");
            let _ = writer.flush();
        }
        std::mem::take(&mut self.buffer)
    }

    /// Release the sink, flushing any file writer.
    pub fn close(mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| Error::io("trace log", e))?;
        }
        Ok(())
    }
}

/// Process-wide serialized handle.
#[derive(Clone, Default)]
pub struct SharedCollector {
    inner: Arc<Mutex<TraceCollector>>,
}

impl SharedCollector {
    pub fn new() -> Self {
        SharedCollector::default()
    }

    pub fn trace(&self, name: &str, value: impl Display) {
        self.inner.lock().trace(name, value);
    }

    pub fn flush(&self) -> Vec<String> {
        self.inner.lock().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_recorded_in_order() {
        let mut collector = TraceCollector::new();
        collector.trace("x_0", 4);
        collector.trace("P1_1", false);
        collector.trace("result_3", 7);
        assert_eq!(
            collector.flush(),
            vec!["x_0 = 4", "P1_1 = false", "result_3 = 7"]
        );
    }

    #[test]
    fn test_flush_clears_buffer() {
        let mut collector = TraceCollector::new();
        collector.trace("a", 1);
        assert_eq!(collector.flush().len(), 1);
        assert!(collector.flush().is_empty());
    }

    #[test]
    fn test_log_file_mirrors_lines_with_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        let mut collector = TraceCollector::with_log_file(&path).unwrap();
        collector.trace("a", 1);
        collector.flush();
        collector.trace("b", 2);
        collector.flush();
        collector.close().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a = 1\n-----\nb = 2\n-----\n");
    }

    #[test]
    fn test_shared_collector_serializes() {
        let shared = SharedCollector::new();
        shared.trace("a", 1);
        let other = shared.clone();
        other.trace("b", true);
        assert_eq!(shared.flush(), vec!["a = 1", "b = true"]);
    }
}
