/// Diagnostic sinks
///
/// The engine reports its reasoning through a [`DiagnosticSink`] and never
/// touches the filesystem itself. Callers choose where the trail goes.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::events::EngineEvent;

const LOG_TARGET_ENGINE: &str = "hoop_highlights::engine";

/// Receiver of engine diagnostic events
pub trait DiagnosticSink: Send {
    fn publish(&mut self, event: &EngineEvent);

    /// Push out anything buffered
    fn flush(&mut self) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn publish(&mut self, _event: &EngineEvent) {}
}

/// Forwards events to `tracing`: frame traces at debug, the rest at info
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn publish(&mut self, event: &EngineEvent) {
        if event.is_frame_trace() {
            tracing::debug!(target: LOG_TARGET_ENGINE, "{}", event.description());
        } else {
            tracing::info!(target: LOG_TARGET_ENGINE, "{}", event.description());
        }
    }
}

/// Persists every event as one JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: BufWriter<W>,
    failed: bool,
}

impl JsonLinesSink<File> {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            failed: false,
        }
    }

    pub fn into_inner(mut self) -> std::io::Result<W> {
        self.writer.flush()?;
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    fn write_event(&mut self, event: &EngineEvent) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write + Send> DiagnosticSink for JsonLinesSink<W> {
    fn publish(&mut self, event: &EngineEvent) {
        if self.failed {
            return;
        }
        // Frame processing must not stop because the trail cannot be written
        if let Err(e) = self.write_event(event) {
            tracing::warn!("Diagnostic trail disabled after write error: {}", e);
            self.failed = true;
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Failed to flush diagnostic trail: {}", e);
        }
    }
}

/// Fan one event stream out to several sinks
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn DiagnosticSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl DiagnosticSink for FanoutSink {
    fn publish(&mut self, event: &EngineEvent) {
        for sink in self.sinks.iter_mut() {
            sink.publish(event);
        }
    }

    fn flush(&mut self) {
        for sink in self.sinks.iter_mut() {
            sink.flush();
        }
    }
}
