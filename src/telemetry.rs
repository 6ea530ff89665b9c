//! Best-effort span recording
//!
//! Every classified orchestration step can be forwarded to a [`SpanRecorder`]
//! as a timed span. Recording never fails the caller: errors are logged and
//! dropped by [`record_best_effort`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// One finished span
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanRecord {
    pub name: String,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub metadata: Map<String, Value>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Identifies the invocation a span belongs to
#[derive(Debug, Clone)]
pub struct SpanContext {
    pub trace_id: String,
    pub session_id: String,
}

impl SpanContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
        }
    }
}

/// Span under construction; the clock starts at [`SpanBuilder::start`]
#[derive(Debug, Clone)]
pub struct SpanBuilder {
    name: String,
    input: Option<Value>,
    output: Option<Value>,
    metadata: Map<String, Value>,
    start_time: DateTime<Utc>,
}

impl SpanBuilder {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: None,
            output: None,
            metadata: Map::new(),
            start_time: Utc::now(),
        }
    }

    pub fn input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Stop the clock and stamp the invocation identifiers
    pub fn finish(mut self, ctx: &SpanContext) -> SpanRecord {
        self.metadata
            .insert("trace_id".to_string(), Value::String(ctx.trace_id.clone()));
        self.metadata.insert(
            "session_id".to_string(),
            Value::String(ctx.session_id.clone()),
        );
        SpanRecord {
            name: self.name,
            input: self.input,
            output: self.output,
            metadata: self.metadata,
            start_time: self.start_time,
            end_time: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to serialize span: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write span: {0}")]
    Io(#[from] std::io::Error),
    #[error("telemetry backend rejected span: {0}")]
    Rejected(String),
}

/// Observability backend
pub trait SpanRecorder: Send + Sync {
    fn record(&self, span: &SpanRecord) -> Result<(), TelemetryError>;
}

/// Record `span` if a recorder is configured, logging any failure
pub fn record_best_effort(recorder: Option<&dyn SpanRecorder>, span: &SpanRecord) {
    let Some(recorder) = recorder else {
        return;
    };
    if let Err(e) = recorder.record(span) {
        tracing::warn!(span = %span.name, error = %e, "Failed to record telemetry span");
    }
}

/// JSON form of a span payload, falling back to its `Debug` text
pub fn to_payload<T: Serialize + Debug + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{value:?}")))
}

/// Emits spans as structured log lines
pub struct TracingRecorder;

impl SpanRecorder for TracingRecorder {
    fn record(&self, span: &SpanRecord) -> Result<(), TelemetryError> {
        let duration_ms = (span.end_time - span.start_time).num_milliseconds();
        let input = span.input.clone().unwrap_or_default();
        let output = span.output.clone().unwrap_or_default();
        let metadata = Value::Object(span.metadata.clone());
        tracing::info!(
            target: "agent_trace::telemetry",
            span = %span.name,
            duration_ms,
            input = %input,
            output = %output,
            metadata = %metadata,
            "Span recorded"
        );
        Ok(())
    }
}

/// Appends one JSON object per span to a file.
///
/// Writes happen on a dedicated thread so recording never blocks the async
/// task that produced the span. Dropping the recorder flushes pending spans.
pub struct JsonlRecorder {
    path: PathBuf,
    tx: Option<mpsc::Sender<String>>,
    writer: Option<JoinHandle<()>>,
}

impl JsonlRecorder {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (tx, rx) = mpsc::channel::<String>();
        let writer_path = path.clone();
        let writer = thread::Builder::new()
            .name("telemetry-writer".to_string())
            .spawn(move || write_lines(&writer_path, file, &rx))?;
        Ok(Self {
            path,
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_lines(path: &Path, mut file: File, rx: &mpsc::Receiver<String>) {
    for line in rx {
        if let Err(e) = writeln!(file, "{line}") {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write telemetry span");
        }
    }
}

impl SpanRecorder for JsonlRecorder {
    fn record(&self, span: &SpanRecord) -> Result<(), TelemetryError> {
        let line = serde_json::to_string(span)?;
        self.tx
            .as_ref()
            .and_then(|tx| tx.send(line).ok())
            .ok_or_else(|| {
                TelemetryError::Rejected(format!("{} writer has stopped", self.path.display()))
            })
    }
}

impl Drop for JsonlRecorder {
    fn drop(&mut self) {
        // Closing the channel ends the writer loop
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}
