//! Mock collaborators for testing
//!
//! These mocks let the driver and API run without a live agent runtime.

use super::DisplaySink;
use crate::agent::{AgentInvoker, EventStream, InvokeError, InvokeRequest};
use crate::telemetry::{SpanRecord, SpanRecorder, TelemetryError};
use crate::trace::DisplayFragment;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Fixtures
// ============================================================================

/// A trace record carrying only a rationale
pub fn rationale_record(text: &str) -> Value {
    json!({"trace": {"trace": {"orchestrationTrace": {"rationale": {"text": text}}}}})
}

pub fn stream_of(items: Vec<Result<Value, InvokeError>>) -> EventStream {
    futures::stream::iter(items).boxed()
}

pub fn test_request(text: &str) -> InvokeRequest {
    InvokeRequest {
        agent_id: "AGENT".to_string(),
        agent_alias_id: "ALIAS".to_string(),
        session_id: "session-test".to_string(),
        enable_trace: true,
        input_text: text.to_string(),
    }
}

// ============================================================================
// Recording Sink
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Partial(String),
    Fragment(DisplayFragment),
    Final(String),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn fragments(&self) -> Vec<DisplayFragment> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Fragment(fragment) => Some(fragment.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySink for RecordingSink {
    fn partial_answer(&mut self, text: &str) {
        self.events.push(SinkEvent::Partial(text.to_string()));
    }

    fn fragment(&mut self, fragment: &DisplayFragment) {
        self.events.push(SinkEvent::Fragment(fragment.clone()));
    }

    fn final_answer(&mut self, text: &str) {
        self.events.push(SinkEvent::Final(text.to_string()));
    }
}

// ============================================================================
// Span Recorders
// ============================================================================

#[derive(Default)]
pub struct MemoryRecorder {
    spans: Mutex<Vec<SpanRecord>>,
}

impl MemoryRecorder {
    pub fn names(&self) -> Vec<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .map(|span| span.name.clone())
            .collect()
    }

    pub fn last(&self) -> Option<SpanRecord> {
        self.spans.lock().unwrap().last().cloned()
    }
}

impl SpanRecorder for MemoryRecorder {
    fn record(&self, span: &SpanRecord) -> Result<(), TelemetryError> {
        self.spans.lock().unwrap().push(span.clone());
        Ok(())
    }
}

/// Rejects every span
pub struct FailingRecorder;

impl SpanRecorder for FailingRecorder {
    fn record(&self, _span: &SpanRecord) -> Result<(), TelemetryError> {
        Err(TelemetryError::Rejected("telemetry backend offline".to_string()))
    }
}

// ============================================================================
// Scripted Invoker
// ============================================================================

type Scripted = Result<Vec<Result<Value, InvokeError>>, InvokeError>;

/// Invoker that replays queued streams, one per call
#[derive(Default)]
pub struct ScriptedInvoker {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<InvokeRequest>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful invocation yielding these items
    pub fn queue_events(&self, items: Vec<Result<Value, InvokeError>>) {
        self.responses.lock().unwrap().push_back(Ok(items));
    }

    /// Queue an invocation that fails before streaming
    pub fn queue_error(&self, error: InvokeError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<InvokeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(&self, request: &InvokeRequest) -> Result<EventStream, InvokeError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InvokeError::unknown("No scripted response queued")));
        next.map(stream_of)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
