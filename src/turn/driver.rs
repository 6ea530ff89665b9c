//! Stream driver for one user turn
//!
//! Pulls records off the completion stream in arrival order, feeds chunks to
//! the [`Accumulator`] and traces to the classifier, and settles the turn once
//! the stream ends or the service raises an exception.

use super::accumulator::Accumulator;
use super::DisplaySink;
use crate::agent::{AgentInvoker, InvokeError, InvokeRequest, ServiceErrorKind};
use crate::event::{decode_record, AgentEvent};
use crate::telemetry::{self, SpanBuilder, SpanContext, SpanRecorder};
use crate::trace::{classify_trace, DisplayFragment, StepKind};
use futures::{Stream, StreamExt};
use serde_json::Value;

/// Everything one turn produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub answer: String,
    pub fragments: Vec<DisplayFragment>,
}

/// A documented service exception that ended the turn
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFault {
    pub kind: ServiceErrorKind,
    /// Error text from the service, for logs
    pub detail: String,
    /// What had been streamed before the exception
    pub partial: Transcript,
}

impl ServiceFault {
    pub fn message_key(&self) -> &'static str {
        self.kind.message_key()
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed(Transcript),
    Rejected(ServiceFault),
}

impl TurnOutcome {
    pub fn transcript(&self) -> &Transcript {
        match self {
            TurnOutcome::Completed(transcript) => transcript,
            TurnOutcome::Rejected(fault) => &fault.partial,
        }
    }
}

struct TurnState<'s> {
    accumulator: Accumulator,
    fragments: Vec<DisplayFragment>,
    sink: &'s mut dyn DisplaySink,
}

impl<'s> TurnState<'s> {
    fn new(sink: &'s mut dyn DisplaySink) -> Self {
        Self {
            accumulator: Accumulator::new(),
            fragments: Vec::new(),
            sink,
        }
    }

    fn emit(&mut self, fragment: DisplayFragment) {
        self.sink.fragment(&fragment);
        self.fragments.push(fragment);
    }

    fn handle(
        &mut self,
        event: AgentEvent,
        recorder: Option<&dyn SpanRecorder>,
        ctx: &SpanContext,
    ) {
        match event {
            AgentEvent::Chunk { bytes } => match self.accumulator.push_chunk(&bytes) {
                Ok(_) => {
                    let partial = self.accumulator.with_cursor();
                    self.sink.partial_answer(&partial);
                }
                Err(e) => {
                    tracing::warn!(error = %e, len = e.bytes.len(), "Undecodable answer chunk");
                    self.emit(e.to_fragment());
                }
            },
            AgentEvent::MalformedChunk { raw } => {
                tracing::warn!("Chunk event without decodable bytes");
                self.emit(DisplayFragment::warning(
                    StepKind::Chunk,
                    "Chunk event without decodable bytes",
                    raw,
                ));
            }
            AgentEvent::Trace { payload } => {
                for step in classify_trace(&payload, recorder, ctx) {
                    for fragment in step.fragments {
                        self.emit(fragment);
                    }
                }
            }
            AgentEvent::Unrecognized { keys, raw } => {
                tracing::warn!(?keys, "Unrecognized agent event");
                let message = if keys.is_empty() {
                    "Unrecognized event (not a JSON object)".to_string()
                } else {
                    format!("Unrecognized event keys: {}", keys.join(", "))
                };
                self.emit(DisplayFragment::warning(StepKind::Unrecognized, message, raw));
            }
        }
    }

    /// Replace the streaming cursor with the final text
    fn finish(self) -> Transcript {
        self.sink.final_answer(self.accumulator.answer());
        self.into_transcript()
    }

    /// End the turn without showing a final answer
    fn abandon(self) -> Transcript {
        tracing::debug!(
            chunks = self.accumulator.chunk_count(),
            "Abandoning partial answer"
        );
        self.into_transcript()
    }

    fn into_transcript(self) -> Transcript {
        Transcript {
            answer: self.accumulator.into_answer(),
            fragments: self.fragments,
        }
    }
}

/// Consume one completion stream to the end.
///
/// Documented service exceptions settle the turn as
/// [`TurnOutcome::Rejected`]; any other error is returned unchanged.
pub async fn drive_turn<S>(
    mut events: S,
    sink: &mut dyn DisplaySink,
    recorder: Option<&dyn SpanRecorder>,
    ctx: &SpanContext,
) -> Result<TurnOutcome, InvokeError>
where
    S: Stream<Item = Result<Value, InvokeError>> + Unpin,
{
    let mut turn = TurnState::new(sink);

    while let Some(item) = events.next().await {
        match item.and_then(decode_record) {
            Ok(decoded) => {
                for event in decoded {
                    turn.handle(event, recorder, ctx);
                }
            }
            Err(e) => {
                let partial = if e.service_kind().is_some() {
                    turn.finish()
                } else {
                    turn.abandon()
                };
                return settle_error(e, partial, recorder, ctx);
            }
        }
    }

    tracing::debug!(
        chunks = turn.accumulator.chunk_count(),
        fragments = turn.fragments.len(),
        warnings = turn.fragments.iter().filter(|f| f.is_warning()).count(),
        "Completion stream exhausted"
    );
    Ok(TurnOutcome::Completed(turn.finish()))
}

/// Invoke the agent and drive its stream, recording the root
/// `agent_invocation` span around the whole turn
pub async fn run_turn(
    invoker: &dyn AgentInvoker,
    request: &InvokeRequest,
    sink: &mut dyn DisplaySink,
    recorder: Option<&dyn SpanRecorder>,
) -> Result<TurnOutcome, InvokeError> {
    let ctx = SpanContext::new(request.session_id.as_str());
    let root = SpanBuilder::start("agent_invocation")
        .input(Value::String(request.input_text.clone()))
        .meta("agent_id", request.agent_id.as_str())
        .meta("agent_alias_id", request.agent_alias_id.as_str());

    let outcome = match invoker.invoke(request).await {
        Ok(events) => drive_turn(events, sink, recorder, &ctx).await,
        Err(e) => settle_error(e, Transcript::default(), recorder, &ctx),
    };

    let root = match &outcome {
        Ok(TurnOutcome::Completed(transcript)) => root
            .output(Value::String(transcript.answer.clone()))
            .meta("outcome", "completed"),
        Ok(TurnOutcome::Rejected(fault)) => root
            .meta("outcome", "rejected")
            .meta("error", fault.message_key()),
        Err(e) => root
            .meta("outcome", "failed")
            .meta("error", e.message.as_str()),
    };
    telemetry::record_best_effort(recorder, &root.finish(&ctx));

    outcome
}

fn settle_error(
    error: InvokeError,
    partial: Transcript,
    recorder: Option<&dyn SpanRecorder>,
    ctx: &SpanContext,
) -> Result<TurnOutcome, InvokeError> {
    let Some(kind) = error.service_kind() else {
        tracing::error!(
            error = %error,
            kind = ?error.kind,
            partial_len = partial.answer.len(),
            "Agent invocation failed"
        );
        let span = SpanBuilder::start("unhandled_error")
            .output(Value::String(error.message.clone()))
            .meta("level", "error")
            .finish(ctx);
        telemetry::record_best_effort(recorder, &span);
        return Err(error);
    };

    tracing::warn!(
        key = kind.message_key(),
        retryable = kind.is_retryable(),
        error = %error,
        "Agent invocation rejected by service"
    );
    let span = SpanBuilder::start(kind.span_name())
        .output(Value::String(error.message.clone()))
        .meta("level", "error")
        .finish(ctx);
    telemetry::record_best_effort(recorder, &span);

    Ok(TurnOutcome::Rejected(ServiceFault {
        kind,
        detail: error.message,
        partial,
    }))
}
