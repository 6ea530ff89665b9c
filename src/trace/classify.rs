//! Trace record classification
//!
//! A single `orchestrationTrace` may carry several step fields at once. Each
//! present field is checked on its own, in [`StepKind::TRACE_ORDER`], and
//! rendered independently; one field never hides another.
//!
//! Nothing in here fails: payloads that do not parse are shown as raw text,
//! and payloads with an unexpected shape become a warning plus a raw dump.

use super::fragment::{Block, DisplayFragment, StepKind};
use super::step::{self, is_truthy, InvocationType, ObservationType, OrchestrationStep};
use crate::telemetry::{self, SpanBuilder, SpanContext, SpanRecorder};
use serde_json::{Map, Value};

const UNKNOWN_AGENT: &str = "unknown agent";
const UNKNOWN_INPUT: &str = "input unknown";
const UNKNOWN_OUTPUT: &str = "output unknown";

/// Fragments produced for one orchestration field
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedStep {
    pub kind: StepKind,
    /// `None` when the field was present but malformed
    pub step: Option<OrchestrationStep>,
    pub fragments: Vec<DisplayFragment>,
}

/// Rendering of one step, plus the span to record for it
struct Rendered {
    fragments: Vec<DisplayFragment>,
    span: Option<SpanBuilder>,
}

impl Rendered {
    fn shown(fragment: DisplayFragment, span: SpanBuilder) -> Self {
        Self {
            fragments: vec![fragment],
            span: Some(span),
        }
    }

    fn warning(fragment: DisplayFragment) -> Self {
        Self {
            fragments: vec![fragment],
            span: None,
        }
    }

    fn nothing() -> Self {
        Self {
            fragments: Vec::new(),
            span: None,
        }
    }
}

/// Classify the payload of one `trace` record.
///
/// `payload` is the value under the record's top-level `trace` key. Records
/// without an `orchestrationTrace` are not relevant and yield nothing.
pub fn classify_trace(
    payload: &Value,
    recorder: Option<&dyn SpanRecorder>,
    ctx: &SpanContext,
) -> Vec<ClassifiedStep> {
    let Some(orchestration) = payload
        .get("trace")
        .and_then(|t| t.get("orchestrationTrace"))
    else {
        tracing::debug!("Trace record without orchestrationTrace, skipping");
        return Vec::new();
    };

    let Some(trace) = orchestration.as_object() else {
        return vec![ClassifiedStep {
            kind: StepKind::Unrecognized,
            step: None,
            fragments: vec![DisplayFragment::warning(
                StepKind::Unrecognized,
                "orchestrationTrace is not an object",
                orchestration.clone(),
            )],
        }];
    };

    StepKind::TRACE_ORDER
        .into_iter()
        .filter_map(|kind| {
            let field = step::extract(trace, kind)?;
            Some(match field {
                Ok(step) => {
                    let rendered = render(&step);
                    if let Some(span) = rendered.span {
                        let span = span.meta("step", kind.as_str()).finish(ctx);
                        telemetry::record_best_effort(recorder, &span);
                    }
                    ClassifiedStep {
                        kind,
                        step: Some(step),
                        fragments: rendered.fragments,
                    }
                }
                Err(raw) => ClassifiedStep {
                    kind,
                    step: None,
                    fragments: vec![DisplayFragment::warning(
                        kind,
                        format!(
                            "Unexpected '{}' trace structure",
                            kind.field_name().unwrap_or_default()
                        ),
                        raw,
                    )],
                },
            })
        })
        .collect()
}

fn render(step: &OrchestrationStep) -> Rendered {
    match step {
        OrchestrationStep::ModelInvocationInput { text } => render_model_input(text),
        OrchestrationStep::ModelInvocationOutput {
            raw_response_content,
        } => render_model_output(raw_response_content),
        OrchestrationStep::Rationale { text } => Rendered::shown(
            DisplayFragment::new(StepKind::Rationale, "✅ Decided on the next action")
                .expanded()
                .with_text(text.clone()),
            SpanBuilder::start("rationale").input(telemetry::to_payload(text)),
        ),
        OrchestrationStep::InvocationInput {
            invocation_type,
            payload,
        } => render_invocation_input(invocation_type.as_ref(), payload),
        OrchestrationStep::Observation {
            observation_type,
            payload,
        } => render_observation(observation_type.as_ref(), payload),
    }
}

fn render_model_input(text: &str) -> Rendered {
    let span = SpanBuilder::start("model_invocation");
    let fragment = DisplayFragment::new(StepKind::ModelInvocationInput, "🤔 Thinking…");
    match serde_json::from_str::<Value>(text) {
        Ok(parsed) => Rendered::shown(
            fragment.with_structured(parsed.clone()),
            span.input(parsed),
        ),
        Err(_) => Rendered::shown(
            fragment.with_text(text),
            span.input(telemetry::to_payload(text)),
        ),
    }
}

fn render_model_output(raw: &str) -> Rendered {
    let block = model_output_block(raw);
    let output = match &block {
        Block::Text(text) => Value::String(text.clone()),
        Block::Structured(value) => value.clone(),
        Block::Warning(message) => Value::String(message.clone()),
    };
    Rendered::shown(
        DisplayFragment::new(StepKind::ModelInvocationOutput, "💡 Finished thinking")
            .with_block(block),
        SpanBuilder::start("model_invocation_output").output(output),
    )
}

/// `content[0].text` when it has something to say, else `content[0]` itself;
/// the raw string whenever the response does not have that shape.
fn model_output_block(raw: &str) -> Block {
    let Ok(parsed) = serde_json::from_str::<Value>(raw) else {
        return Block::Text(raw.to_string());
    };
    let Some(first) = parsed.get("content").and_then(|content| content.get(0)) else {
        return Block::Text(raw.to_string());
    };
    match first.get("text") {
        Some(Value::String(text)) if !text.is_empty() => Block::Text(text.clone()),
        Some(text) if is_truthy(text) => Block::Structured(text.clone()),
        Some(_) => Block::Structured(first.clone()),
        None => Block::Text(raw.to_string()),
    }
}

fn render_invocation_input(
    invocation_type: Option<&InvocationType>,
    payload: &Map<String, Value>,
) -> Rendered {
    match invocation_type {
        Some(InvocationType::AgentCollaborator) => {
            let Some(input) = nested(payload, "agentCollaboratorInvocationInput") else {
                return missing_key(
                    StepKind::InvocationInput,
                    "AGENT_COLLABORATOR invocation",
                    "agentCollaboratorInvocationInput",
                    payload,
                );
            };
            let name = str_or(input.get("agentCollaboratorName"), UNKNOWN_AGENT);
            let text = str_or(input.get("input").and_then(|i| i.get("text")), UNKNOWN_INPUT);
            Rendered::shown(
                DisplayFragment::new(
                    StepKind::InvocationInput,
                    format!("🤖 Calling sub-agent \"{name}\"…"),
                )
                .expanded()
                .with_text(text),
                SpanBuilder::start(format!("agent_call_{name}")).input(telemetry::to_payload(text)),
            )
        }
        Some(InvocationType::KnowledgeBase) => {
            let Some(input) = nested(payload, "knowledgeBaseLookupInput") else {
                return missing_key(
                    StepKind::InvocationInput,
                    "KNOWLEDGE_BASE invocation",
                    "knowledgeBaseLookupInput",
                    payload,
                );
            };
            let text = str_or(input.get("text"), UNKNOWN_INPUT);
            let mut span =
                SpanBuilder::start("knowledge_base_query").input(telemetry::to_payload(text));
            if let Some(id) = input.get("knowledgeBaseId").and_then(Value::as_str) {
                span = span.meta("knowledge_base_id", id);
            }
            Rendered::shown(
                DisplayFragment::new(StepKind::InvocationInput, "📖 Searching the knowledge base…")
                    .with_text(text),
                span,
            )
        }
        Some(InvocationType::ActionGroup) => {
            let Some(input) = nested(payload, "actionGroupInvocationInput") else {
                return missing_key(
                    StepKind::InvocationInput,
                    "ACTION_GROUP invocation",
                    "actionGroupInvocationInput",
                    payload,
                );
            };
            let input = Value::Object(input.clone());
            Rendered::shown(
                DisplayFragment::new(StepKind::InvocationInput, "💻 Running action group…")
                    .with_structured(input.clone()),
                SpanBuilder::start("action_group_call").input(input),
            )
        }
        Some(InvocationType::Other(other)) => {
            tracing::debug!(invocation_type = %other, "No renderer for invocation type");
            Rendered::nothing()
        }
        None => {
            tracing::debug!("Invocation input without invocationType");
            Rendered::nothing()
        }
    }
}

fn render_observation(
    observation_type: Option<&ObservationType>,
    payload: &Map<String, Value>,
) -> Rendered {
    match observation_type {
        Some(ObservationType::KnowledgeBase) => {
            let Some(output) = nested(payload, "knowledgeBaseLookupOutput") else {
                return missing_key(
                    StepKind::Observation,
                    "KNOWLEDGE_BASE observation",
                    "knowledgeBaseLookupOutput",
                    payload,
                );
            };
            let references = output
                .get("retrievedReferences")
                .filter(|refs| !refs.is_null())
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new()));
            Rendered::shown(
                DisplayFragment::new(
                    StepKind::Observation,
                    "🔍 Retrieved knowledge base results",
                )
                .with_structured(references.clone()),
                SpanBuilder::start("knowledge_base_lookup").output(references),
            )
        }
        Some(ObservationType::AgentCollaborator) => {
            let Some(output) = nested(payload, "agentCollaboratorInvocationOutput") else {
                return missing_key(
                    StepKind::Observation,
                    "AGENT_COLLABORATOR observation",
                    "agentCollaboratorInvocationOutput",
                    payload,
                );
            };
            let name = str_or(output.get("agentCollaboratorName"), UNKNOWN_AGENT);
            let text = str_or(
                output.get("output").and_then(|o| o.get("text")),
                UNKNOWN_OUTPUT,
            );
            Rendered::shown(
                DisplayFragment::new(
                    StepKind::Observation,
                    format!("🤖 Sub-agent \"{name}\" responded"),
                )
                .expanded()
                .with_text(text),
                SpanBuilder::start(format!("agent_response_{name}"))
                    .output(telemetry::to_payload(text)),
            )
        }
        Some(ObservationType::Other(other)) => Rendered::warning(DisplayFragment::warning(
            StepKind::Observation,
            format!("Unsupported observation type: {other}"),
            Value::Object(payload.clone()),
        )),
        None => Rendered::warning(DisplayFragment::warning(
            StepKind::Observation,
            "Observation has no 'type' value",
            Value::Object(payload.clone()),
        )),
    }
}

fn nested<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    payload.get(key)?.as_object()
}

fn str_or<'a>(value: Option<&'a Value>, default: &'a str) -> &'a str {
    value.and_then(Value::as_str).unwrap_or(default)
}

fn missing_key(
    kind: StepKind,
    context: &str,
    key: &str,
    payload: &Map<String, Value>,
) -> Rendered {
    Rendered::warning(DisplayFragment::warning(
        kind,
        format!("Unexpected {context} structure: '{key}' not found"),
        Value::Object(payload.clone()),
    ))
}
