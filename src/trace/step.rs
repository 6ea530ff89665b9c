//! Typed view of the fields inside `orchestrationTrace`

use super::fragment::StepKind;
use serde_json::{Map, Value};

/// `invocationInput.invocationType`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationType {
    AgentCollaborator,
    KnowledgeBase,
    ActionGroup,
    Other(String),
}

impl InvocationType {
    pub fn parse(value: &str) -> Self {
        match value {
            "AGENT_COLLABORATOR" => InvocationType::AgentCollaborator,
            "KNOWLEDGE_BASE" => InvocationType::KnowledgeBase,
            "ACTION_GROUP" => InvocationType::ActionGroup,
            other => InvocationType::Other(other.to_string()),
        }
    }
}

/// `observation.type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationType {
    KnowledgeBase,
    AgentCollaborator,
    Other(String),
}

impl ObservationType {
    /// An empty string counts as no type at all
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" => None,
            "KNOWLEDGE_BASE" => Some(ObservationType::KnowledgeBase),
            "AGENT_COLLABORATOR" => Some(ObservationType::AgentCollaborator),
            other => Some(ObservationType::Other(other.to_string())),
        }
    }
}

/// One orchestration step decoded from a trace record
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestrationStep {
    ModelInvocationInput {
        text: String,
    },
    ModelInvocationOutput {
        /// JSON-encoded model response, kept as text until rendering
        raw_response_content: String,
    },
    Rationale {
        text: String,
    },
    InvocationInput {
        invocation_type: Option<InvocationType>,
        payload: Map<String, Value>,
    },
    Observation {
        observation_type: Option<ObservationType>,
        payload: Map<String, Value>,
    },
}

/// Look up one step field.
///
/// `None` when the field is absent, `Some(Err(raw))` when it is present but
/// not shaped like the step it names.
pub(super) fn extract(
    trace: &Map<String, Value>,
    kind: StepKind,
) -> Option<Result<OrchestrationStep, Value>> {
    let raw = trace.get(kind.field_name()?)?;
    Some(decode(kind, raw).ok_or_else(|| raw.clone()))
}

fn decode(kind: StepKind, raw: &Value) -> Option<OrchestrationStep> {
    let field = raw.as_object()?;
    match kind {
        StepKind::ModelInvocationInput => Some(OrchestrationStep::ModelInvocationInput {
            text: string_at(field, "text")?,
        }),
        StepKind::ModelInvocationOutput => {
            let content = field
                .get("rawResponse")
                .and_then(|r| r.get("content"))
                .or_else(|| field.get("rawResponseContent"))?;
            Some(OrchestrationStep::ModelInvocationOutput {
                raw_response_content: content.as_str()?.to_string(),
            })
        }
        StepKind::Rationale => Some(OrchestrationStep::Rationale {
            text: string_at(field, "text")?,
        }),
        StepKind::InvocationInput => Some(OrchestrationStep::InvocationInput {
            invocation_type: field
                .get("invocationType")
                .and_then(Value::as_str)
                .map(InvocationType::parse),
            payload: field.clone(),
        }),
        StepKind::Observation => Some(OrchestrationStep::Observation {
            observation_type: field.get("type").and_then(observation_type),
            payload: field.clone(),
        }),
        StepKind::Chunk | StepKind::Unrecognized => None,
    }
}

/// Falsy values count as no type; other non-strings are kept as their JSON text
fn observation_type(value: &Value) -> Option<ObservationType> {
    match value {
        Value::String(name) => ObservationType::parse(name),
        other if is_truthy(other) => Some(ObservationType::Other(other.to_string())),
        _ => None,
    }
}

/// JSON truthiness: null, false, zero and empty values are falsy
pub(super) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn string_at(field: &Map<String, Value>, key: &str) -> Option<String> {
    field.get(key)?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trace(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_absent_field_is_none() {
        let t = trace(json!({"rationale": {"text": "x"}}));
        assert!(extract(&t, StepKind::Observation).is_none());
        assert!(extract(&t, StepKind::Chunk).is_none());
    }

    #[test]
    fn test_model_output_reads_nested_raw_response() {
        let t = trace(json!({"modelInvocationOutput": {"rawResponse": {"content": "{}"}}}));
        assert_eq!(
            extract(&t, StepKind::ModelInvocationOutput),
            Some(Ok(OrchestrationStep::ModelInvocationOutput {
                raw_response_content: "{}".to_string()
            }))
        );
    }

    #[test]
    fn test_model_output_accepts_flat_spelling() {
        let t = trace(json!({"modelInvocationOutput": {"rawResponseContent": "raw"}}));
        assert_eq!(
            extract(&t, StepKind::ModelInvocationOutput),
            Some(Ok(OrchestrationStep::ModelInvocationOutput {
                raw_response_content: "raw".to_string()
            }))
        );
    }

    #[test]
    fn test_wrong_shape_returns_raw() {
        let t = trace(json!({"rationale": 5, "modelInvocationInput": {"text": 3}}));
        assert_eq!(extract(&t, StepKind::Rationale), Some(Err(json!(5))));
        assert_eq!(
            extract(&t, StepKind::ModelInvocationInput),
            Some(Err(json!({"text": 3})))
        );
    }

    #[test]
    fn test_observation_type_parsing() {
        assert_eq!(ObservationType::parse(""), None);
        assert_eq!(
            ObservationType::parse("FINISH"),
            Some(ObservationType::Other("FINISH".to_string()))
        );
        let t = trace(json!({"observation": {"type": "KNOWLEDGE_BASE"}}));
        let Some(Ok(OrchestrationStep::Observation {
            observation_type, ..
        })) = extract(&t, StepKind::Observation)
        else {
            panic!("expected observation");
        };
        assert_eq!(observation_type, Some(ObservationType::KnowledgeBase));
    }

    #[test]
    fn test_non_string_observation_type_is_kept() {
        let t = trace(json!({"observation": {"type": 5}}));
        let Some(Ok(OrchestrationStep::Observation {
            observation_type, ..
        })) = extract(&t, StepKind::Observation)
        else {
            panic!("expected observation");
        };
        assert_eq!(observation_type, Some(ObservationType::Other("5".to_string())));

        for falsy in [json!(null), json!(false), json!(0), json!([])] {
            let t = trace(json!({"observation": {"type": falsy}}));
            let Some(Ok(OrchestrationStep::Observation {
                observation_type, ..
            })) = extract(&t, StepKind::Observation)
            else {
                panic!("expected observation");
            };
            assert_eq!(observation_type, None);
        }
    }

    #[test]
    fn test_invocation_type_missing() {
        let t = trace(json!({"invocationInput": {}}));
        assert_eq!(
            extract(&t, StepKind::InvocationInput),
            Some(Ok(OrchestrationStep::InvocationInput {
                invocation_type: None,
                payload: Map::new()
            }))
        );
    }
}
