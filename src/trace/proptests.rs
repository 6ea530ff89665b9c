//! Property-based tests for trace classification
//!
//! These tests verify invariants that must hold for any payload the agent
//! runtime might send:
//! - Classification never panics, whatever the shape
//! - Output is deterministic (no state leaks between calls)
//! - One classified step per present field, in field-check order
//! - Unparseable model input always degrades to the raw text

use super::*;
use crate::telemetry::SpanContext;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ============================================================================
// Strategies
// ============================================================================

/// Arbitrary JSON, a few levels deep
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 {}\":_]{0,30}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::hash_map("[a-zA-Z]{1,12}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_field_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("modelInvocationInput"),
        Just("modelInvocationOutput"),
        Just("rationale"),
        Just("invocationInput"),
        Just("observation"),
    ]
}

/// An orchestration trace with a random subset of step fields, each holding
/// arbitrary JSON
fn arb_orchestration() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::hash_map(arb_field_name(), arb_json(), 0..5).prop_map(|fields| {
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    })
}

/// Text that is never valid JSON
fn arb_non_json_text() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{0,40}".prop_map(|s| format!("Human: {s} {{"))
}

fn wrap(trace: Map<String, Value>) -> Value {
    json!({ "trace": { "orchestrationTrace": Value::Object(trace) } })
}

fn ctx() -> SpanContext {
    SpanContext::new("proptest")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_arbitrary_payload_never_panics(payload in arb_json()) {
        let _ = classify_trace(&payload, None, &ctx());
        let _ = classify_trace(&json!({"trace": {"orchestrationTrace": payload}}), None, &ctx());
    }

    #[test]
    fn prop_classification_is_deterministic(trace in arb_orchestration()) {
        let payload = wrap(trace);
        let first = classify_trace(&payload, None, &ctx());
        let second = classify_trace(&payload, None, &ctx());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_one_step_per_present_field_in_order(trace in arb_orchestration()) {
        let expected: Vec<StepKind> = StepKind::TRACE_ORDER
            .into_iter()
            .filter(|kind| kind.field_name().is_some_and(|f| trace.contains_key(f)))
            .collect();
        let steps = classify_trace(&wrap(trace), None, &ctx());
        let kinds: Vec<StepKind> = steps.iter().map(|s| s.kind).collect();
        prop_assert_eq!(kinds, expected);
    }

    #[test]
    fn prop_malformed_steps_always_explain_themselves(trace in arb_orchestration()) {
        for step in classify_trace(&wrap(trace), None, &ctx()) {
            if step.step.is_none() {
                prop_assert_eq!(step.fragments.len(), 1);
                prop_assert!(step.fragments[0].is_warning());
            }
        }
    }

    #[test]
    fn prop_unparseable_model_input_is_raw_text(text in arb_non_json_text()) {
        let payload = json!({"trace": {"orchestrationTrace": {"modelInvocationInput": {"text": text.clone()}}}});
        let first = classify_trace(&payload, None, &ctx());
        let second = classify_trace(&payload, None, &ctx());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first[0].fragments[0].blocks, &vec![Block::Text(text)]);
    }

    #[test]
    fn prop_rationale_text_shown_verbatim(text in "[a-zA-Z0-9 .,]{0,60}") {
        let payload = json!({"trace": {"orchestrationTrace": {"rationale": {"text": text.clone()}}}});
        let steps = classify_trace(&payload, None, &ctx());
        prop_assert!(steps[0].fragments[0].expanded);
        prop_assert_eq!(&steps[0].fragments[0].blocks, &vec![Block::Text(text)]);
    }
}
