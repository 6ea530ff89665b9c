//! Wire records emitted by the agent runtime
//!
//! Each record on the completion stream is a JSON object keyed by its event
//! type: `{"chunk": {"bytes": ...}}`, `{"trace": {...}}`, or an exception
//! such as `{"throttlingException": {"message": ...}}`.

use crate::agent::{InvokeError, ServiceErrorKind};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

/// One decoded event from the completion stream
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A piece of the final answer
    Chunk { bytes: Vec<u8> },
    /// A `chunk` record whose `bytes` could not be decoded
    MalformedChunk { raw: Value },
    /// A trace record; the payload is the value of the `trace` key
    Trace { payload: Value },
    /// Neither a chunk nor a trace. `keys` is empty for non-object records.
    Unrecognized { keys: Vec<String>, raw: Value },
}

/// Decode one wire record.
///
/// `trace` and `chunk` are checked independently, trace first, so a record
/// carrying both yields two events. Exception records become an error of the
/// matching kind.
pub fn decode_record(record: Value) -> Result<Vec<AgentEvent>, InvokeError> {
    let Value::Object(fields) = &record else {
        return Ok(vec![AgentEvent::Unrecognized {
            keys: Vec::new(),
            raw: record,
        }]);
    };

    if let Some((name, body)) = fields
        .iter()
        .find(|(name, _)| name.ends_with("Exception"))
    {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let text = format!("{name}: {message}");
        return Err(match ServiceErrorKind::from_exception_name(name) {
            Some(kind) => InvokeError::service(kind, text),
            None => InvokeError::unknown(text),
        });
    }

    let mut events = Vec::new();

    if let Some(payload) = fields.get("trace") {
        events.push(AgentEvent::Trace {
            payload: payload.clone(),
        });
    }

    if let Some(chunk) = fields.get("chunk") {
        events.push(match chunk_bytes(chunk) {
            Some(bytes) => AgentEvent::Chunk { bytes },
            None => AgentEvent::MalformedChunk { raw: chunk.clone() },
        });
    }

    if events.is_empty() {
        let mut keys: Vec<String> = fields.keys().cloned().collect();
        keys.sort();
        events.push(AgentEvent::Unrecognized { keys, raw: record });
    }

    Ok(events)
}

/// `bytes` is base64 on the JSON wire; a plain byte array is accepted too.
fn chunk_bytes(chunk: &Value) -> Option<Vec<u8>> {
    match chunk.get("bytes")? {
        Value::String(encoded) => STANDARD.decode(encoded).ok(),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect(),
        _ => None,
    }
}

/// Build a chunk record the way the runtime encodes it
#[cfg(test)]
pub fn chunk_record(text: &str) -> Value {
    serde_json::json!({ "chunk": { "bytes": STANDARD.encode(text) } })
}
