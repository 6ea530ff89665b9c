//! Orchestration trace classification
//!
//! Turns `orchestrationTrace` payloads into display fragments for the chat UI
//! and, optionally, telemetry spans.

mod classify;
mod fragment;
mod step;

#[cfg(test)]
mod proptests;

pub use classify::classify_trace;
#[allow(unused_imports)] // Public API re-exports
pub use fragment::{Block, DisplayFragment, Severity, StepKind};
#[allow(unused_imports)] // Public API re-exports
pub use step::{InvocationType, ObservationType, OrchestrationStep};
