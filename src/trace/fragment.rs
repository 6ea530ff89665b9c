//! Display fragments handed to the chat UI

use serde::Serialize;
use serde_json::Value;

/// What produced a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ModelInvocationInput,
    ModelInvocationOutput,
    Rationale,
    InvocationInput,
    Observation,
    Chunk,
    Unrecognized,
}

impl StepKind {
    /// Orchestration fields, in the order they are checked
    pub const TRACE_ORDER: [StepKind; 5] = [
        StepKind::ModelInvocationInput,
        StepKind::ModelInvocationOutput,
        StepKind::Rationale,
        StepKind::InvocationInput,
        StepKind::Observation,
    ];

    /// Key of this step inside `orchestrationTrace`
    pub fn field_name(self) -> Option<&'static str> {
        match self {
            StepKind::ModelInvocationInput => Some("modelInvocationInput"),
            StepKind::ModelInvocationOutput => Some("modelInvocationOutput"),
            StepKind::Rationale => Some("rationale"),
            StepKind::InvocationInput => Some("invocationInput"),
            StepKind::Observation => Some("observation"),
            StepKind::Chunk | StepKind::Unrecognized => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::ModelInvocationInput => "model_invocation_input",
            StepKind::ModelInvocationOutput => "model_invocation_output",
            StepKind::Rationale => "rationale",
            StepKind::InvocationInput => "invocation_input",
            StepKind::Observation => "observation",
            StepKind::Chunk => "chunk",
            StepKind::Unrecognized => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// Rendered content inside a fragment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Block {
    Text(String),
    /// Pretty-printed by the UI
    Structured(Value),
    Warning(String),
}

/// One expandable panel in the chat transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFragment {
    pub kind: StepKind,
    pub label: String,
    pub expanded: bool,
    pub severity: Severity,
    pub blocks: Vec<Block>,
}

impl DisplayFragment {
    /// Collapsed, informational, no content yet
    pub fn new(kind: StepKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            expanded: false,
            severity: Severity::Info,
            blocks: Vec::new(),
        }
    }

    /// A diagnostic: the message plus a raw dump of the payload that caused it.
    /// Warnings are always shown expanded.
    pub fn warning(kind: StepKind, message: impl Into<String>, raw: Value) -> Self {
        let message = message.into();
        Self {
            kind,
            label: format!("⚠️ {message}"),
            expanded: true,
            severity: Severity::Warning,
            blocks: vec![Block::Warning(message), Block::Structured(raw)],
        }
    }

    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Text(text.into()));
        self
    }

    pub fn with_structured(mut self, value: Value) -> Self {
        self.blocks.push(Block::Structured(value));
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}
