//! HTTP API for the agent chat
//!
//! Each chat turn streams its answer and trace fragments back as SSE.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::agent::AgentInvoker;
use crate::session::SessionStore;
use crate::telemetry::SpanRecorder;
use std::sync::Arc;

/// Which agent every turn is sent to
#[derive(Debug, Clone)]
pub struct AgentTarget {
    pub agent_id: String,
    pub agent_alias_id: String,
    pub enable_trace: bool,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub invoker: Arc<dyn AgentInvoker>,
    pub recorder: Option<Arc<dyn SpanRecorder>>,
    pub sessions: Arc<SessionStore>,
    pub target: AgentTarget,
}

impl AppState {
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        recorder: Option<Arc<dyn SpanRecorder>>,
        target: AgentTarget,
    ) -> Self {
        Self {
            invoker,
            recorder,
            sessions: Arc::new(SessionStore::new()),
            target,
        }
    }
}
