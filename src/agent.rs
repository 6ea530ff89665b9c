//! Agent runtime clients
//!
//! An [`AgentInvoker`] starts one invocation and hands back the raw completion
//! stream: one JSON record per event, in arrival order. Decoding and rendering
//! happen downstream in [`crate::turn`].

mod error;
mod gateway;
mod ndjson;
mod replay;

#[allow(unused_imports)] // Public API re-exports
pub use error::{InvokeError, InvokeErrorKind, ServiceErrorKind};
pub use gateway::GatewayInvoker;
pub(crate) use ndjson::ndjson_records;
pub use replay::ReplayInvoker;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Raw completion records for one invocation
pub type EventStream = BoxStream<'static, Result<Value, InvokeError>>;

/// One call into the agent runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    #[serde(skip)]
    pub agent_id: String,
    #[serde(skip)]
    pub agent_alias_id: String,
    #[serde(skip)]
    pub session_id: String,
    pub enable_trace: bool,
    pub input_text: String,
}

/// Starts agent invocations
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Start an invocation; errors here mean nothing was streamed
    async fn invoke(&self, request: &InvokeRequest) -> Result<EventStream, InvokeError>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: AgentInvoker + ?Sized> AgentInvoker for Arc<T> {
    async fn invoke(&self, request: &InvokeRequest) -> Result<EventStream, InvokeError> {
        (**self).invoke(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logs every invocation start with its timing
pub struct LoggingInvoker {
    inner: Arc<dyn AgentInvoker>,
    name: String,
}

impl LoggingInvoker {
    pub fn new(inner: Arc<dyn AgentInvoker>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl AgentInvoker for LoggingInvoker {
    async fn invoke(&self, request: &InvokeRequest) -> Result<EventStream, InvokeError> {
        let start = std::time::Instant::now();
        let result = self.inner.invoke(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    backend = %self.name,
                    agent_id = %request.agent_id,
                    session_id = %request.session_id,
                    duration_ms = %duration.as_millis(),
                    "Agent invocation started"
                );
            }
            Err(e) => {
                tracing::error!(
                    backend = %self.name,
                    agent_id = %request.agent_id,
                    session_id = %request.session_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.service_kind().is_some_and(ServiceErrorKind::is_retryable),
                    "Agent invocation failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}
