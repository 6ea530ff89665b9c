//! Replays recorded completion streams
//!
//! Useful for demos and for exercising the renderer against captured traces
//! without credentials for a live agent.

use super::{ndjson_records, AgentInvoker, EventStream, InvokeError, InvokeRequest};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::path::{Path, PathBuf};

enum Source {
    File(PathBuf),
    Records(Vec<Value>),
}

/// Answers every invocation with the same recorded stream
pub struct ReplayInvoker {
    source: Source,
}

impl ReplayInvoker {
    /// Replay an NDJSON capture, re-read on every invocation
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            source: Source::File(path.as_ref().to_path_buf()),
        }
    }

    #[allow(dead_code)] // Used by tests and embedders
    pub fn from_records(records: Vec<Value>) -> Self {
        Self {
            source: Source::Records(records),
        }
    }
}

#[async_trait]
impl AgentInvoker for ReplayInvoker {
    async fn invoke(&self, request: &InvokeRequest) -> Result<EventStream, InvokeError> {
        tracing::debug!(session_id = %request.session_id, "Replaying recorded stream");
        match &self.source {
            Source::File(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    InvokeError::unknown(format!(
                        "Failed to open replay file {}: {e}",
                        path.display()
                    ))
                })?;
                Ok(ndjson_records(file))
            }
            Source::Records(records) => {
                Ok(futures::stream::iter(records.clone().into_iter().map(Ok)).boxed())
            }
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}
