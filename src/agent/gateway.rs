//! HTTP client for an agent runtime gateway
//!
//! The gateway fronts the managed agent runtime and streams the completion
//! back as newline-delimited JSON.

use super::{ndjson_records, AgentInvoker, EventStream, InvokeError, InvokeRequest};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio_util::io::StreamReader;

pub struct GatewayInvoker {
    client: Client,
    base_url: String,
}

impl GatewayInvoker {
    pub fn new(gateway: &str) -> Result<Self, InvokeError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| InvokeError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: gateway.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, request: &InvokeRequest) -> String {
        format!(
            "{}/agents/{}/agentAliases/{}/sessions/{}/text",
            self.base_url, request.agent_id, request.agent_alias_id, request.session_id
        )
    }
}

#[async_trait]
impl AgentInvoker for GatewayInvoker {
    async fn invoke(&self, request: &InvokeRequest) -> Result<EventStream, InvokeError> {
        let response = self
            .client
            .post(self.endpoint(request))
            .header("accept", "application/x-ndjson")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InvokeError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    InvokeError::network(format!("Connection failed: {e}"))
                } else {
                    InvokeError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| InvokeError::network(format!("Failed to read response: {e}")))?;
            return Err(InvokeError::classify(status.as_u16(), &body));
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(ndjson_records(StreamReader::new(body)))
    }

    fn name(&self) -> &str {
        "gateway"
    }
}
