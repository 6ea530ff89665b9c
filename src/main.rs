//! Agent Trace - chat front end for a multi-agent runtime
//!
//! Streams agent answers to the browser and renders the orchestration trace
//! (model reasoning, sub-agent calls, knowledge base lookups) alongside them.

mod agent;
mod api;
mod config;
mod event;
mod session;
mod telemetry;
mod trace;
mod turn;

use agent::{AgentInvoker, GatewayInvoker, LoggingInvoker, ReplayInvoker};
use api::{create_router, AgentTarget, AppState};
use config::{AppConfig, Backend};
use std::net::SocketAddr;
use std::sync::Arc;
use telemetry::{JsonlRecorder, SpanRecorder, TracingRecorder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_trace=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;

    let backend: Arc<dyn AgentInvoker> = match &config.backend {
        Backend::Replay(path) => {
            tracing::info!(path = %path.display(), "Replaying recorded agent stream");
            Arc::new(ReplayInvoker::from_file(path))
        }
        Backend::Gateway(url) => {
            tracing::info!(gateway = %url, "Using agent gateway");
            Arc::new(GatewayInvoker::new(url)?)
        }
    };
    let invoker: Arc<dyn AgentInvoker> = Arc::new(LoggingInvoker::new(backend));

    let recorder: Arc<dyn SpanRecorder> = match &config.telemetry_file {
        Some(path) => {
            let recorder = JsonlRecorder::open(path)?;
            tracing::info!(path = %recorder.path().display(), "Recording telemetry spans");
            Arc::new(recorder)
        }
        None => Arc::new(TracingRecorder),
    };

    let state = AppState::new(
        invoker,
        Some(recorder),
        AgentTarget {
            agent_id: config.agent_id.clone(),
            agent_alias_id: config.agent_alias_id.clone(),
            enable_trace: config.enable_trace,
        },
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        agent_id = %config.agent_id,
        agent_alias_id = %config.agent_alias_id,
        "Agent trace server listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
