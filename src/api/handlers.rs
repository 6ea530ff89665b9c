//! HTTP request handlers

use super::sse::{sse_stream, ChannelSink, UiEvent, UNEXPECTED_ERROR_KEY, UNEXPECTED_ERROR_MESSAGE};
use super::types::{ChatRequest, ErrorResponse, HealthResponse, MessagesResponse, SessionResponse};
use super::AppState;
use crate::agent::InvokeRequest;
use crate::turn::{run_turn, TurnOutcome};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id/messages", get(get_messages))
        .route("/api/sessions/:id/chat", post(send_chat))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session_id = state.sessions.create().await;
    Json(SessionResponse { session_id })
}

async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, AppError> {
    let messages = state
        .sessions
        .messages(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;

    Ok(Json(MessagesResponse {
        session_id: id,
        messages,
    }))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }
    if !state.sessions.contains(&id).await {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }

    state.sessions.append_user(&id, req.text.as_str()).await;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(run_chat_turn(state, id, req.text, ChannelSink::new(tx)));

    Ok(sse_stream(rx).into_response())
}

/// Run one turn to the end, whether or not anyone is still listening
async fn run_chat_turn(state: AppState, session_id: String, text: String, mut sink: ChannelSink) {
    let request = InvokeRequest {
        agent_id: state.target.agent_id.clone(),
        agent_alias_id: state.target.agent_alias_id.clone(),
        session_id: session_id.clone(),
        enable_trace: state.target.enable_trace,
        input_text: text,
    };

    let result = run_turn(
        state.invoker.as_ref(),
        &request,
        &mut sink,
        state.recorder.as_deref(),
    )
    .await;

    let answer = match result {
        Ok(TurnOutcome::Completed(transcript)) => {
            tracing::info!(
                session_id = %session_id,
                fragments = transcript.fragments.len(),
                "Turn completed"
            );
            Some(transcript.answer)
        }
        Ok(TurnOutcome::Rejected(fault)) => {
            sink.send(UiEvent::Error {
                key: fault.message_key().to_string(),
                message: fault.user_message().to_string(),
            });
            Some(fault.partial.answer).filter(|answer| !answer.is_empty())
        }
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Turn failed");
            sink.send(UiEvent::Error {
                key: UNEXPECTED_ERROR_KEY.to_string(),
                message: UNEXPECTED_ERROR_MESSAGE.to_string(),
            });
            None
        }
    };

    if let Some(answer) = answer {
        state.sessions.append_assistant(&session_id, answer).await;
    }
    sink.send(UiEvent::Done);
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
