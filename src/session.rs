//! Chat history per agent session
//!
//! The agent runtime keeps its own conversational memory keyed by session id;
//! this is the local transcript shown back to the user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    pub session_id: String,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Fresh session with a random id
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::User, text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::Assistant, text));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory sessions, lost on restart
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and return its id
    pub async fn create(&self) -> String {
        let session = ChatSession::new();
        let id = session.session_id.clone();
        self.sessions.write().await.insert(id.clone(), session);
        tracing::info!(session_id = %id, "Created chat session");
        id
    }

    /// History of a known session
    pub async fn messages(&self, id: &str) -> Option<Vec<ChatMessage>> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|session| session.messages().to_vec())
    }

    /// Snapshot of the session, creating it under this id if unknown
    #[allow(dead_code)] // API completeness
    pub async fn get_or_create(&self, id: &str) -> ChatSession {
        self.sessions
            .write()
            .await
            .entry(id.to_string())
            .or_insert_with(|| ChatSession::with_id(id))
            .clone()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn append_user(&self, id: &str, text: impl Into<String>) {
        self.with_session(id, |session| session.push_user(text)).await;
    }

    pub async fn append_assistant(&self, id: &str, text: impl Into<String>) {
        self.with_session(id, |session| session.push_assistant(text)).await;
    }

    /// Run `f` on a session, creating it if needed
    async fn with_session(&self, id: &str, f: impl FnOnce(&mut ChatSession)) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| ChatSession::with_id(id));
        f(session);
    }
}
