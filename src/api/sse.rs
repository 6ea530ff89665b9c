//! Server-Sent Events support

use crate::trace::DisplayFragment;
use crate::turn::DisplaySink;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// Key sent for errors that have no documented message
pub const UNEXPECTED_ERROR_KEY: &str = "error.unexpected";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Events pushed to the browser during one turn
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    AnswerDelta { text: String },
    Fragment { fragment: DisplayFragment },
    Answer { text: String },
    Error { key: String, message: String },
    Done,
}

/// Forwards live turn output into the SSE channel
pub struct ChannelSink {
    tx: UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }

    /// A closed channel means the client went away; the turn keeps going
    pub fn send(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}

impl DisplaySink for ChannelSink {
    fn partial_answer(&mut self, text: &str) {
        self.send(UiEvent::AnswerDelta {
            text: text.to_string(),
        });
    }

    fn fragment(&mut self, fragment: &DisplayFragment) {
        self.send(UiEvent::Fragment {
            fragment: fragment.clone(),
        });
    }

    fn final_answer(&mut self, text: &str) {
        self.send(UiEvent::Answer {
            text: text.to_string(),
        });
    }
}

/// Convert the turn channel to an SSE stream; it ends when the turn does
pub fn sse_stream(
    rx: UnboundedReceiver<UiEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = UnboundedReceiverStream::new(rx).map(|event| Ok(ui_event_to_axum(event)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn ui_event_to_axum(event: UiEvent) -> Event {
    let (event_type, data) = match event {
        UiEvent::AnswerDelta { text } => (
            "answer_delta",
            json!({
                "type": "answer_delta",
                "text": text
            }),
        ),
        UiEvent::Fragment { fragment } => (
            "fragment",
            json!({
                "type": "fragment",
                "fragment": fragment
            }),
        ),
        UiEvent::Answer { text } => (
            "answer",
            json!({
                "type": "answer",
                "text": text
            }),
        ),
        UiEvent::Error { key, message } => (
            "error",
            json!({
                "type": "error",
                "key": key,
                "message": message
            }),
        ),
        UiEvent::Done => (
            "done",
            json!({
                "type": "done"
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
