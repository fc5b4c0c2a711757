//! Server-Sent Events stream for live missions.
//!
//! The mission runs on the blocking pool. Each completed transition is
//! serialized there and forwarded over an mpsc channel, so clients see one
//! `update` message per transition in transition order, followed by `[DONE]`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Json;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use researcher::{MissionEvent, MissionProgress, Researcher, error_chain};

use crate::routes::{ApiError, QueryRequest};
use crate::state::AppState;

/// Final message of every mission stream.
pub const DONE: &str = "[DONE]";

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamMessage<'a> {
    Update {
        stage: &'static str,
        data: &'a MissionEvent,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<&'a MissionProgress>,
    },
}

impl StreamMessage<'_> {
    fn encode(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(error = %err, "failed to serialize stream message");
                None
            }
        }
    }
}

/// Sends from the blocking pool until the client goes away.
struct Forwarder {
    tx: mpsc::Sender<String>,
    connected: bool,
}

impl Forwarder {
    fn send(&mut self, message: &StreamMessage<'_>) {
        if !self.connected {
            return;
        }
        if let Some(json) = message.encode()
            && self.tx.blocking_send(json).is_err()
        {
            debug!("stream client disconnected");
            self.connected = false;
        }
    }
}

/// POST /api/research - stream a mission as SSE.
pub async fn research_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let query = request.validated()?;
    info!(query = %query, "starting streamed mission");
    let stream = mission_messages(Arc::clone(&state.researcher), query)
        .map(|data| Ok(Event::default().data(data)));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

/// JSON payloads for one mission, ending with [`DONE`].
///
/// A disconnected client does not stop the mission; remaining messages are
/// dropped.
pub fn mission_messages(researcher: Arc<Researcher>, query: String) -> impl Stream<Item = String> {
    let (tx, mut rx) = mpsc::channel::<String>(32);

    let worker = tokio::task::spawn_blocking(move || {
        let mut forwarder = Forwarder {
            tx,
            connected: true,
        };
        let result = researcher.run(&query, |event| {
            forwarder.send(&StreamMessage::Update {
                stage: event.phase().as_str(),
                data: event,
            });
        });
        if let Err(err) = result {
            let message = error_chain(&err);
            warn!(error = %message, "streamed mission failed");
            forwarder.send(&StreamMessage::Error {
                message,
                progress: Some(err.progress()),
            });
        }
    });

    async_stream::stream! {
        while let Some(message) = rx.recv().await {
            yield message;
        }
        if let Err(err) = worker.await {
            warn!(error = %err, "mission task failed");
            let message = StreamMessage::Error {
                message: format!("mission task failed: {err}"),
                progress: None,
            };
            if let Some(json) = message.encode() {
                yield json;
            }
        }
        yield DONE.to_string();
    }
}
