//! Streamed chat endpoint. Runs the capture rule on the accumulated
//! conversation, then relays model deltas as SSE fragments. Capture and
//! interaction recording are best-effort; only a malformed request or a
//! failure to open the upstream stream stops the response.

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::StreamExt;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use ai_client::Message;
use leadline_common::{capture_score, extract_signals, ChatTurn, CollectedData, InteractionMetadata};

use crate::capture::run_capture;
use crate::store::{NewInteraction, Store};
use crate::AppState;

const CHAT_SYSTEM: &str = "You are the website assistant for a web design and marketing \
    agency. Answer questions about services, pricing, and process concisely and warmly. \
    When it fits the conversation, invite the visitor to share their name, email, and \
    website so the team can follow up. Never invent prices or commitments.";

const SSE_DONE: &str = "[DONE]";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    messages: Vec<IncomingTurn>,
    session_id: String,
}

#[derive(Deserialize)]
pub struct IncomingTurn {
    role: String,
    content: String,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": message})),
    )
        .into_response()
}

fn content_event(delta: &str) -> Event {
    Event::default().data(serde_json::json!({ "content": delta }).to_string())
}

/// Accumulates the reply and writes the interaction row on drop. SSE
/// bodies are dropped without running to completion when the client
/// disconnects, so the write cannot live after the stream loop; tying
/// it to drop covers the completed, interrupted, and abandoned cases
/// alike.
pub struct InteractionRecorder {
    store: Store,
    session_id: String,
    user_message: String,
    lead_id: Option<Uuid>,
    score_snapshot: i32,
    collected: CollectedData,
    conversation: Vec<ChatTurn>,
    reply: String,
}

impl InteractionRecorder {
    pub fn new(
        store: Store,
        session_id: String,
        user_message: String,
        lead_id: Option<Uuid>,
        score_snapshot: i32,
        collected: CollectedData,
        conversation: Vec<ChatTurn>,
    ) -> Self {
        Self {
            store,
            session_id,
            user_message,
            lead_id,
            score_snapshot,
            collected,
            conversation,
            reply: String::new(),
        }
    }

    pub fn push_delta(&mut self, delta: &str) {
        self.reply.push_str(delta);
    }
}

impl Drop for InteractionRecorder {
    fn drop(&mut self) {
        let interaction = finalize_interaction(
            std::mem::take(&mut self.session_id),
            std::mem::take(&mut self.user_message),
            self.lead_id,
            self.score_snapshot,
            std::mem::take(&mut self.collected),
            std::mem::take(&mut self.conversation),
            std::mem::take(&mut self.reply),
        );
        let store = self.store.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    store.insert_interaction_best_effort(&interaction).await;
                });
            }
            Err(_) => {
                warn!(
                    session_id = %interaction.session_id,
                    "No runtime available to record chat interaction"
                );
            }
        }
    }
}

/// Assemble the row for a finished (or abandoned) turn. A partial reply
/// is kept as-is; an empty one leaves the assistant side null.
fn finalize_interaction(
    session_id: String,
    user_message: String,
    lead_id: Option<Uuid>,
    score_snapshot: i32,
    collected: CollectedData,
    mut conversation: Vec<ChatTurn>,
    reply: String,
) -> NewInteraction {
    if !reply.is_empty() {
        conversation.push(ChatTurn::assistant(reply.clone()));
    }
    NewInteraction {
        session_id,
        interaction_type: "chat".to_string(),
        user_message: Some(user_message),
        assistant_message: if reply.is_empty() { None } else { Some(reply) },
        scraped_url: None,
        lead_id,
        metadata: Some(InteractionMetadata {
            conversation,
            collected,
            step: None,
            lead_score: Some(score_snapshot),
        }),
    }
}

pub async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Response {
    let session_id = body.session_id.trim().to_string();
    if session_id.is_empty() {
        return bad_request("sessionId is required");
    }
    if body.messages.is_empty() {
        return bad_request("messages must not be empty");
    }
    let last = &body.messages[body.messages.len() - 1];
    if last.role != "user" {
        return bad_request("The last message must be from the user");
    }

    let user_messages: Vec<&str> = body
        .messages
        .iter()
        .filter(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .collect();

    let outcome = run_capture(&state.store, &state.notifier, &session_id, &user_messages).await;

    // Score snapshot and collected fields recorded alongside the turn.
    let signals = extract_signals(&user_messages);
    let score_snapshot = capture_score(&signals);
    let collected = CollectedData {
        name: signals.name.clone(),
        email: signals.email.clone(),
        phone: signals.phone.clone(),
        url: signals.website.clone(),
        feedback: None,
    };

    let ai_messages: Vec<Message> = body
        .messages
        .iter()
        .map(|m| match m.role.as_str() {
            "assistant" => Message::assistant(m.content.clone()),
            _ => Message::user(m.content.clone()),
        })
        .collect();

    let upstream = match state.ai.chat_stream(CHAT_SYSTEM, &ai_messages).await {
        Ok(s) => s,
        Err(e) => {
            warn!(session_id, error = %e, "Failed to open model stream");
            let events = futures::stream::iter([
                Ok::<_, Infallible>(
                    Event::default().data(
                        serde_json::json!({"error": "The assistant is unavailable right now"})
                            .to_string(),
                    ),
                ),
                Ok(Event::default().data(SSE_DONE)),
            ]);
            return Sse::new(events).into_response();
        }
    };

    let conversation: Vec<ChatTurn> = body
        .messages
        .iter()
        .map(|m| match m.role.as_str() {
            "assistant" => ChatTurn::assistant(m.content.clone()),
            _ => ChatTurn::user(m.content.clone()),
        })
        .collect();
    let mut recorder = InteractionRecorder::new(
        state.store.clone(),
        session_id.clone(),
        last.content.clone(),
        outcome.as_ref().map(|o| o.lead_id),
        score_snapshot,
        collected,
        conversation,
    );

    let events = stream! {
        futures::pin_mut!(upstream);

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(delta) => {
                    recorder.push_delta(&delta);
                    yield Ok::<_, Infallible>(content_event(&delta));
                }
                Err(e) => {
                    warn!(session_id, error = %e, "Model stream interrupted");
                    yield Ok(Event::default().data(
                        serde_json::json!({"error": "Stream interrupted"}).to_string(),
                    ));
                    break;
                }
            }
        }

        // Kick off the write before signalling completion.
        drop(recorder);

        yield Ok(Event::default().data(SSE_DONE));
    };

    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}
