//! HTTP handlers.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::agent::TurnMessage;

use super::{ServerState, SessionEntry, SESSION_TTL};

/// Chat request from the frontend.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation: Vec<TurnMessage>,
    /// Stable id so a preview's pending state survives into the confirm
    /// turn; one shared session when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn chat_handler(
    State(state): State<ServerState>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let Some(message) = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No message provided" })),
        )
            .into_response();
    };
    let session_id = req.session_id.unwrap_or_else(|| "default".to_string());

    // Take the session's state out of the map so the lock is never held
    // across the model or calendar calls.
    let mut session = {
        let mut sessions = state.sessions.lock().await;
        sessions.retain(|_, entry| entry.touched.elapsed() < SESSION_TTL);
        sessions
            .remove(&session_id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    };

    let reply = state
        .assistant
        .handle_turn(message, &req.conversation, &mut session)
        .await;

    let mut sessions = state.sessions.lock().await;
    sessions.insert(
        session_id,
        SessionEntry {
            state: session,
            touched: Instant::now(),
        },
    );

    (StatusCode::OK, Json(reply)).into_response()
}

pub async fn status_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

pub async fn calendar_status_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let connected = state.gateway.is_connected().await;
    Json(json!({ "connected": connected }))
}
