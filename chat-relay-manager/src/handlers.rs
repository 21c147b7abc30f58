use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use chat_relay_core::session::DEFAULT_SESSION_ID;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::state::{
    AppState, ChatRequest, ChatResponse, ClearRequest, HistoryMessage, HistoryResponse,
    SessionListResponse,
};

/// Top-level fields of a JSON object body. Empty or unparseable bodies and
/// non-object JSON yield no fields.
fn json_fields(body: &Bytes) -> Map<String, Value> {
    if body.is_empty() {
        return Map::new();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => Map::new(),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparseable request body");
            Map::new()
        }
    }
}

/// A string field; any other JSON type counts as absent
fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name) {
        Some(Value::String(value)) => Some(value.clone()),
        Some(other) => {
            tracing::debug!(field = name, value = %other, "Ignoring non-string field");
            None
        }
        None => None,
    }
}

impl ChatRequest {
    fn from_body(body: &Bytes) -> Self {
        let fields = json_fields(body);
        Self {
            message: string_field(&fields, "message"),
            session_id: string_field(&fields, "session_id"),
            hf_token: string_field(&fields, "hf_token"),
        }
    }
}

impl ClearRequest {
    fn from_body(body: &Bytes) -> Self {
        Self {
            session_id: string_field(&json_fields(body), "session_id"),
        }
    }
}

fn session_or_default(session_id: Option<String>) -> String {
    session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let payload = ChatRequest::from_body(&body);

    let message = payload.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        return Err(ApiError::BadRequest("No message provided".to_string()));
    }
    let session_id = session_or_default(payload.session_id);

    let agent = state.agent_for(payload.hf_token.as_deref())?;
    tracing::info!(session_id = %session_id, chars = message.len(), "Received chat request");

    let reply = agent.chat(&session_id, message).await;

    Ok(Json(ChatResponse {
        response: reply,
        model: agent.model().to_string(),
    }))
}

pub async fn clear_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<serde_json::Value> {
    let session_id = session_or_default(ClearRequest::from_body(&body).session_id);

    match &state.default_agent {
        Some(agent) => agent.clear_memory(&session_id).await,
        None => {
            state.sessions().clear(&session_id).await;
        }
    }
    tracing::info!(session_id = %session_id, "Received clear request");

    Json(serde_json::json!({ "status": "cleared" }))
}

pub async fn list_sessions_handler(State(state): State<AppState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.sessions().session_ids(),
    })
}

pub async fn history_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let messages = state
        .sessions()
        .history(&session_id)
        .await
        .into_iter()
        .map(|turn| HistoryMessage {
            role: turn.role.to_string(),
            content: turn.content,
        })
        .collect();

    Json(HistoryResponse {
        session_id,
        messages,
    })
}

pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.delete_session(&session_id)?;
    tracing::info!(session_id = %session_id, "Deleted session");
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
