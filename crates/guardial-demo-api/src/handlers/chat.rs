//! Prompt-guarded chat endpoint

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::state::AppState;

/// Model name reported to Guardial as prompt context.
pub const MODEL: &str = "gpt-4";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// POST /api/chat
///
/// The message is checked by the prompt guard before it would reach a model.
/// Rejected prompts get 403 with the reasons Guardial gave.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    if request.message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "message is required" })),
        );
    }

    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let mut context = Map::new();
    context.insert("user_id".to_string(), Value::from(user_id));
    context.insert("model".to_string(), Value::from(MODEL));

    let result = state.guardial.guard_prompt(request.message, Some(context)).await;

    if !result.allowed {
        tracing::warn!(reasons = ?result.reasons, "LLM prompt blocked");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Prompt blocked by security analysis",
                "reasons": result.reasons,
            })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "response": "This is a simulated LLM response",
            "analysis": result,
        })),
    )
}
