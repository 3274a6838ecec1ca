use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use anyhow::anyhow;
use tracing::{error, warn};
use uuid::Uuid;

use palaver_types::api::{ChatRecord, Claims, SendChatRequest, SendChatResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiJson};
use crate::parse_db_timestamp;

/// Relay the message to the completion provider, then persist the pair.
/// Strictly in that order: on provider failure nothing is written, so a chat
/// row always holds both the message and its response.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required".into()));
    }

    let response = state
        .completion
        .relay(&req.message)
        .await
        .map_err(|e| ApiError::Internal(anyhow!(e)))?;

    let chat_id = Uuid::new_v4();

    // Run blocking DB insert off the async runtime
    let db = state.clone();
    let cid = chat_id.to_string();
    let uid = claims.sub.to_string();
    let message = req.message;
    let reply = response.clone();
    tokio::task::spawn_blocking(move || db.db.insert_chat(&cid, &uid, &message, &reply))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!(e))
        })??;

    Ok((StatusCode::OK, Json(SendChatResponse { response })))
}

/// The caller's chat history, newest first.
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.get_chats_by_user(&uid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!(e))
        })??;

    let chats: Vec<ChatRecord> = rows
        .into_iter()
        .map(|row| ChatRecord {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt chat id '{}': {}", row.id, e);
                Uuid::default()
            }),
            user_id: claims.sub,
            created_at: parse_db_timestamp(&row.created_at, &row.id),
            message: row.message,
            response: row.response,
        })
        .collect();

    Ok(Json(chats))
}
