use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use anyhow::anyhow;
use tracing::{error, info, warn};
use uuid::Uuid;

use palaver_types::api::{AdminChatRecord, AdminUserRecord, Role};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::parse_db_timestamp;

/// All users with derived chat counts, newest account first.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!(e))
        })??;

    let users: Vec<AdminUserRecord> = rows
        .into_iter()
        .map(|row| AdminUserRecord {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt user id '{}': {}", row.id, e);
                Uuid::default()
            }),
            role: Role::parse(&row.role).unwrap_or_else(|| {
                warn!("Unknown role '{}' on user '{}'", row.role, row.id);
                Role::User
            }),
            created_at: parse_db_timestamp(&row.created_at, &row.id),
            username: row.username,
            email: row.email,
            chat_count: row.chat_count.max(0) as u64,
        })
        .collect();

    Ok(Json(users))
}

/// Every chat with the owning username joined in, newest first.
pub async fn list_chats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_chats())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!(e))
        })??;

    let chats: Vec<AdminChatRecord> = rows
        .into_iter()
        .map(|row| AdminChatRecord {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt chat id '{}': {}", row.id, e);
                Uuid::default()
            }),
            user_id: row.user_id.parse().unwrap_or_else(|e| {
                warn!("Corrupt user_id '{}' on chat '{}': {}", row.user_id, row.id, e);
                Uuid::default()
            }),
            created_at: parse_db_timestamp(&row.created_at, &row.id),
            username: row.username,
            message: row.message,
            response: row.response,
        })
        .collect();

    Ok(Json(chats))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let chat_id = id.clone();
    let deleted = tokio::task::spawn_blocking(move || db.db.delete_chat(&chat_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!(e))
        })??;

    if !deleted {
        return Err(ApiError::NotFound("Chat"));
    }

    info!("Admin deleted chat {}", id);
    Ok(Json(serde_json::json!({ "message": "Chat deleted successfully" })))
}

/// Deletes the user and, through ON DELETE CASCADE, every chat they own.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = id.clone();
    let deleted = tokio::task::spawn_blocking(move || db.db.delete_user(&user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!(e))
        })??;

    if !deleted {
        return Err(ApiError::NotFound("User"));
    }

    info!("Admin deleted user {} (chats cascaded)", id);
    Ok(Json(serde_json::json!({ "message": "User deleted successfully" })))
}
