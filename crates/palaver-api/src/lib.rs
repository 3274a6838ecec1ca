pub mod admin;
pub mod auth;
pub mod chat;
pub mod error;
pub mod middleware;
pub mod token;

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use tracing::warn;

use crate::auth::AppState;
use crate::error::ApiError;

/// Assemble the full HTTP surface. CORS/trace layers are the binary's job.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/setup/admin", post(auth::create_admin))
        .route("/health", get(health))
        .with_state(state.clone());

    let user = Router::new()
        .route("/api/chat", post(chat::send_message))
        .route("/api/chat/history", get(chat::history))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state.clone());

    let admin = Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}", delete(admin::delete_user))
        .route("/api/admin/chats", get(admin::list_chats))
        .route("/api/admin/chats/{id}", delete(admin::delete_chat))
        .layer(from_fn(middleware::require_admin))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(user)
        .merge(admin)
        .fallback(fallback)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn fallback() -> ApiError {
    ApiError::NotFound("Route")
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Try RFC 3339 first, then parse as naive UTC and convert.
pub(crate) fn parse_db_timestamp(raw: &str, row_id: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on row '{}': {}", raw, row_id, e);
            chrono::DateTime::default()
        })
}
