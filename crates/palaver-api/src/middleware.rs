use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use palaver_types::api::{Claims, Role};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::token;

/// Extract and validate the JWT from the Authorization header. On success the
/// verified claims are inserted as a request extension. Runs on every
/// protected request; there is no server-side session.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    let claims = token::verify(&state.jwt_secret, token).ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Role gate for admin routes. Layered inside `require_auth`, which has
/// already verified the token and stashed the claims.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(ApiError::Unauthenticated)?;

    if claims.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}
