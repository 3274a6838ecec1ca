use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use anyhow::anyhow;
use uuid::Uuid;

use palaver_db::{Database, is_unique_violation};
use palaver_relay::CompletionClient;
use palaver_types::api::{
    CreateAdminResponse, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Role,
    UserProfile,
};

use crate::error::{ApiError, ApiJson};
use crate::token;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub completion: CompletionClient,
}

fn validate_signup(req: &RegisterRequest) -> Result<(), ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::BadRequest(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {}", e)))?
        .to_string();
    Ok(hash)
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&req)?;

    // Friendly pre-check. Two concurrent registrations can both pass it; the
    // UNIQUE columns on users are what actually holds the line below.
    if state.db.user_exists(&req.username, &req.email)? {
        return Err(ApiError::BadRequest(
            "User with this email or username already exists".into(),
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    if let Err(err) = state.db.create_user(
        &user_id.to_string(),
        &req.username,
        &req.email,
        &password_hash,
        Role::User.as_str(),
    ) {
        if is_unique_violation(&err) {
            return Err(ApiError::BadRequest(
                "User with this email or username already exists".into(),
            ));
        }
        return Err(err.into());
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".into(),
            user: UserProfile {
                id: user_id,
                username: req.username,
                email: req.email,
                role: Role::User,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_identifier(&req.username)?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow!("corrupt user id '{}': {}", user.id, e)))?;
    let role = Role::parse(&user.role)
        .ok_or_else(|| ApiError::Internal(anyhow!("unknown role '{}'", user.role)))?;

    let token = token::issue(&state.jwt_secret, user_id, &user.username, role)?;

    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token,
        user: UserProfile {
            id: user_id,
            username: user.username,
            email: user.email,
            role,
        },
    }))
}

/// One-time bootstrap of the first ADMIN account. Open by design — it only
/// works while no admin exists, and the single-admin partial index closes the
/// race between two concurrent calls.
pub async fn create_admin(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&req)?;

    if state.db.admin_exists()? {
        return Err(ApiError::BadRequest("Admin user already exists".into()));
    }

    if state.db.user_exists(&req.username, &req.email)? {
        return Err(ApiError::BadRequest(
            "User with this email or username already exists".into(),
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let admin_id = Uuid::new_v4();

    if let Err(err) = state.db.create_user(
        &admin_id.to_string(),
        &req.username,
        &req.email,
        &password_hash,
        Role::Admin.as_str(),
    ) {
        if is_unique_violation(&err) {
            // Lost a race on either the admin index or the unique columns.
            let message = if state.db.admin_exists()? {
                "Admin user already exists"
            } else {
                "User with this email or username already exists"
            };
            return Err(ApiError::BadRequest(message.into()));
        }
        return Err(err.into());
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            message: "Admin user created successfully".into(),
            admin: UserProfile {
                id: admin_id,
                username: req.username,
                email: req.email,
                role: Role::Admin,
            },
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_password_salts_and_verifies() {
        let first = hash_password("hunter2-hunter2").unwrap();
        let second = hash_password("hunter2-hunter2").unwrap();
        // Fresh OS-sourced salt per hash
        assert_ne!(first, second);

        let parsed = PasswordHash::new(&first).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"hunter2-hunter2", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong-password", &parsed)
                .is_err()
        );
    }
}
