//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use incident_core::{IncidentError, PortError, Principal, Role, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::middleware::session_cookie;
use crate::web::state::AppState;

const SESSION_DAYS: i64 = 30;
const MIN_PASSWORD_LEN: usize = 7;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `public` or `official`.
    #[serde(default = "default_user_type")]
    pub user_type: String,
    /// Required when `user_type` is `official`.
    pub admin_key: Option<String>,
}

fn default_user_type() -> String {
    Role::Public.as_str().to_string()
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: String,
}

impl From<User> for AuthResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            email: user.email,
            user_type: user.role.as_str().to_string(),
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// A validated signup: trimmed name, lowercased email and the requested role.
#[derive(Debug, PartialEq)]
struct ValidSignup {
    name: String,
    email: String,
    role: Role,
}

fn validate_signup(req: &SignupRequest, admin_key: Option<&str>) -> Result<ValidSignup, IncidentError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(IncidentError::invalid("name is required"));
    }
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(IncidentError::invalid("a valid email is required"));
    }
    check_password_length(&req.password)?;

    let role = match Role::parse(&req.user_type) {
        Some(Role::Public) => Role::Public,
        Some(Role::Official) => {
            let expected = admin_key.ok_or_else(|| {
                IncidentError::Forbidden("official signup is disabled".to_string())
            })?;
            if req.admin_key.as_deref() != Some(expected) {
                return Err(IncidentError::Forbidden("invalid admin key".to_string()));
            }
            Role::Official
        }
        _ => {
            return Err(IncidentError::invalid(format!(
                "user_type must be 'public' or 'official', got '{}'",
                req.user_type
            )))
        }
    };

    Ok(ValidSignup {
        name: name.to_string(),
        email,
        role,
    })
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?
        .to_string())
}

fn password_matches(password: &str, hashed_password: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hashed_password)
        .map_err(|e| ApiError::Internal(format!("Failed to parse password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn check_password_length(password: &str) -> Result<(), IncidentError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IncidentError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn session_cookie_header(auth_session_id: &str, max_age_seconds: i64) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id, max_age_seconds
    )
}

/// Creates a session row for the user and returns the `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    state
        .store(
            "create auth session",
            state.db.create_auth_session(&auth_session_id, user_id, expires_at),
        )
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            ApiError::from(e)
        })?;
    Ok(session_cookie_header(
        &auth_session_id,
        Duration::days(SESSION_DAYS).num_seconds(),
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request or email already registered", body = crate::error::ErrorBody),
        (status = 403, description = "Official signup without a valid admin key", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signup = validate_signup(&req, state.config.admin_key.as_deref())?;

    let password_hash = hash_password(&req.password)?;

    let user = state
        .store(
            "create user",
            state
                .db
                .create_user(&signup.name, &signup.email, &password_hash, signup.role),
        )
        .await?;
    let cookie = start_session(&state, user.id).await?;

    info!("Registered {} user {}", user.role.as_str(), user.email);
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(user)),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let creds = match state
        .store("load user", state.db.get_user_by_email(&email))
        .await
    {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(IncidentError::Unauthenticated.into()),
        Err(e) => return Err(e.into()),
    };

    if !password_matches(&req.password, &creds.hashed_password)? {
        return Err(IncidentError::Unauthenticated.into());
    }

    let cookie = start_session(&state, creds.user.id).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(creds.user)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = crate::error::ErrorBody)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth_session_id = session_cookie(&headers).ok_or(IncidentError::Unauthenticated)?;
    state
        .store("delete auth session", state.db.delete_auth_session(auth_session_id))
        .await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie_header("", 0))],
    ))
}

/// POST /auth/change-password - Replace the caller's password
#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "New password too short", body = crate::error::ErrorBody),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
        (status = 403, description = "Current password is incorrect", body = crate::error::ErrorBody)
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    check_password_length(&req.new_password)?;

    let creds = state
        .store("load user", state.db.get_user_by_email(&principal.email))
        .await?;
    if !password_matches(&req.current_password, &creds.hashed_password)? {
        return Err(IncidentError::Forbidden("current password is incorrect".to_string()).into());
    }

    let password_hash = hash_password(&req.new_password)?;
    let updated = state
        .store(
            "update password",
            state.db.update_password(creds.user.id, &password_hash),
        )
        .await?;
    if !updated {
        return Err(IncidentError::not_found(format!("user {}", principal.email)).into());
    }
    info!("Password changed for {}", principal.email);
    Ok(StatusCode::NO_CONTENT)
}
