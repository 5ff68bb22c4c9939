//! Authentication API endpoints
//!
//! - POST /api/v1/auth/login - Log in, set the session cookie
//! - POST /api/v1/auth/logout - End the session
//! - GET /api/v1/auth/me - Current profile
//! - GET /api/v1/auth/setup - Whether any account exists yet
//! - POST /api/v1/auth/setup - Create the first (admin) account

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateUserInput, Role, User};
use crate::services::user::LoginInput;

/// Request body for the first account
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub designation: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.to_string(),
            designation: user.designation,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SetupStatusResponse {
    pub has_users: bool,
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/setup", get(setup_status).post(setup))
}

fn session_cookie(token: &str, ttl_hours: i64) -> Result<HeaderValue, ApiError> {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token,
        ttl_hours * 60 * 60
    );
    HeaderValue::from_str(&cookie).map_err(|_| ApiError::internal_error("Invalid session token"))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, user) = state.user_service.login(body).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&session.id, state.auth.session_ttl_hours)?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let token = crate::api::middleware::extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/v1/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// GET /api/v1/auth/setup
async fn setup_status(State(state): State<AppState>) -> Result<Json<SetupStatusResponse>, ApiError> {
    let count = state.user_service.count_users().await?;
    Ok(Json(SetupStatusResponse { has_users: count > 0 }))
}

/// POST /api/v1/auth/setup
///
/// Only allowed while the store has no accounts; the account created is an
/// admin. Later accounts are created from Settings.
async fn setup(
    State(state): State<AppState>,
    Json(body): Json<SetupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if state.user_service.count_users().await? > 0 {
        return Err(ApiError::forbidden("Setup has already been completed"));
    }

    let user = state
        .user_service
        .create_user(CreateUserInput {
            name: body.name,
            email: body.email.clone(),
            password: body.password.clone(),
            role: Role::Admin,
            designation: None,
        })
        .await?;

    let (session, _) = state
        .user_service
        .login(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&session.id, state.auth.session_ttl_hours)?,
    );

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}
