//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session token to profile; redirect to login otherwise)
//! - Authorization (section gate from the navigation tree)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{AuthConfig, Config};
use crate::db::repositories::{
    SqlxFinanceRepository, SqlxLeaveRepository, SqlxSessionRepository, SqlxStockRepository,
    SqlxStudentRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::access::{default_navigation, AccessControl};
use crate::services::user::{AuthError, UserService, UserServiceError};
use crate::services::{
    FinanceError, FinanceService, LeaveError, LeaveService, StockError, StockService,
    StudentError, StudentService, ViewService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthConfig>,
    pub access: Arc<AccessControl>,
    pub user_service: Arc<UserService>,
    pub view_service: Arc<ViewService>,
    pub student_service: Arc<StudentService>,
    pub leave_service: Arc<LeaveService>,
    pub stock_service: Arc<StockService>,
    pub finance_service: Arc<FinanceService>,
}

impl AppState {
    /// Wire repositories and services over one store
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let student_repo = SqlxStudentRepository::boxed(pool.clone());
        let leave_repo = SqlxLeaveRepository::boxed(pool.clone());
        let stock_repo = SqlxStockRepository::boxed(pool.clone());
        let finance_repo = SqlxFinanceRepository::boxed(pool);

        Self {
            auth: Arc::new(config.auth.clone()),
            access: Arc::new(AccessControl::new(default_navigation())),
            user_service: Arc::new(UserService::with_session_ttl(
                user_repo,
                session_repo,
                config.auth.session_ttl_hours,
            )),
            view_service: Arc::new(ViewService::new(
                student_repo.clone(),
                leave_repo.clone(),
                stock_repo.clone(),
                finance_repo.clone(),
                config.metrics.clone(),
                config.views.clone(),
            )),
            student_service: Arc::new(StudentService::new(student_repo.clone())),
            leave_service: Arc::new(LeaveService::new(leave_repo.clone())),
            stock_service: Arc::new(StockService::new(
                stock_repo,
                config.metrics.low_stock_threshold,
            )),
            finance_service: Arc::new(FinanceService::new(finance_repo, student_repo, leave_repo)),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the cause and hide it from the client
    fn internal(error: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", error);
        Self::internal_error("Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

// ============================================================================
// Service error mapping
// ============================================================================

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<StudentError> for ApiError {
    fn from(e: StudentError) -> Self {
        match e {
            StudentError::NotFound(_) | StudentError::CourseNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            StudentError::ValidationError(msg) => ApiError::validation_error(msg),
            StudentError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<LeaveError> for ApiError {
    fn from(e: LeaveError) -> Self {
        match e {
            LeaveError::NotFound(_) | LeaveError::FacultyNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            LeaveError::AlreadyDecided { .. } => ApiError::conflict(e.to_string()),
            LeaveError::ValidationError(msg) => ApiError::validation_error(msg),
            LeaveError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<StockError> for ApiError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::ItemNotFound(_) | StockError::RequisitionNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            StockError::DuplicateCode(_) | StockError::AlreadyDecided { .. } => {
                ApiError::conflict(e.to_string())
            }
            StockError::InsufficientStock {
                requested,
                available,
            } => ApiError::with_details(
                "CONFLICT",
                e.to_string(),
                serde_json::json!({ "requested": requested, "available": available }),
            ),
            StockError::ValidationError(msg) => ApiError::validation_error(msg),
            StockError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<FinanceError> for ApiError {
    fn from(e: FinanceError) -> Self {
        match e {
            FinanceError::StudentNotFound(_) | FinanceError::FacultyNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            FinanceError::ValidationError(msg) => ApiError::validation_error(msg),
            FinanceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Extract session token from request
pub(crate) fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
///
/// No session, an expired session and a session without a profile all end
/// in a redirect to the login page. None of them falls back to a role.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_session_token(&request) else {
        return Redirect::to(&state.auth.login_path).into_response();
    };

    match state.user_service.resolve_identity(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(AuthenticatedUser(user));
            next.run(request).await
        }
        Err(AuthError::Unauthenticated) => Redirect::to(&state.auth.login_path).into_response(),
        Err(AuthError::ProfileMissing) => {
            tracing::warn!("Authenticated session without a profile; redirecting to login");
            Redirect::to(&state.auth.login_path).into_response()
        }
        Err(AuthError::Internal(e)) => ApiError::internal(e).into_response(),
    }
}

// ============================================================================
// Authorization
// ============================================================================

/// State for [`require_section`]: the navigation tree and the section path a
/// route group belongs to
#[derive(Clone)]
pub struct SectionGate {
    pub access: Arc<AccessControl>,
    pub path: &'static str,
}

impl SectionGate {
    pub fn new(state: &AppState, path: &'static str) -> Self {
        Self {
            access: state.access.clone(),
            path,
        }
    }
}

/// Section authorization middleware. Must run after [`require_auth`].
pub async fn require_section(
    State(gate): State<SectionGate>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !gate.access.can_enter(&user.0.role, gate.path) {
        tracing::debug!("Role '{}' denied access to {}", user.0.role, gate.path);
        return Err(ApiError::forbidden(format!(
            "Your role does not have access to {}",
            gate.path
        )));
    }
    Ok(next.run(request).await)
}

// ============================================================================
// Tests
// ============================================================================
