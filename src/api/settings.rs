//! Settings endpoints (admin section)

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::api::auth::UserResponse;
use crate::api::middleware::{ApiError, AppState};
use crate::models::CreateUserInput;

pub fn router() -> Router<AppState> {
    Router::new().route("/users", post(create_user))
}

/// POST /api/v1/settings/users - Create an account with any known role
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.create_user(body).await?;
    tracing::info!("Created account {} with role {}", user.email, user.role);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
