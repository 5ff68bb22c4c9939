//! Faculty and leave management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    ApplyLeaveInput, ApprovalStatus, CreateFacultyInput, Faculty, LeaveApplication,
    LeaveWithFaculty,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_faculty).post(create_faculty))
        .route("/leaves", get(list_leaves).post(apply_leave))
        .route("/leaves/{id}/approve", post(approve_leave))
        .route("/leaves/{id}/reject", post(reject_leave))
}

#[derive(Debug, Deserialize)]
struct ListLeavesQuery {
    status: Option<ApprovalStatus>,
}

#[derive(Debug, Serialize)]
struct FacultyListResponse {
    faculty: Vec<Faculty>,
}

#[derive(Debug, Serialize)]
struct FacultyResponse {
    faculty: Faculty,
}

#[derive(Debug, Serialize)]
struct LeaveListResponse {
    leaves: Vec<LeaveWithFaculty>,
}

#[derive(Debug, Serialize)]
struct LeaveResponse {
    leave: LeaveApplication,
}

/// GET /api/v1/faculty
async fn list_faculty(State(state): State<AppState>) -> Result<Json<FacultyListResponse>, ApiError> {
    let faculty = state.leave_service.list_faculty().await?;
    Ok(Json(FacultyListResponse { faculty }))
}

/// POST /api/v1/faculty
async fn create_faculty(
    State(state): State<AppState>,
    Json(body): Json<CreateFacultyInput>,
) -> Result<impl IntoResponse, ApiError> {
    let faculty = state.leave_service.add_faculty(body).await?;
    Ok((StatusCode::CREATED, Json(FacultyResponse { faculty })))
}

/// GET /api/v1/faculty/leaves?status=pending
async fn list_leaves(
    State(state): State<AppState>,
    Query(query): Query<ListLeavesQuery>,
) -> Result<Json<LeaveListResponse>, ApiError> {
    let leaves = state.leave_service.list(query.status).await?;
    Ok(Json(LeaveListResponse { leaves }))
}

/// POST /api/v1/faculty/leaves
async fn apply_leave(
    State(state): State<AppState>,
    Json(body): Json<ApplyLeaveInput>,
) -> Result<impl IntoResponse, ApiError> {
    let leave = state.leave_service.apply(body).await?;
    Ok((StatusCode::CREATED, Json(LeaveResponse { leave })))
}

/// POST /api/v1/faculty/leaves/{id}/approve
async fn approve_leave(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let leave = state.leave_service.decide(id, ApprovalStatus::Approved).await?;
    Ok(Json(LeaveResponse { leave }))
}

/// POST /api/v1/faculty/leaves/{id}/reject
async fn reject_leave(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let leave = state.leave_service.decide(id, ApprovalStatus::Rejected).await?;
    Ok(Json(LeaveResponse { leave }))
}
