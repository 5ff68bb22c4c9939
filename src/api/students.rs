//! Student API endpoints
//!
//! - GET /api/v1/students - Records with search and filters
//! - POST /api/v1/students - Admit a student
//! - GET /api/v1/students/courses - Course catalogue
//! - GET /api/v1/students/{id} - One record
//! - PUT /api/v1/students/{id}/fee-status - Override fee status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    AdmitStudentInput, Course, FeeStatus, Student, StudentFilter, StudentWithCourse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(admit_student))
        .route("/courses", get(list_courses))
        .route("/{id}", get(get_student))
        .route("/{id}/fee-status", put(update_fee_status))
}

#[derive(Debug, Serialize)]
struct StudentListResponse {
    students: Vec<StudentWithCourse>,
    total: usize,
}

#[derive(Debug, Serialize)]
struct StudentResponse {
    student: Student,
}

#[derive(Debug, Serialize)]
struct CourseListResponse {
    courses: Vec<Course>,
}

#[derive(Debug, Deserialize)]
struct FeeStatusRequest {
    fee_status: FeeStatus,
}

/// GET /api/v1/students?search=&fee_status=&course_id=&year=
async fn list_students(
    State(state): State<AppState>,
    Query(filter): Query<StudentFilter>,
) -> Result<Json<StudentListResponse>, ApiError> {
    let students = state.student_service.list(&filter).await?;
    Ok(Json(StudentListResponse {
        total: students.len(),
        students,
    }))
}

/// POST /api/v1/students
async fn admit_student(
    State(state): State<AppState>,
    Json(body): Json<AdmitStudentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let student = state.student_service.admit(body).await?;
    tracing::info!("Admitted student {}", student.admission_no);
    Ok((StatusCode::CREATED, Json(StudentResponse { student })))
}

/// GET /api/v1/students/courses
async fn list_courses(State(state): State<AppState>) -> Result<Json<CourseListResponse>, ApiError> {
    let courses = state.student_service.list_courses().await?;
    Ok(Json(CourseListResponse { courses }))
}

/// GET /api/v1/students/{id}
async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = state.student_service.get(id).await?;
    Ok(Json(StudentResponse { student }))
}

/// PUT /api/v1/students/{id}/fee-status
async fn update_fee_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<FeeStatusRequest>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = state.student_service.set_fee_status(id, body.fee_status).await?;
    Ok(Json(StudentResponse { student }))
}
