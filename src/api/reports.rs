//! Dashboard and report endpoints
//!
//! Every handler here is read-only and infallible at the data layer: a
//! failed read shows up as a zero in the summary, not as an error response.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::DateRange;
use crate::services::{
    DashboardSummary, FinancialReport, ReportsOverview, StockReport, StudentReport,
};

/// Routes under /dashboard
pub fn dashboard_router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// Routes under /reports
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/students", get(student_report))
        .route("/stock", get(stock_report))
        .route("/financial", get(financial_report))
}

fn checked(period: DateRange) -> Result<DateRange, ApiError> {
    if period.is_valid() {
        Ok(period)
    } else {
        Err(ApiError::validation_error("'from' must not be after 'to'"))
    }
}

/// GET /api/v1/dashboard
async fn dashboard(State(state): State<AppState>) -> Json<DashboardSummary> {
    Json(state.view_service.dashboard().await)
}

/// GET /api/v1/reports/overview
async fn overview(State(state): State<AppState>) -> Json<ReportsOverview> {
    Json(state.view_service.reports_overview().await)
}

/// GET /api/v1/reports/students
async fn student_report(State(state): State<AppState>) -> Json<StudentReport> {
    Json(state.view_service.student_report().await)
}

/// GET /api/v1/reports/stock?from=&to=
async fn stock_report(
    State(state): State<AppState>,
    Query(period): Query<DateRange>,
) -> Result<Json<StockReport>, ApiError> {
    let period = checked(period)?;
    Ok(Json(state.view_service.stock_report(&period).await))
}

/// GET /api/v1/reports/financial?from=&to=
async fn financial_report(
    State(state): State<AppState>,
    Query(period): Query<DateRange>,
) -> Result<Json<FinancialReport>, ApiError> {
    let period = checked(period)?;
    Ok(Json(state.view_service.financial_report(&period).await))
}
