//! Finance endpoints: fees, expenses, salaries and the overview cards

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    DateRange, Expense, FeeRecord, RecordExpenseInput, RecordFeeInput, RecordSalaryInput,
    SalaryRecord,
};
use crate::services::FinanceOverview;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/fees", get(list_fees).post(record_fee))
        .route("/expenses", get(list_expenses).post(record_expense))
        .route("/salary", get(list_salaries).post(record_salary))
}

/// Query parameters for the fee list
#[derive(Debug, Deserialize)]
struct ListFeesQuery {
    student_id: Option<i64>,
    paid: Option<bool>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

/// Query parameters for the expense list
#[derive(Debug, Deserialize)]
struct ListExpensesQuery {
    category: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

/// Query parameters for the salary list
#[derive(Debug, Deserialize)]
struct ListSalariesQuery {
    month: Option<String>,
    faculty_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct FeeListResponse {
    fees: Vec<FeeRecord>,
}

#[derive(Debug, Serialize)]
struct ExpenseListResponse {
    expenses: Vec<Expense>,
}

#[derive(Debug, Serialize)]
struct SalaryListResponse {
    salaries: Vec<SalaryRecord>,
}

fn period(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DateRange, ApiError> {
    let range = DateRange { from, to };
    if !range.is_valid() {
        return Err(ApiError::validation_error("'from' must not be after 'to'"));
    }
    Ok(range)
}

/// GET /api/v1/finance/overview
async fn overview(State(state): State<AppState>) -> Json<FinanceOverview> {
    Json(state.view_service.finance_overview().await)
}

/// GET /api/v1/finance/fees
async fn list_fees(
    State(state): State<AppState>,
    Query(query): Query<ListFeesQuery>,
) -> Result<Json<FeeListResponse>, ApiError> {
    let range = period(query.from, query.to)?;
    let fees = state
        .finance_service
        .list_fees(query.student_id, query.paid, &range)
        .await?;
    Ok(Json(FeeListResponse { fees }))
}

/// POST /api/v1/finance/fees
async fn record_fee(
    State(state): State<AppState>,
    Json(body): Json<RecordFeeInput>,
) -> Result<impl IntoResponse, ApiError> {
    let fee = state.finance_service.record_fee(body).await?;
    Ok((StatusCode::CREATED, Json(fee)))
}

/// GET /api/v1/finance/expenses
async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ListExpensesQuery>,
) -> Result<Json<ExpenseListResponse>, ApiError> {
    let range = period(query.from, query.to)?;
    let expenses = state
        .finance_service
        .list_expenses(query.category.as_deref(), &range)
        .await?;
    Ok(Json(ExpenseListResponse { expenses }))
}

/// POST /api/v1/finance/expenses
async fn record_expense(
    State(state): State<AppState>,
    Json(body): Json<RecordExpenseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let expense = state.finance_service.record_expense(body).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /api/v1/finance/salary
async fn list_salaries(
    State(state): State<AppState>,
    Query(query): Query<ListSalariesQuery>,
) -> Result<Json<SalaryListResponse>, ApiError> {
    let salaries = state
        .finance_service
        .list_salaries(query.month.as_deref(), query.faculty_id)
        .await?;
    Ok(Json(SalaryListResponse { salaries }))
}

/// POST /api/v1/finance/salary
async fn record_salary(
    State(state): State<AppState>,
    Json(body): Json<RecordSalaryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let salary = state.finance_service.record_salary(body).await?;
    Ok((StatusCode::CREATED, Json(salary)))
}
