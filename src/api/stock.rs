//! Stock endpoints
//!
//! - GET /api/v1/stock/overview
//! - GET|POST /api/v1/stock/items, GET /api/v1/stock/items/{id}
//! - POST /api/v1/stock/items/{id}/adjust
//! - GET /api/v1/stock/transactions
//! - GET|POST /api/v1/stock/requisitions
//! - POST /api/v1/stock/requisitions/{id}/approve|reject

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    AdjustStockInput, ApprovalStatus, ClassifiedStockItem, CreateRequisitionInput,
    CreateStockItemInput, DateRange, Requisition, StockTransaction,
};
use crate::services::StockOverview;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item))
        .route("/items/{id}/adjust", post(adjust_item))
        .route("/transactions", get(list_transactions))
        .route("/requisitions", get(list_requisitions).post(create_requisition))
        .route("/requisitions/{id}/approve", post(approve_requisition))
        .route("/requisitions/{id}/reject", post(reject_requisition))
}

#[derive(Debug, Deserialize)]
struct ListItemsQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListTransactionsQuery {
    item_id: Option<i64>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ListRequisitionsQuery {
    status: Option<ApprovalStatus>,
}

#[derive(Debug, Serialize)]
struct ItemListResponse {
    items: Vec<ClassifiedStockItem>,
}

#[derive(Debug, Serialize)]
struct ItemResponse {
    item: ClassifiedStockItem,
}

#[derive(Debug, Serialize)]
struct TransactionListResponse {
    transactions: Vec<StockTransaction>,
}

#[derive(Debug, Serialize)]
struct RequisitionListResponse {
    requisitions: Vec<Requisition>,
}

#[derive(Debug, Serialize)]
struct RequisitionResponse {
    requisition: Requisition,
}

/// GET /api/v1/stock/overview
async fn overview(State(state): State<AppState>) -> Json<StockOverview> {
    Json(state.view_service.stock_overview().await)
}

/// GET /api/v1/stock/items?category=
async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<ItemListResponse>, ApiError> {
    let items = state.stock_service.list_items(query.category.as_deref()).await?;
    Ok(Json(ItemListResponse { items }))
}

/// POST /api/v1/stock/items
async fn create_item(
    State(state): State<AppState>,
    Json(body): Json<CreateStockItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.stock_service.create_item(body).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

/// GET /api/v1/stock/items/{id}
async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = state.stock_service.get_item(id).await?;
    Ok(Json(ItemResponse { item }))
}

/// POST /api/v1/stock/items/{id}/adjust
async fn adjust_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AdjustStockInput>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = state.stock_service.adjust(id, body).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /api/v1/stock/transactions?item_id=&from=&to=
async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let period = DateRange {
        from: query.from,
        to: query.to,
    };
    if !period.is_valid() {
        return Err(ApiError::validation_error("'from' must not be after 'to'"));
    }
    let transactions = state
        .stock_service
        .list_transactions(query.item_id, &period)
        .await?;
    Ok(Json(TransactionListResponse { transactions }))
}

/// GET /api/v1/stock/requisitions?status=
async fn list_requisitions(
    State(state): State<AppState>,
    Query(query): Query<ListRequisitionsQuery>,
) -> Result<Json<RequisitionListResponse>, ApiError> {
    let requisitions = state.stock_service.list_requisitions(query.status).await?;
    Ok(Json(RequisitionListResponse { requisitions }))
}

/// POST /api/v1/stock/requisitions
async fn create_requisition(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateRequisitionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let requisition = state.stock_service.create_requisition(user.0.id, body).await?;
    Ok((StatusCode::CREATED, Json(RequisitionResponse { requisition })))
}

/// POST /api/v1/stock/requisitions/{id}/approve
async fn approve_requisition(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RequisitionResponse>, ApiError> {
    let requisition = state
        .stock_service
        .decide_requisition(id, ApprovalStatus::Approved, user.0.id)
        .await?;
    Ok(Json(RequisitionResponse { requisition }))
}

/// POST /api/v1/stock/requisitions/{id}/reject
async fn reject_requisition(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RequisitionResponse>, ApiError> {
    let requisition = state
        .stock_service
        .decide_requisition(id, ApprovalStatus::Rejected, user.0.id)
        .await?;
    Ok(Json(RequisitionResponse { requisition }))
}
