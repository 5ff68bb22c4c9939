//! Stock service
//!
//! Inventory items, quantity adjustments through the stock register, and
//! requisitions. Item classification goes through the metrics engine so the
//! inventory table and every summary agree on what "low stock" means.

use crate::db::repositories::stock::AdjustOutcome;
use crate::db::repositories::StockRepository;
use crate::db::QuerySpec;
use crate::models::{
    AdjustStockInput, ApprovalStatus, ClassifiedStockItem, CreateRequisitionInput,
    CreateStockItemInput, DateRange, Requisition, StockItem, StockTransaction,
};
use crate::services::metrics::classify_item;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("Stock item not found: {0}")]
    ItemNotFound(i64),

    #[error("Requisition not found: {0}")]
    RequisitionNotFound(i64),

    #[error("Item code already exists: {0}")]
    DuplicateCode(String),

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("Requisition {id} is already {status}")]
    AlreadyDecided { id: i64, status: ApprovalStatus },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct StockService {
    repo: Arc<dyn StockRepository>,
    low_stock_threshold: i64,
}

impl StockService {
    pub fn new(repo: Arc<dyn StockRepository>, low_stock_threshold: i64) -> Self {
        Self {
            repo,
            low_stock_threshold,
        }
    }

    fn classify(&self, item: StockItem) -> ClassifiedStockItem {
        let status = classify_item(&item, self.low_stock_threshold);
        let value = item.qty_available as f64 * item.unit_price;
        ClassifiedStockItem {
            item,
            status,
            value,
        }
    }

    pub async fn create_item(&self, input: CreateStockItemInput) -> Result<ClassifiedStockItem, StockError> {
        let code = input.code.trim().to_uppercase();
        let name = input.name.trim();
        if code.is_empty() || name.is_empty() {
            return Err(StockError::ValidationError(
                "Item code and name are required".to_string(),
            ));
        }
        if input.qty_available < 0 {
            return Err(StockError::ValidationError(
                "Opening quantity cannot be negative".to_string(),
            ));
        }
        if input.min_quantity.is_some_and(|min| min < 0) {
            return Err(StockError::ValidationError(
                "Minimum quantity cannot be negative".to_string(),
            ));
        }
        if !input.unit_price.is_finite() || input.unit_price < 0.0 {
            return Err(StockError::ValidationError(
                "Unit price must be a non-negative amount".to_string(),
            ));
        }

        let existing = self
            .repo
            .count_items(&QuerySpec::new().eq("code", code.as_str()))
            .await
            .context("Failed to check item code")?;
        if existing > 0 {
            return Err(StockError::DuplicateCode(code));
        }

        let now = Utc::now();
        let item = StockItem {
            id: 0,
            code,
            name: name.to_string(),
            category: input.category.trim().to_string(),
            qty_available: input.qty_available,
            min_quantity: input.min_quantity,
            unit_price: input.unit_price,
            created_at: now,
            updated_at: now,
        };
        let created = self
            .repo
            .create_item(&item)
            .await
            .context("Failed to create stock item")?;
        Ok(self.classify(created))
    }

    /// Inventory table rows, by name, each with its status badge and value
    pub async fn list_items(&self, category: Option<&str>) -> Result<Vec<ClassifiedStockItem>, StockError> {
        let mut spec = QuerySpec::new().order_by("name", false);
        if let Some(category) = category.filter(|c| !c.is_empty()) {
            spec = spec.eq("category", category);
        }
        let items = self
            .repo
            .list_items(&spec)
            .await
            .context("Failed to list stock items")?;
        Ok(items.into_iter().map(|item| self.classify(item)).collect())
    }

    pub async fn get_item(&self, id: i64) -> Result<ClassifiedStockItem, StockError> {
        let item = self
            .repo
            .get_item(id)
            .await
            .context("Failed to load stock item")?
            .ok_or(StockError::ItemNotFound(id))?;
        Ok(self.classify(item))
    }

    /// Receive or issue stock. The movement is recorded in the register and
    /// the item quantity changes in the same transaction.
    ///
    /// # Errors
    /// - `ValidationError` if the quantity is not positive
    /// - `ItemNotFound` if the item does not exist
    /// - `InsufficientStock` if an issue exceeds what is on hand
    /// - `ValidationError` if a receipt would overflow the stored quantity
    pub async fn adjust(&self, item_id: i64, input: AdjustStockInput) -> Result<StockTransaction, StockError> {
        if input.quantity <= 0 {
            return Err(StockError::ValidationError(
                "Quantity must be greater than 0".to_string(),
            ));
        }

        match self
            .repo
            .adjust(item_id, &input)
            .await
            .context("Failed to adjust stock")?
        {
            AdjustOutcome::Applied(transaction) => {
                tracing::info!(
                    "Stock {} {} x{} for item {}",
                    transaction.id,
                    transaction.kind,
                    transaction.quantity,
                    item_id
                );
                Ok(transaction)
            }
            AdjustOutcome::NotFound => Err(StockError::ItemNotFound(item_id)),
            AdjustOutcome::Insufficient { available } => Err(StockError::InsufficientStock {
                requested: input.quantity,
                available,
            }),
            AdjustOutcome::Overflow { available } => Err(StockError::ValidationError(format!(
                "Receiving {} would exceed the largest storable quantity ({} on hand)",
                input.quantity, available
            ))),
        }
    }

    /// Register entries, newest first, optionally for one item and period
    pub async fn list_transactions(
        &self,
        item_id: Option<i64>,
        period: &DateRange,
    ) -> Result<Vec<StockTransaction>, StockError> {
        let mut spec = QuerySpec::new().order_by("date", true);
        if let Some(item_id) = item_id {
            spec = spec.eq("item_id", item_id);
        }
        if let Some(from) = period.from {
            spec = spec.gte("date", from);
        }
        if let Some(to) = period.to {
            spec = spec.lte("date", to);
        }
        Ok(self.repo.list_transactions(&spec).await?)
    }

    pub async fn create_requisition(
        &self,
        requester_id: i64,
        input: CreateRequisitionInput,
    ) -> Result<Requisition, StockError> {
        if input.qty <= 0 {
            return Err(StockError::ValidationError(
                "Quantity must be greater than 0".to_string(),
            ));
        }
        if self
            .repo
            .get_item(input.item_id)
            .await
            .context("Failed to load stock item")?
            .is_none()
        {
            return Err(StockError::ItemNotFound(input.item_id));
        }

        let now = Utc::now();
        let requisition = Requisition {
            id: 0,
            item_id: input.item_id,
            qty: input.qty,
            requester_id,
            status: ApprovalStatus::Pending,
            approved_by: None,
            created_at: now,
            updated_at: now,
        };
        Ok(self
            .repo
            .create_requisition(&requisition)
            .await
            .context("Failed to create requisition")?)
    }

    /// Approve or reject a pending requisition. Approval does not move stock;
    /// issuing goes through [`StockService::adjust`].
    pub async fn decide_requisition(
        &self,
        id: i64,
        decision: ApprovalStatus,
        decided_by: i64,
    ) -> Result<Requisition, StockError> {
        if !decision.is_terminal() {
            return Err(StockError::ValidationError(
                "A decision must be approved or rejected".to_string(),
            ));
        }

        let current = self
            .repo
            .get_requisition(id)
            .await
            .context("Failed to load requisition")?
            .ok_or(StockError::RequisitionNotFound(id))?;
        let next = current
            .status
            .decide(decision)
            .ok_or(StockError::AlreadyDecided {
                id,
                status: current.status,
            })?;

        if !self
            .repo
            .update_requisition_status(id, current.status, next, decided_by)
            .await
            .context("Failed to update requisition status")?
        {
            let status = self
                .repo
                .get_requisition(id)
                .await
                .context("Failed to reload requisition")?
                .map(|requisition| requisition.status)
                .ok_or(StockError::RequisitionNotFound(id))?;
            return Err(StockError::AlreadyDecided { id, status });
        }

        Ok(Requisition {
            status: next,
            approved_by: Some(decided_by),
            updated_at: Utc::now(),
            ..current
        })
    }

    pub async fn list_requisitions(&self, status: Option<ApprovalStatus>) -> Result<Vec<Requisition>, StockError> {
        let mut spec = QuerySpec::new().order_by("created_at", true);
        if let Some(status) = status {
            spec = spec.eq("status", status.to_string());
        }
        Ok(self.repo.list_requisitions(&spec).await?)
    }
}
