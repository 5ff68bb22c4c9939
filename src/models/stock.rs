//! Stock models: items, requisitions and register transactions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ApprovalStatus;

/// Inventory item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i64,
    /// Item code (unique)
    pub code: String,
    pub name: String,
    pub category: String,
    pub qty_available: i64,
    /// Item-specific low-stock threshold; the configured default applies when absent
    pub min_quantity: Option<i64>,
    pub unit_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Three-way stock classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::OutOfStock => write!(f, "out-of-stock"),
            StockStatus::LowStock => write!(f, "low-stock"),
            StockStatus::InStock => write!(f, "in-stock"),
        }
    }
}

/// Stock item annotated with its classification, as the inventory table shows it
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedStockItem {
    #[serde(flatten)]
    pub item: StockItem,
    pub status: StockStatus,
    pub value: f64,
}

/// Input for adding an inventory item
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStockItemInput {
    pub code: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub qty_available: i64,
    #[serde(default)]
    pub min_quantity: Option<i64>,
    pub unit_price: f64,
}

/// Request for stock raised by a staff member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requisition {
    pub id: i64,
    pub item_id: i64,
    pub qty: i64,
    pub requester_id: i64,
    pub status: ApprovalStatus,
    pub approved_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new requisition
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequisitionInput {
    pub item_id: i64,
    pub qty: i64,
}

/// Direction of a stock register entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Received into stock
    In,
    /// Issued / consumed
    Out,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::In => write!(f, "in"),
            TransactionKind::Out => write!(f, "out"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" => Ok(TransactionKind::In),
            "out" => Ok(TransactionKind::Out),
            _ => Err(anyhow::anyhow!("Invalid transaction kind: {}", s)),
        }
    }
}

/// Stock register entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: i64,
    pub item_id: i64,
    /// Item name at the time of the movement
    pub item_name: String,
    pub kind: TransactionKind,
    pub quantity: i64,
    pub unit_price: f64,
    /// Supplier for receipts, department for issues
    pub party: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    pub fn total_value(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Input for a stock movement against an item
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustStockInput {
    pub kind: TransactionKind,
    pub quantity: i64,
    #[serde(default)]
    pub party: Option<String>,
    pub date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_labels() {
        assert_eq!(StockStatus::OutOfStock.to_string(), "out-of-stock");
        assert_eq!(
            serde_json::to_string(&StockStatus::LowStock).unwrap(),
            "\"low-stock\""
        );
    }

    #[test]
    fn test_transaction_kind_from_str() {
        assert_eq!(TransactionKind::from_str("IN").unwrap(), TransactionKind::In);
        assert_eq!(TransactionKind::from_str("out").unwrap(), TransactionKind::Out);
        assert!(TransactionKind::from_str("transfer").is_err());
    }
}
