//! Stock repository
//!
//! Inventory items, requisitions and the stock register. A quantity
//! adjustment and its register entry are written in one transaction.

use crate::config::DatabaseDriver;
use crate::db::query::{bind_mysql, bind_sqlite, QuerySpec};
use crate::db::DynDatabasePool;
use crate::models::{
    AdjustStockInput, ApprovalStatus, Requisition, StockItem, StockTransaction, TransactionKind,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

pub const ITEM_COLUMNS: &[&str] = &[
    "id",
    "code",
    "name",
    "category",
    "qty_available",
    "min_quantity",
    "unit_price",
    "created_at",
];

pub const REQUISITION_COLUMNS: &[&str] =
    &["id", "item_id", "qty", "requester_id", "status", "created_at"];

pub const TRANSACTION_COLUMNS: &[&str] =
    &["id", "item_id", "kind", "quantity", "date", "created_at"];

const SELECT_ITEMS: &str = "SELECT id, code, name, category, qty_available, min_quantity, \
                            unit_price, created_at, updated_at FROM stock_items";

const SELECT_REQUISITIONS: &str = "SELECT id, item_id, qty, requester_id, status, approved_by, \
                                   created_at, updated_at FROM requisitions";

const SELECT_TRANSACTIONS: &str = "SELECT id, item_id, item_name, kind, quantity, unit_price, \
                                   party, date, created_at FROM stock_transactions";

/// Result of a quantity adjustment
#[derive(Debug, Clone)]
pub enum AdjustOutcome {
    Applied(StockTransaction),
    NotFound,
    /// An issue larger than what is on hand; nothing was written
    Insufficient { available: i64 },
    /// A receipt that would push the quantity past `i64::MAX`; nothing was written
    Overflow { available: i64 },
}

#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn list_items(&self, spec: &QuerySpec) -> Result<Vec<StockItem>>;

    async fn count_items(&self, spec: &QuerySpec) -> Result<i64>;

    async fn get_item(&self, id: i64) -> Result<Option<StockItem>>;

    async fn create_item(&self, item: &StockItem) -> Result<StockItem>;

    /// Apply a receipt or issue to an item and record it in the register
    async fn adjust(&self, item_id: i64, input: &AdjustStockInput) -> Result<AdjustOutcome>;

    async fn list_requisitions(&self, spec: &QuerySpec) -> Result<Vec<Requisition>>;

    async fn count_requisitions(&self, spec: &QuerySpec) -> Result<i64>;

    async fn get_requisition(&self, id: i64) -> Result<Option<Requisition>>;

    async fn create_requisition(&self, requisition: &Requisition) -> Result<Requisition>;

    /// Move a requisition from `from` to `to`, recording who decided.
    /// Returns false if it was no longer in `from`.
    async fn update_requisition_status(
        &self,
        id: i64,
        from: ApprovalStatus,
        to: ApprovalStatus,
        decided_by: i64,
    ) -> Result<bool>;

    async fn list_transactions(&self, spec: &QuerySpec) -> Result<Vec<StockTransaction>>;
}

pub struct SqlxStockRepository {
    pool: DynDatabasePool,
}

impl SqlxStockRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn StockRepository> {
        Arc::new(Self::new(pool))
    }

    async fn count(&self, table: &str, allowed: &[&str], spec: &QuerySpec) -> Result<i64> {
        let sql = spec.count_sql(table, allowed)?;
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), spec)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .with_context(|| format!("Failed to count {}", table))?
                .get::<i64, _>("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), spec)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .with_context(|| format!("Failed to count {}", table))?
                .get::<i64, _>("count"),
        };
        Ok(count)
    }
}

#[async_trait]
impl StockRepository for SqlxStockRepository {
    async fn list_items(&self, spec: &QuerySpec) -> Result<Vec<StockItem>> {
        let sql = spec.select_sql(SELECT_ITEMS, ITEM_COLUMNS, "")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list stock items")?;
                Ok(rows.iter().map(row_to_item_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list stock items")?;
                Ok(rows.iter().map(row_to_item_mysql).collect())
            }
        }
    }

    async fn count_items(&self, spec: &QuerySpec) -> Result<i64> {
        self.count("stock_items", ITEM_COLUMNS, spec).await
    }

    async fn get_item(&self, id: i64) -> Result<Option<StockItem>> {
        let spec = QuerySpec::new().eq("id", id).limit(1);
        Ok(self.list_items(&spec).await?.into_iter().next())
    }

    async fn create_item(&self, item: &StockItem) -> Result<StockItem> {
        let sql = r#"
            INSERT INTO stock_items (code, name, category, qty_available, min_quantity, unit_price, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&item.code)
                .bind(&item.name)
                .bind(&item.category)
                .bind(item.qty_available)
                .bind(item.min_quantity)
                .bind(item.unit_price)
                .bind(now)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to create stock item")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&item.code)
                .bind(&item.name)
                .bind(&item.category)
                .bind(item.qty_available)
                .bind(item.min_quantity)
                .bind(item.unit_price)
                .bind(now)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to create stock item")?
                .last_insert_id() as i64,
        };
        Ok(StockItem {
            id,
            created_at: now,
            updated_at: now,
            ..item.clone()
        })
    }

    async fn adjust(&self, item_id: i64, input: &AdjustStockInput) -> Result<AdjustOutcome> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                adjust_sqlite(self.pool.as_sqlite().unwrap(), item_id, input).await
            }
            DatabaseDriver::Mysql => adjust_mysql(self.pool.as_mysql().unwrap(), item_id, input).await,
        }
    }

    async fn list_requisitions(&self, spec: &QuerySpec) -> Result<Vec<Requisition>> {
        let sql = spec.select_sql(SELECT_REQUISITIONS, REQUISITION_COLUMNS, "")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list requisitions")?;
                rows.iter().map(row_to_requisition_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list requisitions")?;
                rows.iter().map(row_to_requisition_mysql).collect()
            }
        }
    }

    async fn count_requisitions(&self, spec: &QuerySpec) -> Result<i64> {
        self.count("requisitions", REQUISITION_COLUMNS, spec).await
    }

    async fn get_requisition(&self, id: i64) -> Result<Option<Requisition>> {
        let spec = QuerySpec::new().eq("id", id).limit(1);
        Ok(self.list_requisitions(&spec).await?.into_iter().next())
    }

    async fn create_requisition(&self, requisition: &Requisition) -> Result<Requisition> {
        let sql = "INSERT INTO requisitions (item_id, qty, requester_id, status, created_at, updated_at) \
                   VALUES (?, ?, ?, ?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(requisition.item_id)
                .bind(requisition.qty)
                .bind(requisition.requester_id)
                .bind(requisition.status.to_string())
                .bind(now)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to create requisition")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(requisition.item_id)
                .bind(requisition.qty)
                .bind(requisition.requester_id)
                .bind(requisition.status.to_string())
                .bind(now)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to create requisition")?
                .last_insert_id() as i64,
        };
        Ok(Requisition {
            id,
            created_at: now,
            updated_at: now,
            ..requisition.clone()
        })
    }

    async fn update_requisition_status(
        &self,
        id: i64,
        from: ApprovalStatus,
        to: ApprovalStatus,
        decided_by: i64,
    ) -> Result<bool> {
        let sql = "UPDATE requisitions SET status = ?, approved_by = ?, updated_at = ? \
                   WHERE id = ? AND status = ?";
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(to.to_string())
                .bind(decided_by)
                .bind(now)
                .bind(id)
                .bind(from.to_string())
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update requisition status")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(to.to_string())
                .bind(decided_by)
                .bind(now)
                .bind(id)
                .bind(from.to_string())
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update requisition status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_transactions(&self, spec: &QuerySpec) -> Result<Vec<StockTransaction>> {
        let sql = spec.select_sql(SELECT_TRANSACTIONS, TRANSACTION_COLUMNS, "")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list stock transactions")?;
                rows.iter().map(row_to_transaction_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list stock transactions")?;
                rows.iter().map(row_to_transaction_mysql).collect()
            }
        }
    }
}

fn signed_delta(input: &AdjustStockInput) -> i64 {
    match input.kind {
        TransactionKind::In => input.quantity,
        TransactionKind::Out => -input.quantity,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn adjust_sqlite(pool: &SqlitePool, item_id: i64, input: &AdjustStockInput) -> Result<AdjustOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let row = sqlx::query("SELECT name, qty_available, unit_price FROM stock_items WHERE id = ?")
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to load stock item")?;
    let Some(row) = row else {
        return Ok(AdjustOutcome::NotFound);
    };

    let name: String = row.get("name");
    let available: i64 = row.get("qty_available");
    let unit_price: f64 = row.get("unit_price");
    match available.checked_add(signed_delta(input)) {
        None => return Ok(AdjustOutcome::Overflow { available }),
        Some(next) if next < 0 => return Ok(AdjustOutcome::Insufficient { available }),
        Some(_) => {}
    }

    let now = Utc::now();
    sqlx::query("UPDATE stock_items SET qty_available = qty_available + ?, updated_at = ? WHERE id = ?")
        .bind(signed_delta(input))
        .bind(now)
        .bind(item_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update stock quantity")?;

    let result = sqlx::query(
        r#"
        INSERT INTO stock_transactions (item_id, item_name, kind, quantity, unit_price, party, date, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item_id)
    .bind(&name)
    .bind(input.kind.to_string())
    .bind(input.quantity)
    .bind(unit_price)
    .bind(&input.party)
    .bind(input.date)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to record stock transaction")?;

    tx.commit().await.context("Failed to commit stock adjustment")?;

    Ok(AdjustOutcome::Applied(StockTransaction {
        id: result.last_insert_rowid(),
        item_id,
        item_name: name,
        kind: input.kind,
        quantity: input.quantity,
        unit_price,
        party: input.party.clone(),
        date: input.date,
        created_at: now,
    }))
}

fn row_to_item_sqlite(row: &sqlx::sqlite::SqliteRow) -> StockItem {
    StockItem {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        category: row.get("category"),
        qty_available: row.get("qty_available"),
        min_quantity: row.get("min_quantity"),
        unit_price: row.get("unit_price"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_requisition_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Requisition> {
    let status: String = row.get("status");
    Ok(Requisition {
        id: row.get("id"),
        item_id: row.get("item_id"),
        qty: row.get("qty"),
        requester_id: row.get("requester_id"),
        status: ApprovalStatus::from_str(&status)
            .with_context(|| format!("Invalid requisition status in database: {}", status))?,
        approved_by: row.get("approved_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_transaction_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<StockTransaction> {
    let kind: String = row.get("kind");
    Ok(StockTransaction {
        id: row.get("id"),
        item_id: row.get("item_id"),
        item_name: row.get("item_name"),
        kind: TransactionKind::from_str(&kind)
            .with_context(|| format!("Invalid transaction kind in database: {}", kind))?,
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        party: row.get("party"),
        date: row.get("date"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn adjust_mysql(pool: &MySqlPool, item_id: i64, input: &AdjustStockInput) -> Result<AdjustOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let row = sqlx::query(
        "SELECT name, qty_available, unit_price FROM stock_items WHERE id = ? FOR UPDATE",
    )
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await
    .context("Failed to load stock item")?;
    let Some(row) = row else {
        return Ok(AdjustOutcome::NotFound);
    };

    let name: String = row.get("name");
    let available: i64 = row.get("qty_available");
    let unit_price: f64 = row.get("unit_price");
    match available.checked_add(signed_delta(input)) {
        None => return Ok(AdjustOutcome::Overflow { available }),
        Some(next) if next < 0 => return Ok(AdjustOutcome::Insufficient { available }),
        Some(_) => {}
    }

    let now = Utc::now();
    sqlx::query("UPDATE stock_items SET qty_available = qty_available + ?, updated_at = ? WHERE id = ?")
        .bind(signed_delta(input))
        .bind(now)
        .bind(item_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update stock quantity")?;

    let result = sqlx::query(
        r#"
        INSERT INTO stock_transactions (item_id, item_name, kind, quantity, unit_price, party, date, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item_id)
    .bind(&name)
    .bind(input.kind.to_string())
    .bind(input.quantity)
    .bind(unit_price)
    .bind(&input.party)
    .bind(input.date)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to record stock transaction")?;

    tx.commit().await.context("Failed to commit stock adjustment")?;

    Ok(AdjustOutcome::Applied(StockTransaction {
        id: result.last_insert_id() as i64,
        item_id,
        item_name: name,
        kind: input.kind,
        quantity: input.quantity,
        unit_price,
        party: input.party.clone(),
        date: input.date,
        created_at: now,
    }))
}

fn row_to_item_mysql(row: &sqlx::mysql::MySqlRow) -> StockItem {
    StockItem {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        category: row.get("category"),
        qty_available: row.get("qty_available"),
        min_quantity: row.get("min_quantity"),
        unit_price: row.get("unit_price"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_requisition_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Requisition> {
    let status: String = row.get("status");
    Ok(Requisition {
        id: row.get("id"),
        item_id: row.get("item_id"),
        qty: row.get("qty"),
        requester_id: row.get("requester_id"),
        status: ApprovalStatus::from_str(&status)
            .with_context(|| format!("Invalid requisition status in database: {}", status))?,
        approved_by: row.get("approved_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_transaction_mysql(row: &sqlx::mysql::MySqlRow) -> Result<StockTransaction> {
    let kind: String = row.get("kind");
    Ok(StockTransaction {
        id: row.get("id"),
        item_id: row.get("item_id"),
        item_name: row.get("item_name"),
        kind: TransactionKind::from_str(&kind)
            .with_context(|| format!("Invalid transaction kind in database: {}", kind))?,
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        party: row.get("party"),
        date: row.get("date"),
        created_at: row.get("created_at"),
    })
}
