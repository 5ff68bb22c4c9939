//! Finance repository
//!
//! Fees, expenses and salary records. Append-only: rows are inserted and
//! read back for sums, never updated.

use crate::config::DatabaseDriver;
use crate::db::query::{bind_mysql, bind_sqlite, QuerySpec};
use crate::db::DynDatabasePool;
use crate::models::{Expense, FeeRecord, SalaryRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

pub const FEE_COLUMNS: &[&str] = &["id", "student_id", "amount", "due_date", "paid", "created_at"];

pub const EXPENSE_COLUMNS: &[&str] = &["id", "category", "amount", "date", "created_at"];

pub const SALARY_COLUMNS: &[&str] = &["id", "faculty_id", "month", "net_salary", "created_at"];

const SELECT_FEES: &str =
    "SELECT id, student_id, amount, due_date, paid, receipt_url, created_at FROM fees";

const SELECT_EXPENSES: &str =
    "SELECT id, category, description, amount, date, created_at FROM expenses";

const SELECT_SALARY: &str = "SELECT id, faculty_id, month, base_salary, deductions, net_salary, \
                             created_at FROM salary";

#[async_trait]
pub trait FinanceRepository: Send + Sync {
    async fn list_fees(&self, spec: &QuerySpec) -> Result<Vec<FeeRecord>>;

    async fn create_fee(&self, fee: &FeeRecord) -> Result<FeeRecord>;

    async fn list_expenses(&self, spec: &QuerySpec) -> Result<Vec<Expense>>;

    async fn create_expense(&self, expense: &Expense) -> Result<Expense>;

    async fn list_salaries(&self, spec: &QuerySpec) -> Result<Vec<SalaryRecord>>;

    async fn create_salary(&self, salary: &SalaryRecord) -> Result<SalaryRecord>;
}

pub struct SqlxFinanceRepository {
    pool: DynDatabasePool,
}

impl SqlxFinanceRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FinanceRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FinanceRepository for SqlxFinanceRepository {
    async fn list_fees(&self, spec: &QuerySpec) -> Result<Vec<FeeRecord>> {
        let sql = spec.select_sql(SELECT_FEES, FEE_COLUMNS, "")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list fees")?;
                Ok(rows.iter().map(row_to_fee_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list fees")?;
                Ok(rows.iter().map(row_to_fee_mysql).collect())
            }
        }
    }

    async fn create_fee(&self, fee: &FeeRecord) -> Result<FeeRecord> {
        let sql = "INSERT INTO fees (student_id, amount, due_date, paid, receipt_url, created_at) \
                   VALUES (?, ?, ?, ?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(fee.student_id)
                .bind(fee.amount)
                .bind(fee.due_date)
                .bind(fee.paid)
                .bind(&fee.receipt_url)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to record fee")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(fee.student_id)
                .bind(fee.amount)
                .bind(fee.due_date)
                .bind(fee.paid)
                .bind(&fee.receipt_url)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to record fee")?
                .last_insert_id() as i64,
        };
        Ok(FeeRecord {
            id,
            created_at: now,
            ..fee.clone()
        })
    }

    async fn list_expenses(&self, spec: &QuerySpec) -> Result<Vec<Expense>> {
        let sql = spec.select_sql(SELECT_EXPENSES, EXPENSE_COLUMNS, "")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list expenses")?;
                Ok(rows.iter().map(row_to_expense_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list expenses")?;
                Ok(rows.iter().map(row_to_expense_mysql).collect())
            }
        }
    }

    async fn create_expense(&self, expense: &Expense) -> Result<Expense> {
        let sql = "INSERT INTO expenses (category, description, amount, date, created_at) \
                   VALUES (?, ?, ?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&expense.category)
                .bind(&expense.description)
                .bind(expense.amount)
                .bind(expense.date)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to record expense")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&expense.category)
                .bind(&expense.description)
                .bind(expense.amount)
                .bind(expense.date)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to record expense")?
                .last_insert_id() as i64,
        };
        Ok(Expense {
            id,
            created_at: now,
            ..expense.clone()
        })
    }

    async fn list_salaries(&self, spec: &QuerySpec) -> Result<Vec<SalaryRecord>> {
        let sql = spec.select_sql(SELECT_SALARY, SALARY_COLUMNS, "")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list salary records")?;
                Ok(rows.iter().map(row_to_salary_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list salary records")?;
                Ok(rows.iter().map(row_to_salary_mysql).collect())
            }
        }
    }

    async fn create_salary(&self, salary: &SalaryRecord) -> Result<SalaryRecord> {
        let sql = "INSERT INTO salary (faculty_id, month, base_salary, deductions, net_salary, created_at) \
                   VALUES (?, ?, ?, ?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(salary.faculty_id)
                .bind(&salary.month)
                .bind(salary.base_salary)
                .bind(salary.deductions)
                .bind(salary.net_salary)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to record salary")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(salary.faculty_id)
                .bind(&salary.month)
                .bind(salary.base_salary)
                .bind(salary.deductions)
                .bind(salary.net_salary)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to record salary")?
                .last_insert_id() as i64,
        };
        Ok(SalaryRecord {
            id,
            created_at: now,
            ..salary.clone()
        })
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_fee_sqlite(row: &sqlx::sqlite::SqliteRow) -> FeeRecord {
    FeeRecord {
        id: row.get("id"),
        student_id: row.get("student_id"),
        amount: row.get("amount"),
        due_date: row.get("due_date"),
        paid: row.get("paid"),
        receipt_url: row.get("receipt_url"),
        created_at: row.get("created_at"),
    }
}

fn row_to_expense_sqlite(row: &sqlx::sqlite::SqliteRow) -> Expense {
    Expense {
        id: row.get("id"),
        category: row.get("category"),
        description: row.get("description"),
        amount: row.get("amount"),
        date: row.get("date"),
        created_at: row.get("created_at"),
    }
}

fn row_to_salary_sqlite(row: &sqlx::sqlite::SqliteRow) -> SalaryRecord {
    SalaryRecord {
        id: row.get("id"),
        faculty_id: row.get("faculty_id"),
        month: row.get("month"),
        base_salary: row.get("base_salary"),
        deductions: row.get("deductions"),
        net_salary: row.get("net_salary"),
        created_at: row.get("created_at"),
    }
}

fn row_to_fee_mysql(row: &sqlx::mysql::MySqlRow) -> FeeRecord {
    FeeRecord {
        id: row.get("id"),
        student_id: row.get("student_id"),
        amount: row.get("amount"),
        due_date: row.get("due_date"),
        paid: row.get("paid"),
        receipt_url: row.get("receipt_url"),
        created_at: row.get("created_at"),
    }
}

fn row_to_expense_mysql(row: &sqlx::mysql::MySqlRow) -> Expense {
    Expense {
        id: row.get("id"),
        category: row.get("category"),
        description: row.get("description"),
        amount: row.get("amount"),
        date: row.get("date"),
        created_at: row.get("created_at"),
    }
}

fn row_to_salary_mysql(row: &sqlx::mysql::MySqlRow) -> SalaryRecord {
    SalaryRecord {
        id: row.get("id"),
        faculty_id: row.get("faculty_id"),
        month: row.get("month"),
        base_salary: row.get("base_salary"),
        deductions: row.get("deductions"),
        net_salary: row.get("net_salary"),
        created_at: row.get("created_at"),
    }
}
