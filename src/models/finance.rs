//! Finance rows: fees, expenses and salary records.
//!
//! These only feed sums; none of them carry a lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Fee charged to (and possibly collected from) a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRecord {
    pub id: i64,
    pub student_id: i64,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub paid: bool,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordFeeInput {
    pub student_id: i64,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

/// Institute expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordExpenseInput {
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Monthly salary entry for a faculty member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryRecord {
    pub id: i64,
    pub faculty_id: i64,
    /// Month in `YYYY-MM` form
    pub month: String,
    pub base_salary: f64,
    pub deductions: f64,
    pub net_salary: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordSalaryInput {
    pub faculty_id: i64,
    pub month: String,
    pub base_salary: f64,
    #[serde(default)]
    pub deductions: f64,
}
