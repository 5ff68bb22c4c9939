//! Finance service
//!
//! Records fees, expenses and salary entries. Recording a fee also refreshes
//! the student's fee status from all of their fee rows.

use crate::db::repositories::{FinanceRepository, LeaveRepository, StudentRepository};
use crate::db::QuerySpec;
use crate::models::{
    DateRange, Expense, FeeRecord, FeeStatus, RecordExpenseInput, RecordFeeInput,
    RecordSalaryInput, SalaryRecord,
};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum FinanceError {
    #[error("Student not found: {0}")]
    StudentNotFound(i64),

    #[error("Faculty member not found: {0}")]
    FacultyNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Fee status implied by a student's fee rows
pub fn derive_fee_status(fees: &[FeeRecord]) -> FeeStatus {
    let paid = fees.iter().filter(|fee| fee.paid).count();
    match paid {
        0 => FeeStatus::Pending,
        n if n == fees.len() => FeeStatus::Paid,
        _ => FeeStatus::Partial,
    }
}

fn require_amount(label: &str, amount: f64) -> Result<(), FinanceError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(FinanceError::ValidationError(format!(
            "{} must be greater than 0",
            label
        )));
    }
    Ok(())
}

/// Salary months are `YYYY-MM`
fn is_valid_month(month: &str) -> bool {
    month.len() == 7 && NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok()
}

fn within(mut spec: QuerySpec, column: &str, period: &DateRange) -> QuerySpec {
    if let Some(from) = period.from {
        spec = spec.gte(column, from);
    }
    if let Some(to) = period.to {
        spec = spec.lte(column, to);
    }
    spec
}

pub struct FinanceService {
    repo: Arc<dyn FinanceRepository>,
    student_repo: Arc<dyn StudentRepository>,
    leave_repo: Arc<dyn LeaveRepository>,
}

impl FinanceService {
    pub fn new(
        repo: Arc<dyn FinanceRepository>,
        student_repo: Arc<dyn StudentRepository>,
        leave_repo: Arc<dyn LeaveRepository>,
    ) -> Self {
        Self {
            repo,
            student_repo,
            leave_repo,
        }
    }

    pub async fn record_fee(&self, input: RecordFeeInput) -> Result<FeeRecord, FinanceError> {
        require_amount("Fee amount", input.amount)?;
        if self
            .student_repo
            .get_by_id(input.student_id)
            .await
            .context("Failed to load student")?
            .is_none()
        {
            return Err(FinanceError::StudentNotFound(input.student_id));
        }

        let fee = FeeRecord {
            id: 0,
            student_id: input.student_id,
            amount: input.amount,
            due_date: input.due_date,
            paid: input.paid,
            receipt_url: input.receipt_url.filter(|url| !url.trim().is_empty()),
            created_at: Utc::now(),
        };
        let created = self
            .repo
            .create_fee(&fee)
            .await
            .context("Failed to record fee")?;

        let fees = self
            .repo
            .list_fees(&QuerySpec::new().eq("student_id", input.student_id))
            .await
            .context("Failed to load student fees")?;
        let status = derive_fee_status(&fees);
        self.student_repo
            .update_fee_status(input.student_id, status)
            .await
            .context("Failed to update fee status")?;
        tracing::debug!("Student {} fee status is now {}", input.student_id, status);

        Ok(created)
    }

    pub async fn list_fees(
        &self,
        student_id: Option<i64>,
        paid: Option<bool>,
        period: &DateRange,
    ) -> Result<Vec<FeeRecord>, FinanceError> {
        let mut spec = within(QuerySpec::new(), "due_date", period).order_by("due_date", true);
        if let Some(student_id) = student_id {
            spec = spec.eq("student_id", student_id);
        }
        if let Some(paid) = paid {
            spec = spec.eq("paid", paid);
        }
        Ok(self.repo.list_fees(&spec).await?)
    }

    pub async fn record_expense(&self, input: RecordExpenseInput) -> Result<Expense, FinanceError> {
        require_amount("Expense amount", input.amount)?;
        let category = input.category.trim();
        if category.is_empty() {
            return Err(FinanceError::ValidationError(
                "Expense category is required".to_string(),
            ));
        }

        let expense = Expense {
            id: 0,
            category: category.to_string(),
            description: input.description.trim().to_string(),
            amount: input.amount,
            date: input.date,
            created_at: Utc::now(),
        };
        Ok(self
            .repo
            .create_expense(&expense)
            .await
            .context("Failed to record expense")?)
    }

    pub async fn list_expenses(
        &self,
        category: Option<&str>,
        period: &DateRange,
    ) -> Result<Vec<Expense>, FinanceError> {
        let mut spec = within(QuerySpec::new(), "date", period).order_by("date", true);
        if let Some(category) = category.filter(|c| !c.is_empty()) {
            spec = spec.eq("category", category);
        }
        Ok(self.repo.list_expenses(&spec).await?)
    }

    /// Record a month's salary. Net salary is base minus deductions.
    pub async fn record_salary(&self, input: RecordSalaryInput) -> Result<SalaryRecord, FinanceError> {
        require_amount("Base salary", input.base_salary)?;
        if !input.deductions.is_finite() || input.deductions < 0.0 {
            return Err(FinanceError::ValidationError(
                "Deductions cannot be negative".to_string(),
            ));
        }
        if input.deductions > input.base_salary {
            return Err(FinanceError::ValidationError(
                "Deductions cannot exceed the base salary".to_string(),
            ));
        }
        let month = input.month.trim();
        if !is_valid_month(month) {
            return Err(FinanceError::ValidationError(format!(
                "Month must be YYYY-MM: {}",
                input.month
            )));
        }
        if self
            .leave_repo
            .get_faculty(input.faculty_id)
            .await
            .context("Failed to load faculty")?
            .is_none()
        {
            return Err(FinanceError::FacultyNotFound(input.faculty_id));
        }

        let salary = SalaryRecord {
            id: 0,
            faculty_id: input.faculty_id,
            month: month.to_string(),
            base_salary: input.base_salary,
            deductions: input.deductions,
            net_salary: input.base_salary - input.deductions,
            created_at: Utc::now(),
        };
        Ok(self
            .repo
            .create_salary(&salary)
            .await
            .context("Failed to record salary")?)
    }

    pub async fn list_salaries(
        &self,
        month: Option<&str>,
        faculty_id: Option<i64>,
    ) -> Result<Vec<SalaryRecord>, FinanceError> {
        let mut spec = QuerySpec::new().order_by("month", true);
        if let Some(month) = month.filter(|m| !m.is_empty()) {
            spec = spec.eq("month", month);
        }
        if let Some(faculty_id) = faculty_id {
            spec = spec.eq("faculty_id", faculty_id);
        }
        Ok(self.repo.list_salaries(&spec).await?)
    }
}
