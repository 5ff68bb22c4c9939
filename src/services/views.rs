//! View summaries
//!
//! Each view issues its reads concurrently, waits for all of them, then
//! reduces the rows through [`compute_metrics`]. A failed read is logged and
//! replaced by an empty row-set (or a zero count), so one broken collection
//! zeroes its own figures and leaves the rest of the view intact.

use crate::config::{MetricsConfig, ViewsConfig};
use crate::db::repositories::{
    FinanceRepository, LeaveRepository, StockRepository, StudentRepository,
};
use crate::db::QuerySpec;
use crate::models::{ApprovalStatus, DateRange, FeeStatus};
use crate::services::metrics::{
    compute_metrics, enrollment_by_course, CourseEnrollment, MetricSpec, RankedItem, RowSets,
    StockBreakdown,
};
use serde::Serialize;
use std::sync::Arc;

/// Landing page cards
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_students: u64,
    pub total_faculty: u64,
    pub pending_leaves: u64,
    pub low_stock_items: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinanceOverview {
    pub total_students: u64,
    pub total_fees: f64,
    pub total_expenses: f64,
    pub net_income: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StockOverview {
    pub total_items: u64,
    pub total_value: f64,
    pub low_stock_items: u64,
    pub pending_requisitions: u64,
    pub breakdown: StockBreakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportsOverview {
    pub total_students: u64,
    pub total_fees: f64,
    pub total_expenses: f64,
    pub stock_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StockReport {
    pub breakdown: StockBreakdown,
    pub availability_percent: f64,
    pub total_value: f64,
    pub average_item_value: f64,
    pub net_movement: i64,
    pub top_consumed: Vec<RankedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialReport {
    pub total_revenue: f64,
    pub collected_fees: f64,
    pub outstanding_fees: f64,
    pub total_expenses: f64,
    pub net_income: f64,
    pub expense_ratio: f64,
    pub profit_margin: f64,
    pub total_salaries: f64,
}

/// Student report: fee standing and enrollment per course
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentReport {
    pub total_students: u64,
    pub fees_pending: u64,
    pub fees_partial: u64,
    pub fees_paid: u64,
    pub fees_cleared_percent: f64,
    pub by_course: Vec<CourseEnrollment>,
}

/// Turn a failed read into an empty row-set
fn rows_or_empty<T>(collection: &str, result: anyhow::Result<Vec<T>>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("Failed to load {}: {:#}", collection, e);
            Vec::new()
        }
    }
}

/// Turn a failed count into zero
fn count_or_zero(collection: &str, result: anyhow::Result<i64>) -> u64 {
    match result {
        Ok(n) => n.max(0) as u64,
        Err(e) => {
            tracing::warn!("Failed to count {}: {:#}", collection, e);
            0
        }
    }
}

/// Restrict a read to a date column range
fn within(spec: QuerySpec, column: &str, period: &DateRange) -> QuerySpec {
    let spec = match period.from {
        Some(from) => spec.gte(column, from),
        None => spec,
    };
    match period.to {
        Some(to) => spec.lte(column, to),
        None => spec,
    }
}

pub struct ViewService {
    student_repo: Arc<dyn StudentRepository>,
    leave_repo: Arc<dyn LeaveRepository>,
    stock_repo: Arc<dyn StockRepository>,
    finance_repo: Arc<dyn FinanceRepository>,
    metrics: MetricsConfig,
    views: ViewsConfig,
}

impl ViewService {
    pub fn new(
        student_repo: Arc<dyn StudentRepository>,
        leave_repo: Arc<dyn LeaveRepository>,
        stock_repo: Arc<dyn StockRepository>,
        finance_repo: Arc<dyn FinanceRepository>,
        metrics: MetricsConfig,
        views: ViewsConfig,
    ) -> Self {
        Self {
            student_repo,
            leave_repo,
            stock_repo,
            finance_repo,
            metrics,
            views,
        }
    }

    fn threshold(&self) -> i64 {
        self.metrics.low_stock_threshold
    }

    pub async fn dashboard(&self) -> DashboardSummary {
        let low_stock = MetricSpec::LowStockCount {
            threshold: self.threshold(),
        };
        let all = QuerySpec::new();
        let pending = QuerySpec::new().eq("status", ApprovalStatus::Pending.to_string());
        let below = QuerySpec::new().lt("qty_available", self.threshold());

        let (students, faculty, leaves, items) = tokio::join!(
            self.student_repo.count(&all),
            self.leave_repo.count_faculty(&all),
            self.leave_repo.count(&pending),
            self.stock_repo.count_items(&below),
        );

        let rows = RowSets::default()
            .with_count(MetricSpec::StudentCount, count_or_zero("students", students))
            .with_count(MetricSpec::FacultyCount, count_or_zero("faculty", faculty))
            .with_count(MetricSpec::PendingLeaves, count_or_zero("leaves", leaves))
            .with_count(low_stock.clone(), count_or_zero("stock_items", items));

        let specs = [
            MetricSpec::StudentCount,
            MetricSpec::FacultyCount,
            MetricSpec::PendingLeaves,
            low_stock.clone(),
        ];
        let aggregates = compute_metrics(&rows, &specs);

        DashboardSummary {
            total_students: aggregates.count(&MetricSpec::StudentCount),
            total_faculty: aggregates.count(&MetricSpec::FacultyCount),
            pending_leaves: aggregates.count(&MetricSpec::PendingLeaves),
            low_stock_items: aggregates.count(&low_stock),
        }
    }

    /// Finance landing page: sums cover the most recent fee and expense rows
    pub async fn finance_overview(&self) -> FinanceOverview {
        let all = QuerySpec::new();
        let recent = QuerySpec::new().recent(self.views.recent_limit);

        let (students, fees, expenses) = tokio::join!(
            self.student_repo.count(&all),
            self.finance_repo.list_fees(&recent),
            self.finance_repo.list_expenses(&recent),
        );

        let rows = RowSets {
            fees: rows_or_empty("fees", fees),
            expenses: rows_or_empty("expenses", expenses),
            ..RowSets::default()
        }
        .with_count(MetricSpec::StudentCount, count_or_zero("students", students));

        let aggregates = compute_metrics(
            &rows,
            &[
                MetricSpec::StudentCount,
                MetricSpec::TotalFees,
                MetricSpec::TotalExpenses,
                MetricSpec::NetIncome,
            ],
        );

        FinanceOverview {
            total_students: aggregates.count(&MetricSpec::StudentCount),
            total_fees: aggregates.amount(&MetricSpec::TotalFees),
            total_expenses: aggregates.amount(&MetricSpec::TotalExpenses),
            net_income: aggregates.amount(&MetricSpec::NetIncome),
        }
    }

    pub async fn stock_overview(&self) -> StockOverview {
        let low_stock = MetricSpec::LowStockCount {
            threshold: self.threshold(),
        };
        let breakdown = MetricSpec::StockBreakdown {
            default_threshold: self.threshold(),
        };

        let all = QuerySpec::new();
        let recent = QuerySpec::new().recent(self.views.recent_limit);

        let (items, requisitions) = tokio::join!(
            self.stock_repo.list_items(&all),
            self.stock_repo.list_requisitions(&recent),
        );

        let rows = RowSets {
            stock_items: rows_or_empty("stock_items", items),
            requisitions: rows_or_empty("requisitions", requisitions),
            ..RowSets::default()
        };

        let aggregates = compute_metrics(
            &rows,
            &[
                MetricSpec::TotalItems,
                MetricSpec::TotalStockValue,
                low_stock.clone(),
                MetricSpec::PendingRequisitions,
                breakdown.clone(),
            ],
        );

        StockOverview {
            total_items: aggregates.count(&MetricSpec::TotalItems),
            total_value: aggregates.amount(&MetricSpec::TotalStockValue),
            low_stock_items: aggregates.count(&low_stock),
            pending_requisitions: aggregates.count(&MetricSpec::PendingRequisitions),
            breakdown: aggregates.breakdown(&breakdown),
        }
    }

    /// Reports landing page: sums cover the most recent rows of each collection
    pub async fn reports_overview(&self) -> ReportsOverview {
        let all = QuerySpec::new();
        let recent = QuerySpec::new().recent(self.views.report_limit);

        let (students, fees, expenses, items) = tokio::join!(
            self.student_repo.count(&all),
            self.finance_repo.list_fees(&recent),
            self.finance_repo.list_expenses(&recent),
            self.stock_repo.list_items(&recent),
        );

        let rows = RowSets {
            fees: rows_or_empty("fees", fees),
            expenses: rows_or_empty("expenses", expenses),
            stock_items: rows_or_empty("stock_items", items),
            ..RowSets::default()
        }
        .with_count(MetricSpec::StudentCount, count_or_zero("students", students));

        let aggregates = compute_metrics(
            &rows,
            &[
                MetricSpec::StudentCount,
                MetricSpec::TotalFees,
                MetricSpec::TotalExpenses,
                MetricSpec::TotalStockValue,
            ],
        );

        ReportsOverview {
            total_students: aggregates.count(&MetricSpec::StudentCount),
            total_fees: aggregates.amount(&MetricSpec::TotalFees),
            total_expenses: aggregates.amount(&MetricSpec::TotalExpenses),
            stock_value: aggregates.amount(&MetricSpec::TotalStockValue),
        }
    }

    /// Stock report. Movements are limited to `period`; the item figures are
    /// always current.
    pub async fn stock_report(&self, period: &DateRange) -> StockReport {
        let breakdown = MetricSpec::StockBreakdown {
            default_threshold: self.threshold(),
        };
        let availability = MetricSpec::StockAvailability {
            default_threshold: self.threshold(),
        };
        let top = MetricSpec::TopConsumedItems {
            n: self.metrics.top_n,
        };

        let all = QuerySpec::new();
        let movements = within(QuerySpec::new(), "date", period);

        let (items, transactions) = tokio::join!(
            self.stock_repo.list_items(&all),
            self.stock_repo.list_transactions(&movements),
        );

        let rows = RowSets {
            stock_items: rows_or_empty("stock_items", items),
            transactions: rows_or_empty("stock_transactions", transactions),
            ..RowSets::default()
        };

        let aggregates = compute_metrics(
            &rows,
            &[
                breakdown.clone(),
                availability.clone(),
                MetricSpec::TotalStockValue,
                MetricSpec::AverageItemValue,
                MetricSpec::NetStockMovement,
                top.clone(),
            ],
        );

        StockReport {
            breakdown: aggregates.breakdown(&breakdown),
            availability_percent: aggregates.amount(&availability),
            total_value: aggregates.amount(&MetricSpec::TotalStockValue),
            average_item_value: aggregates.amount(&MetricSpec::AverageItemValue),
            net_movement: aggregates.quantity(&MetricSpec::NetStockMovement),
            top_consumed: aggregates.ranking(&top),
        }
    }

    /// Every student, reduced to fee-status counts and per-course enrollment
    pub async fn student_report(&self) -> StudentReport {
        let pending = MetricSpec::FeeStatusCount(FeeStatus::Pending);
        let partial = MetricSpec::FeeStatusCount(FeeStatus::Partial);
        let paid = MetricSpec::FeeStatusCount(FeeStatus::Paid);

        let all = QuerySpec::new();
        let admitted = rows_or_empty("students", self.student_repo.list(&all).await);

        let by_course = enrollment_by_course(&admitted);
        let rows = RowSets {
            students: admitted.into_iter().map(|row| row.student).collect(),
            ..RowSets::default()
        };

        let aggregates = compute_metrics(
            &rows,
            &[
                MetricSpec::StudentCount,
                pending.clone(),
                partial.clone(),
                paid.clone(),
                MetricSpec::FeesClearedPercent,
            ],
        );

        StudentReport {
            total_students: aggregates.count(&MetricSpec::StudentCount),
            fees_pending: aggregates.count(&pending),
            fees_partial: aggregates.count(&partial),
            fees_paid: aggregates.count(&paid),
            fees_cleared_percent: aggregates.amount(&MetricSpec::FeesClearedPercent),
            by_course,
        }
    }

    /// Financial report over fees and expenses dated within `period`
    pub async fn financial_report(&self, period: &DateRange) -> FinancialReport {
        let fees_due = within(QuerySpec::new(), "due_date", period);
        let expenses_dated = within(QuerySpec::new(), "date", period);
        let all = QuerySpec::new();

        let (fees, expenses, salaries) = tokio::join!(
            self.finance_repo.list_fees(&fees_due),
            self.finance_repo.list_expenses(&expenses_dated),
            self.finance_repo.list_salaries(&all),
        );

        let rows = RowSets {
            fees: rows_or_empty("fees", fees),
            expenses: rows_or_empty("expenses", expenses),
            salaries: rows_or_empty("salary", salaries),
            ..RowSets::default()
        };

        let aggregates = compute_metrics(
            &rows,
            &[
                MetricSpec::TotalFees,
                MetricSpec::PaidFees,
                MetricSpec::OutstandingFees,
                MetricSpec::TotalExpenses,
                MetricSpec::NetIncome,
                MetricSpec::ExpenseRatio,
                MetricSpec::ProfitMargin,
                MetricSpec::TotalSalaries,
            ],
        );

        FinancialReport {
            total_revenue: aggregates.amount(&MetricSpec::TotalFees),
            collected_fees: aggregates.amount(&MetricSpec::PaidFees),
            outstanding_fees: aggregates.amount(&MetricSpec::OutstandingFees),
            total_expenses: aggregates.amount(&MetricSpec::TotalExpenses),
            net_income: aggregates.amount(&MetricSpec::NetIncome),
            expense_ratio: aggregates.amount(&MetricSpec::ExpenseRatio),
            profit_margin: aggregates.amount(&MetricSpec::ProfitMargin),
            total_salaries: aggregates.amount(&MetricSpec::TotalSalaries),
        }
    }
}
