//! Derived metrics engine
//!
//! Reduces fetched row-sets into the numbers and classifications shown on
//! the dashboard, overview and report views. Every reduction is pure and
//! independent of the others, and every reduction over an empty row-set
//! yields zero. Views pass an empty row-set for a failed query.
//!
//! The stock classification and the zero-guarded ratio live here only, so
//! the dashboard widget, inventory table and stock report cannot drift apart.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{
    ApprovalStatus, Expense, Faculty, FeeRecord, FeeStatus, LeaveApplication, Requisition,
    SalaryRecord, StockItem, StockStatus, StockTransaction, Student, StudentWithCourse,
    TransactionKind,
};

/// Low-stock threshold used when an item has no minimum of its own
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

// ============================================================================
// Generic reductions
// ============================================================================

/// Cardinality of the rows matching `pred`
pub fn count_where<T>(rows: &[T], pred: impl Fn(&T) -> bool) -> u64 {
    rows.iter().filter(|row| pred(row)).count() as u64
}

/// Sum of a numeric field; 0 for an empty row-set
pub fn sum_by<T>(rows: &[T], field: impl Fn(&T) -> f64) -> f64 {
    rows.iter().map(field).sum()
}

/// Difference between two sums
pub fn net(total: f64, less: f64) -> f64 {
    total - less
}

/// `numerator / denominator * 100` rounded to one decimal.
///
/// A zero denominator yields exactly 0.0, as does any non-finite input.
pub fn ratio_percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return 0.0;
    }
    let percent = numerator / denominator * 100.0;
    if !percent.is_finite() {
        return 0.0;
    }
    (percent * 10.0).round() / 10.0
}

/// Whole-number percentage (attendance style); 0 when `total` is 0
pub fn whole_percent(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}

/// Mean rounded to a whole number; 0 when `count` is 0
pub fn average(total: f64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (total / count as f64).round()
}

/// Three-way stock classification.
///
/// `quantity == 0` is out of stock; below the item's minimum (or the default
/// threshold when the item has none) is low; at or above it is in stock.
pub fn classify_stock(quantity: i64, min_quantity: Option<i64>, default_threshold: i64) -> StockStatus {
    let threshold = min_quantity
        .filter(|min| *min > 0)
        .unwrap_or(default_threshold);

    if quantity <= 0 {
        StockStatus::OutOfStock
    } else if quantity < threshold {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

/// Classify a stock item
pub fn classify_item(item: &StockItem, default_threshold: i64) -> StockStatus {
    classify_stock(item.qty_available, item.min_quantity, default_threshold)
}

/// Σ quantity × unit price
pub fn stock_value(items: &[StockItem]) -> f64 {
    sum_by(items, |item| item.qty_available as f64 * item.unit_price)
}

/// Rows sorted by `key` descending, truncated to `n`. Equal keys keep their
/// input order.
pub fn top_n_by<T>(rows: &[T], n: usize, key: impl Fn(&T) -> f64) -> Vec<&T> {
    let mut ranked: Vec<&T> = rows.iter().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| key(b).total_cmp(&key(a)));
    ranked.truncate(n);
    ranked
}

/// Item counts per stock status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StockBreakdown {
    pub total: u64,
    pub in_stock: u64,
    pub low_stock: u64,
    pub out_of_stock: u64,
}

pub fn stock_breakdown(items: &[StockItem], default_threshold: i64) -> StockBreakdown {
    items.iter().fold(
        StockBreakdown::default(),
        |mut acc, item| {
            acc.total += 1;
            match classify_item(item, default_threshold) {
                StockStatus::InStock => acc.in_stock += 1,
                StockStatus::LowStock => acc.low_stock += 1,
                StockStatus::OutOfStock => acc.out_of_stock += 1,
            }
            acc
        },
    )
}

/// One line of a ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub item_id: i64,
    pub name: String,
    pub quantity: i64,
    pub value: f64,
}

/// Issued quantities per item, first-seen order, ranked by quantity
pub fn top_consumed_items(transactions: &[StockTransaction], n: usize) -> Vec<RankedItem> {
    let mut totals: Vec<RankedItem> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for tx in transactions.iter().filter(|tx| tx.kind == TransactionKind::Out) {
        match index.get(&tx.item_id) {
            Some(&i) => {
                totals[i].quantity += tx.quantity;
                totals[i].value += tx.total_value();
            }
            None => {
                index.insert(tx.item_id, totals.len());
                totals.push(RankedItem {
                    item_id: tx.item_id,
                    name: tx.item_name.clone(),
                    quantity: tx.quantity,
                    value: tx.total_value(),
                });
            }
        }
    }

    top_n_by(&totals, n, |item| item.quantity as f64)
        .into_iter()
        .cloned()
        .collect()
}

/// Received minus consumed quantity
pub fn net_stock_movement(transactions: &[StockTransaction]) -> i64 {
    transactions.iter().fold(0, |acc, tx| match tx.kind {
        TransactionKind::In => acc + tx.quantity,
        TransactionKind::Out => acc - tx.quantity,
    })
}

/// Students admitted to one course
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseEnrollment {
    pub course_id: String,
    pub course_name: Option<String>,
    pub students: u64,
}

/// Student counts per course, largest first; ties ordered by course id
pub fn enrollment_by_course(students: &[StudentWithCourse]) -> Vec<CourseEnrollment> {
    let mut courses: Vec<CourseEnrollment> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in students {
        let course_id = row.student.course_id.as_str();
        match index.get(course_id) {
            Some(&i) => courses[i].students += 1,
            None => {
                index.insert(course_id, courses.len());
                courses.push(CourseEnrollment {
                    course_id: course_id.to_string(),
                    course_name: row.course_name.clone(),
                    students: 1,
                });
            }
        }
    }

    courses.sort_by(|a, b| {
        b.students
            .cmp(&a.students)
            .then_with(|| a.course_id.cmp(&b.course_id))
    });
    courses
}

// ============================================================================
// Named metrics
// ============================================================================

/// Row-sets fetched for one view. A collection whose query failed is left
/// empty.
#[derive(Debug, Clone, Default)]
pub struct RowSets {
    pub students: Vec<Student>,
    pub faculty: Vec<Faculty>,
    pub fees: Vec<FeeRecord>,
    pub expenses: Vec<Expense>,
    pub salaries: Vec<SalaryRecord>,
    pub stock_items: Vec<StockItem>,
    pub leaves: Vec<LeaveApplication>,
    pub requisitions: Vec<Requisition>,
    pub transactions: Vec<StockTransaction>,
    /// Cardinalities obtained from count queries. They take precedence over
    /// counting materialized rows.
    pub counts: Vec<(MetricSpec, u64)>,
}

impl RowSets {
    pub fn with_count(mut self, spec: MetricSpec, count: u64) -> Self {
        self.counts.retain(|(s, _)| *s != spec);
        self.counts.push((spec, count));
        self
    }

    fn known_count(&self, spec: &MetricSpec) -> Option<u64> {
        self.counts
            .iter()
            .find(|(s, _)| s == spec)
            .map(|(_, count)| *count)
    }
}

/// A named reduction over [`RowSets`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSpec {
    StudentCount,
    FacultyCount,
    PendingLeaves,
    /// Items with quantity strictly below `threshold` (out-of-stock included)
    LowStockCount { threshold: i64 },
    TotalItems,
    PendingRequisitions,
    FeeStatusCount(FeeStatus),
    /// Students whose fees are fully paid, as a whole-number percentage
    FeesClearedPercent,
    /// Fee records marked paid
    PaidFeeCount,
    TotalFees,
    PaidFees,
    OutstandingFees,
    TotalExpenses,
    TotalSalaries,
    /// Fees minus expenses
    NetIncome,
    TotalStockValue,
    AverageItemValue,
    StockBreakdown { default_threshold: i64 },
    /// In-stock items as a percentage of all items
    StockAvailability { default_threshold: i64 },
    /// Expenses as a percentage of fee revenue
    ExpenseRatio,
    /// Net income as a percentage of fee revenue
    ProfitMargin,
    /// Received minus consumed quantity
    NetStockMovement,
    TopConsumedItems { n: usize },
}

/// Result of one reduction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Aggregate {
    Count(u64),
    Amount(f64),
    Quantity(i64),
    Percent(f64),
    Breakdown(StockBreakdown),
    Ranking(Vec<RankedItem>),
}

/// Reductions in the order they were requested
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates(Vec<(MetricSpec, Aggregate)>);

impl Aggregates {
    pub fn get(&self, spec: &MetricSpec) -> Option<&Aggregate> {
        self.0.iter().find(|(s, _)| s == spec).map(|(_, a)| a)
    }

    pub fn count(&self, spec: &MetricSpec) -> u64 {
        match self.get(spec) {
            Some(Aggregate::Count(n)) => *n,
            _ => 0,
        }
    }

    pub fn amount(&self, spec: &MetricSpec) -> f64 {
        match self.get(spec) {
            Some(Aggregate::Amount(v)) | Some(Aggregate::Percent(v)) => *v,
            _ => 0.0,
        }
    }

    pub fn quantity(&self, spec: &MetricSpec) -> i64 {
        match self.get(spec) {
            Some(Aggregate::Quantity(q)) => *q,
            _ => 0,
        }
    }

    pub fn breakdown(&self, spec: &MetricSpec) -> StockBreakdown {
        match self.get(spec) {
            Some(Aggregate::Breakdown(b)) => *b,
            _ => StockBreakdown::default(),
        }
    }

    pub fn ranking(&self, spec: &MetricSpec) -> Vec<RankedItem> {
        match self.get(spec) {
            Some(Aggregate::Ranking(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compute every requested metric over `rows`
pub fn compute_metrics(rows: &RowSets, specs: &[MetricSpec]) -> Aggregates {
    Aggregates(
        specs
            .iter()
            .map(|spec| (spec.clone(), compute_one(rows, spec)))
            .collect(),
    )
}

fn total_fees(rows: &RowSets) -> f64 {
    sum_by(&rows.fees, |fee| fee.amount)
}

fn total_expenses(rows: &RowSets) -> f64 {
    sum_by(&rows.expenses, |expense| expense.amount)
}

fn compute_one(rows: &RowSets, spec: &MetricSpec) -> Aggregate {
    if let Some(count) = rows.known_count(spec) {
        return Aggregate::Count(count);
    }

    match spec {
        MetricSpec::StudentCount => Aggregate::Count(rows.students.len() as u64),
        MetricSpec::FacultyCount => Aggregate::Count(rows.faculty.len() as u64),
        MetricSpec::TotalItems => Aggregate::Count(rows.stock_items.len() as u64),
        MetricSpec::PendingLeaves => Aggregate::Count(count_where(&rows.leaves, |leave| {
            leave.status == ApprovalStatus::Pending
        })),
        MetricSpec::LowStockCount { threshold } => Aggregate::Count(count_where(
            &rows.stock_items,
            |item| item.qty_available < *threshold,
        )),
        MetricSpec::PendingRequisitions => Aggregate::Count(count_where(
            &rows.requisitions,
            |req| req.status == ApprovalStatus::Pending,
        )),
        MetricSpec::FeeStatusCount(status) => Aggregate::Count(count_where(
            &rows.students,
            |student| student.fee_status == *status,
        )),
        MetricSpec::FeesClearedPercent => {
            let cleared = count_where(&rows.students, |student| {
                student.fee_status == FeeStatus::Paid
            });
            Aggregate::Percent(whole_percent(cleared, rows.students.len() as u64) as f64)
        }
        MetricSpec::PaidFeeCount => Aggregate::Count(count_where(&rows.fees, |fee| fee.paid)),
        MetricSpec::TotalFees => Aggregate::Amount(total_fees(rows)),
        MetricSpec::PaidFees => {
            Aggregate::Amount(sum_by(&rows.fees, |fee| if fee.paid { fee.amount } else { 0.0 }))
        }
        MetricSpec::OutstandingFees => {
            Aggregate::Amount(sum_by(&rows.fees, |fee| if fee.paid { 0.0 } else { fee.amount }))
        }
        MetricSpec::TotalExpenses => Aggregate::Amount(total_expenses(rows)),
        MetricSpec::TotalSalaries => {
            Aggregate::Amount(sum_by(&rows.salaries, |salary| salary.net_salary))
        }
        MetricSpec::NetIncome => Aggregate::Amount(net(total_fees(rows), total_expenses(rows))),
        MetricSpec::TotalStockValue => Aggregate::Amount(stock_value(&rows.stock_items)),
        MetricSpec::AverageItemValue => Aggregate::Amount(average(
            stock_value(&rows.stock_items),
            rows.stock_items.len() as u64,
        )),
        MetricSpec::StockBreakdown { default_threshold } => {
            Aggregate::Breakdown(stock_breakdown(&rows.stock_items, *default_threshold))
        }
        MetricSpec::StockAvailability { default_threshold } => {
            let breakdown = stock_breakdown(&rows.stock_items, *default_threshold);
            Aggregate::Percent(ratio_percent(
                breakdown.in_stock as f64,
                breakdown.total as f64,
            ))
        }
        MetricSpec::ExpenseRatio => {
            Aggregate::Percent(ratio_percent(total_expenses(rows), total_fees(rows)))
        }
        MetricSpec::ProfitMargin => {
            let revenue = total_fees(rows);
            Aggregate::Percent(ratio_percent(net(revenue, total_expenses(rows)), revenue))
        }
        MetricSpec::NetStockMovement => {
            Aggregate::Quantity(net_stock_movement(&rows.transactions))
        }
        MetricSpec::TopConsumedItems { n } => {
            Aggregate::Ranking(top_consumed_items(&rows.transactions, *n))
        }
    }
}



#[cfg(test)]
mod property_tests {
    use super::fixtures::*;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A zero denominator always gives exactly zero.
        #[test]
        fn ratio_with_zero_denominator_is_zero(numerator in any::<f64>()) {
            let result = ratio_percent(numerator, 0.0);
            prop_assert_eq!(result, 0.0);
        }

        /// Ratios over finite inputs are always finite.
        #[test]
        fn ratio_is_always_finite(num in -1e12f64..1e12, den in -1e12f64..1e12) {
            prop_assert!(ratio_percent(num, den).is_finite());
        }

        /// Exactly one status applies, with the documented boundaries.
        #[test]
        fn classification_is_total(quantity in 0i64..10_000, threshold in 1i64..1_000) {
            let status = classify_stock(quantity, Some(threshold), DEFAULT_LOW_STOCK_THRESHOLD);
            let expected = if quantity == 0 {
                StockStatus::OutOfStock
            } else if quantity < threshold {
                StockStatus::LowStock
            } else {
                StockStatus::InStock
            };
            prop_assert_eq!(status, expected);
            prop_assert_eq!(classify_stock(threshold, Some(threshold), 10), StockStatus::InStock);
        }

        /// Breakdown buckets always add up to the item count.
        #[test]
        fn breakdown_partitions_items(quantities in prop::collection::vec((0i64..50, prop::option::of(1i64..30)), 0..40)) {
            let items: Vec<StockItem> = quantities
                .iter()
                .enumerate()
                .map(|(i, (q, min))| item(i as i64, *q, *min, 1.0))
                .collect();
            let b = stock_breakdown(&items, DEFAULT_LOW_STOCK_THRESHOLD);
            prop_assert_eq!(b.total, items.len() as u64);
            prop_assert_eq!(b.in_stock + b.low_stock + b.out_of_stock, b.total);
        }

        /// Top-N output is sorted descending and ties keep input order.
        #[test]
        fn top_n_is_sorted_and_stable(keys in prop::collection::vec(0u8..5, 0..30), n in 0usize..35) {
            let rows: Vec<(f64, usize)> = keys.iter().enumerate().map(|(i, k)| (*k as f64, i)).collect();
            let top = top_n_by(&rows, n, |r| r.0);

            prop_assert_eq!(top.len(), n.min(rows.len()));
            for pair in top.windows(2) {
                prop_assert!(pair[0].0 >= pair[1].0);
                if pair[0].0 == pair[1].0 {
                    prop_assert!(pair[0].1 < pair[1].1);
                }
            }
        }

        /// Net income is always fees minus expenses.
        #[test]
        fn net_income_is_difference(fees in prop::collection::vec(0u32..100_000, 0..10), expenses in prop::collection::vec(0u32..100_000, 0..10)) {
            let rows = RowSets {
                fees: fees.iter().map(|a| fee(*a as f64, true)).collect(),
                expenses: expenses.iter().map(|a| expense(*a as f64)).collect(),
                ..Default::default()
            };
            let aggregates = compute_metrics(&rows, &[MetricSpec::NetIncome]);
            let expected: f64 = fees.iter().map(|a| *a as f64).sum::<f64>()
                - expenses.iter().map(|a| *a as f64).sum::<f64>();
            prop_assert_eq!(aggregates.amount(&MetricSpec::NetIncome), expected);
        }
    }
}
