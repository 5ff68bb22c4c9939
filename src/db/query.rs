//! Filter grammar for row-set and count queries
//!
//! A [`QuerySpec`] carries equality / inequality / range filters, an optional
//! ordering and an optional limit. Repositories render it against their own
//! column allowlist, so a column name never reaches SQL unless the
//! repository knows it. Values are always bound, never interpolated.

use anyhow::{bail, Result};
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Sqlite};

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Op {
    fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
        }
    }
}

/// Bound value of a filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(v as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<chrono::NaiveDate> for FilterValue {
    fn from(v: chrono::NaiveDate) -> Self {
        FilterValue::Text(v.format("%Y-%m-%d").to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: Op,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub column: String,
    pub descending: bool,
}

/// Filters, ordering and limit for one read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub filters: Vec<Filter>,
    pub order: Option<Ordering>,
    pub limit: Option<i64>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: &str, op: Op, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, Op::Eq, value)
    }

    pub fn ne(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, Op::Ne, value)
    }

    pub fn lt(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, Op::Lt, value)
    }

    pub fn lte(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, Op::Lte, value)
    }

    pub fn gt(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, Op::Gt, value)
    }

    pub fn gte(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, Op::Gte, value)
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(Ordering {
            column: column.to_string(),
            descending,
        });
        self
    }

    /// Most recent first, by `created_at`
    pub fn recent(self, limit: i64) -> Self {
        self.order_by("created_at", true).limit(limit)
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.max(0));
        self
    }

    /// ` WHERE ...` for the filters, with `?` placeholders.
    ///
    /// `prefix` qualifies columns (e.g. `"s."`) when the read joins tables.
    pub fn where_sql(&self, allowed: &[&str], prefix: &str) -> Result<String> {
        if self.filters.is_empty() {
            return Ok(String::new());
        }

        let mut clauses = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            check_column(&filter.column, allowed)?;
            clauses.push(format!("{}{} {} ?", prefix, filter.column, filter.op.as_sql()));
        }
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }

    /// ` ORDER BY ... LIMIT ...`. Ties fall back to `id` so reads are repeatable.
    pub fn tail_sql(&self, allowed: &[&str], prefix: &str) -> Result<String> {
        let mut sql = String::new();
        match &self.order {
            Some(order) => {
                check_column(&order.column, allowed)?;
                let dir = if order.descending { "DESC" } else { "ASC" };
                sql.push_str(&format!(
                    " ORDER BY {p}{} {d}, {p}id {d}",
                    order.column,
                    p = prefix,
                    d = dir
                ));
            }
            None => sql.push_str(&format!(" ORDER BY {}id ASC", prefix)),
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        Ok(sql)
    }

    /// Full row-set read: `{select}{where}{order}{limit}`
    pub fn select_sql(&self, select: &str, allowed: &[&str], prefix: &str) -> Result<String> {
        Ok(format!(
            "{}{}{}",
            select,
            self.where_sql(allowed, prefix)?,
            self.tail_sql(allowed, prefix)?
        ))
    }

    /// Cardinality read over `table`; ordering and limit do not apply
    pub fn count_sql(&self, table: &str, allowed: &[&str]) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) as count FROM {}{}",
            table,
            self.where_sql(allowed, "")?
        ))
    }

    pub fn values(&self) -> impl Iterator<Item = &FilterValue> {
        self.filters.iter().map(|f| &f.value)
    }
}

fn check_column(column: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&column) {
        bail!("Unknown column in query: {}", column);
    }
    Ok(())
}

/// Bind filter values onto a SQLite query, in filter order
pub fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    spec: &QuerySpec,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in spec.values() {
        query = match value.clone() {
            FilterValue::Int(v) => query.bind(v),
            FilterValue::Float(v) => query.bind(v),
            FilterValue::Text(v) => query.bind(v),
            FilterValue::Bool(v) => query.bind(v),
        };
    }
    query
}

/// Bind filter values onto a MySQL query, in filter order
pub fn bind_mysql<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    spec: &QuerySpec,
) -> Query<'q, MySql, MySqlArguments> {
    for value in spec.values() {
        query = match value.clone() {
            FilterValue::Int(v) => query.bind(v),
            FilterValue::Float(v) => query.bind(v),
            FilterValue::Text(v) => query.bind(v),
            FilterValue::Bool(v) => query.bind(v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["id", "status", "qty_available", "created_at"];

    #[test]
    fn test_empty_spec() {
        let spec = QuerySpec::new();
        assert_eq!(spec.where_sql(COLUMNS, "").unwrap(), "");
        assert_eq!(spec.tail_sql(COLUMNS, "").unwrap(), " ORDER BY id ASC");
        assert_eq!(
            spec.count_sql("leaves", COLUMNS).unwrap(),
            "SELECT COUNT(*) as count FROM leaves"
        );
    }

    #[test]
    fn test_filters_render_in_order() {
        let spec = QuerySpec::new()
            .eq("status", "pending")
            .lt("qty_available", 10i64);
        assert_eq!(
            spec.where_sql(COLUMNS, "").unwrap(),
            " WHERE status = ? AND qty_available < ?"
        );
        let values: Vec<&FilterValue> = spec.values().collect();
        assert_eq!(
            values,
            vec![&FilterValue::Text("pending".into()), &FilterValue::Int(10)]
        );
    }

    #[test]
    fn test_recent_with_prefix() {
        let spec = QuerySpec::new().ne("status", "rejected").recent(5);
        assert_eq!(
            spec.select_sql("SELECT l.* FROM leaves l", COLUMNS, "l.").unwrap(),
            "SELECT l.* FROM leaves l WHERE l.status <> ? ORDER BY l.created_at DESC, l.id DESC LIMIT 5"
        );
    }

    #[test]
    fn test_unknown_column_rejected() {
        let spec = QuerySpec::new().eq("password_hash", "x");
        assert!(spec.where_sql(COLUMNS, "").is_err());

        let spec = QuerySpec::new().order_by("1; DROP TABLE users", false);
        assert!(spec.tail_sql(COLUMNS, "").is_err());
    }

    #[test]
    fn test_count_ignores_order_and_limit() {
        let spec = QuerySpec::new().gte("qty_available", 1i64).recent(3);
        assert_eq!(
            spec.count_sql("stock_items", COLUMNS).unwrap(),
            "SELECT COUNT(*) as count FROM stock_items WHERE qty_available >= ?"
        );
    }

    #[test]
    fn test_negative_limit_clamped() {
        let spec = QuerySpec::new().limit(-4);
        assert_eq!(spec.limit, Some(0));
    }

    #[test]
    fn test_date_value() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(FilterValue::from(date), FilterValue::Text("2024-03-01".into()));
    }
}
