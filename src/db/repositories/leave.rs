//! Faculty and leave repository
//!
//! Leave reads expand the applicant's name and designation.

use crate::config::DatabaseDriver;
use crate::db::query::{bind_mysql, bind_sqlite, QuerySpec};
use crate::db::DynDatabasePool;
use crate::models::{ApprovalStatus, Faculty, LeaveApplication, LeaveWithFaculty};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

pub const FACULTY_COLUMNS: &[&str] = &["id", "name", "designation", "salary", "created_at"];

pub const LEAVE_COLUMNS: &[&str] = &[
    "id",
    "faculty_id",
    "date_from",
    "date_to",
    "status",
    "substitute_id",
    "created_at",
];

const SELECT_FACULTY: &str =
    "SELECT id, name, designation, salary, leave_balance, created_at FROM faculty";

const SELECT_LEAVES: &str = r#"
    SELECT l.id, l.faculty_id, l.date_from, l.date_to, l.reason, l.status, l.substitute_id,
           l.created_at, l.updated_at, f.name AS faculty_name, f.designation AS faculty_designation
    FROM leaves l
    LEFT JOIN faculty f ON f.id = l.faculty_id"#;

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn list_faculty(&self, spec: &QuerySpec) -> Result<Vec<Faculty>>;

    async fn count_faculty(&self, spec: &QuerySpec) -> Result<i64>;

    async fn get_faculty(&self, id: i64) -> Result<Option<Faculty>>;

    async fn create_faculty(&self, faculty: &Faculty) -> Result<Faculty>;

    /// Leave applications matching `spec`, with the applicant expanded
    async fn list(&self, spec: &QuerySpec) -> Result<Vec<LeaveWithFaculty>>;

    async fn count(&self, spec: &QuerySpec) -> Result<i64>;

    async fn get_by_id(&self, id: i64) -> Result<Option<LeaveApplication>>;

    async fn create(&self, leave: &LeaveApplication) -> Result<LeaveApplication>;

    /// Move a leave from `from` to `to`. Returns false if the row was not in
    /// `from` any more (or does not exist).
    async fn update_status(&self, id: i64, from: ApprovalStatus, to: ApprovalStatus) -> Result<bool>;
}

pub struct SqlxLeaveRepository {
    pool: DynDatabasePool,
}

impl SqlxLeaveRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LeaveRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LeaveRepository for SqlxLeaveRepository {
    async fn list_faculty(&self, spec: &QuerySpec) -> Result<Vec<Faculty>> {
        let sql = spec.select_sql(SELECT_FACULTY, FACULTY_COLUMNS, "")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list faculty")?;
                Ok(rows.iter().map(row_to_faculty_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list faculty")?;
                Ok(rows.iter().map(row_to_faculty_mysql).collect())
            }
        }
    }

    async fn count_faculty(&self, spec: &QuerySpec) -> Result<i64> {
        let sql = spec.count_sql("faculty", FACULTY_COLUMNS)?;
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), spec)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count faculty")?
                .get::<i64, _>("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), spec)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count faculty")?
                .get::<i64, _>("count"),
        };
        Ok(count)
    }

    async fn get_faculty(&self, id: i64) -> Result<Option<Faculty>> {
        let spec = QuerySpec::new().eq("id", id).limit(1);
        Ok(self.list_faculty(&spec).await?.into_iter().next())
    }

    async fn create_faculty(&self, faculty: &Faculty) -> Result<Faculty> {
        let sql = "INSERT INTO faculty (name, designation, salary, leave_balance, created_at) \
                   VALUES (?, ?, ?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&faculty.name)
                .bind(&faculty.designation)
                .bind(faculty.salary)
                .bind(faculty.leave_balance)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to create faculty")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&faculty.name)
                .bind(&faculty.designation)
                .bind(faculty.salary)
                .bind(faculty.leave_balance)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to create faculty")?
                .last_insert_id() as i64,
        };
        Ok(Faculty {
            id,
            created_at: now,
            ..faculty.clone()
        })
    }

    async fn list(&self, spec: &QuerySpec) -> Result<Vec<LeaveWithFaculty>> {
        let sql = spec.select_sql(SELECT_LEAVES, LEAVE_COLUMNS, "l.")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list leaves")?;
                rows.iter().map(row_to_leave_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list leaves")?;
                rows.iter().map(row_to_leave_mysql).collect()
            }
        }
    }

    async fn count(&self, spec: &QuerySpec) -> Result<i64> {
        let sql = spec.count_sql("leaves", LEAVE_COLUMNS)?;
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), spec)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count leaves")?
                .get::<i64, _>("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), spec)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count leaves")?
                .get::<i64, _>("count"),
        };
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<LeaveApplication>> {
        let spec = QuerySpec::new().eq("id", id).limit(1);
        Ok(self.list(&spec).await?.into_iter().next().map(|l| l.leave))
    }

    async fn create(&self, leave: &LeaveApplication) -> Result<LeaveApplication> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_leave_sqlite(self.pool.as_sqlite().unwrap(), leave).await,
            DatabaseDriver::Mysql => create_leave_mysql(self.pool.as_mysql().unwrap(), leave).await,
        }
    }

    async fn update_status(&self, id: i64, from: ApprovalStatus, to: ApprovalStatus) -> Result<bool> {
        // Guarded on the current status so two deciders cannot both win
        let sql = "UPDATE leaves SET status = ?, updated_at = ? WHERE id = ? AND status = ?";
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(to.to_string())
                .bind(now)
                .bind(id)
                .bind(from.to_string())
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update leave status")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(to.to_string())
                .bind(now)
                .bind(id)
                .bind(from.to_string())
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update leave status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_leave_sqlite(pool: &SqlitePool, leave: &LeaveApplication) -> Result<LeaveApplication> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO leaves (faculty_id, date_from, date_to, reason, status, substitute_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(leave.faculty_id)
    .bind(leave.date_from)
    .bind(leave.date_to)
    .bind(&leave.reason)
    .bind(leave.status.to_string())
    .bind(leave.substitute_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create leave application")?;

    Ok(LeaveApplication {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..leave.clone()
    })
}

fn row_to_faculty_sqlite(row: &sqlx::sqlite::SqliteRow) -> Faculty {
    Faculty {
        id: row.get("id"),
        name: row.get("name"),
        designation: row.get("designation"),
        salary: row.get("salary"),
        leave_balance: row.get("leave_balance"),
        created_at: row.get("created_at"),
    }
}

fn row_to_leave_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<LeaveWithFaculty> {
    let status: String = row.get("status");
    Ok(LeaveWithFaculty {
        leave: LeaveApplication {
            id: row.get("id"),
            faculty_id: row.get("faculty_id"),
            date_from: row.get("date_from"),
            date_to: row.get("date_to"),
            reason: row.get("reason"),
            status: ApprovalStatus::from_str(&status)
                .with_context(|| format!("Invalid leave status in database: {}", status))?,
            substitute_id: row.get("substitute_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        faculty_name: row.get("faculty_name"),
        faculty_designation: row.get("faculty_designation"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_leave_mysql(pool: &MySqlPool, leave: &LeaveApplication) -> Result<LeaveApplication> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO leaves (faculty_id, date_from, date_to, reason, status, substitute_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(leave.faculty_id)
    .bind(leave.date_from)
    .bind(leave.date_to)
    .bind(&leave.reason)
    .bind(leave.status.to_string())
    .bind(leave.substitute_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create leave application")?;

    Ok(LeaveApplication {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..leave.clone()
    })
}

fn row_to_faculty_mysql(row: &sqlx::mysql::MySqlRow) -> Faculty {
    Faculty {
        id: row.get("id"),
        name: row.get("name"),
        designation: row.get("designation"),
        salary: row.get("salary"),
        leave_balance: row.get("leave_balance"),
        created_at: row.get("created_at"),
    }
}

fn row_to_leave_mysql(row: &sqlx::mysql::MySqlRow) -> Result<LeaveWithFaculty> {
    let status: String = row.get("status");
    Ok(LeaveWithFaculty {
        leave: LeaveApplication {
            id: row.get("id"),
            faculty_id: row.get("faculty_id"),
            date_from: row.get("date_from"),
            date_to: row.get("date_to"),
            reason: row.get("reason"),
            status: ApprovalStatus::from_str(&status)
                .with_context(|| format!("Invalid leave status in database: {}", status))?,
            substitute_id: row.get("substitute_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        faculty_name: row.get("faculty_name"),
        faculty_designation: row.get("faculty_designation"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_faculty, migrated_pool};
    use chrono::NaiveDate;

    fn leave(faculty_id: i64, reason: &str) -> LeaveApplication {
        let now = Utc::now();
        LeaveApplication {
            id: 0,
            faculty_id,
            date_from: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
            reason: reason.to_string(),
            status: ApprovalStatus::Pending,
            substitute_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_faculty() {
        let pool = migrated_pool().await;
        let repo = SqlxLeaveRepository::new(pool);

        let faculty = Faculty {
            id: 0,
            name: "Dr. Lakshmi Iyer".to_string(),
            designation: "Professor".to_string(),
            salary: 85000.0,
            leave_balance: 20,
            created_at: Utc::now(),
        };
        let created = repo.create_faculty(&faculty).await.unwrap();
        let found = repo.get_faculty(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Dr. Lakshmi Iyer");
        assert_eq!(found.salary, 85000.0);
        assert_eq!(repo.count_faculty(&QuerySpec::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_leave_list_expands_faculty() {
        let pool = migrated_pool().await;
        let fid = insert_faculty(&pool, "Sister Mary", "Tutor").await;
        let repo = SqlxLeaveRepository::new(pool);

        let created = repo.create(&leave(fid, "Conference")).await.unwrap();
        let listed = repo.list(&QuerySpec::new()).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].leave.id, created.id);
        assert_eq!(listed[0].faculty_name.as_deref(), Some("Sister Mary"));
        assert_eq!(listed[0].faculty_designation.as_deref(), Some("Tutor"));
        assert_eq!(listed[0].leave.days(), 3);
    }

    #[tokio::test]
    async fn test_status_update_is_guarded() {
        let pool = migrated_pool().await;
        let fid = insert_faculty(&pool, "Ravi", "Lecturer").await;
        let repo = SqlxLeaveRepository::new(pool);

        let created = repo.create(&leave(fid, "Medical")).await.unwrap();
        let pending = QuerySpec::new().eq("status", "pending");
        assert_eq!(repo.count(&pending).await.unwrap(), 1);

        assert!(repo
            .update_status(created.id, ApprovalStatus::Pending, ApprovalStatus::Approved)
            .await
            .unwrap());
        // Already approved: the pending guard no longer matches
        assert!(!repo
            .update_status(created.id, ApprovalStatus::Pending, ApprovalStatus::Rejected)
            .await
            .unwrap());

        let stored = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::Approved);
        assert_eq!(repo.count(&pending).await.unwrap(), 0);
    }
}
