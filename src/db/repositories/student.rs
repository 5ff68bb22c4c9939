//! Student repository
//!
//! Students and the course reference table. Reads expand the course name
//! through a left join, so a student whose course row is gone still lists.

use crate::config::DatabaseDriver;
use crate::db::query::{bind_mysql, bind_sqlite, QuerySpec};
use crate::db::DynDatabasePool;
use crate::models::{Course, FeeStatus, Student, StudentWithCourse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Columns a [`QuerySpec`] may filter or order students by
pub const STUDENT_COLUMNS: &[&str] = &[
    "id",
    "admission_no",
    "name",
    "dob",
    "course_id",
    "year",
    "fee_status",
    "created_at",
];

const SELECT_STUDENTS: &str = r#"
    SELECT s.id, s.admission_no, s.name, s.dob, s.course_id, s.year, s.fee_status,
           s.created_at, s.updated_at, c.name AS course_name
    FROM students s
    LEFT JOIN courses c ON c.id = s.course_id"#;

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Students matching `spec`, each with its course name
    async fn list(&self, spec: &QuerySpec) -> Result<Vec<StudentWithCourse>>;

    async fn count(&self, spec: &QuerySpec) -> Result<i64>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Student>>;

    async fn create(&self, student: &Student) -> Result<Student>;

    /// Returns false when no student has `id`
    async fn update_fee_status(&self, id: i64, status: FeeStatus) -> Result<bool>;

    async fn list_courses(&self) -> Result<Vec<Course>>;

    async fn get_course(&self, id: &str) -> Result<Option<Course>>;
}

pub struct SqlxStudentRepository {
    pool: DynDatabasePool,
}

impl SqlxStudentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn StudentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl StudentRepository for SqlxStudentRepository {
    async fn list(&self, spec: &QuerySpec) -> Result<Vec<StudentWithCourse>> {
        let sql = spec.select_sql(SELECT_STUDENTS, STUDENT_COLUMNS, "s.")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list students")?;
                rows.iter().map(row_to_student_with_course_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(&sql), spec)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list students")?;
                rows.iter().map(row_to_student_with_course_mysql).collect()
            }
        }
    }

    async fn count(&self, spec: &QuerySpec) -> Result<i64> {
        let sql = spec.count_sql("students", STUDENT_COLUMNS)?;
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(&sql), spec)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count students")?
                .get::<i64, _>("count"),
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(&sql), spec)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count students")?
                .get::<i64, _>("count"),
        };
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Student>> {
        let spec = QuerySpec::new().eq("id", id).limit(1);
        Ok(self.list(&spec).await?.into_iter().next().map(|s| s.student))
    }

    async fn create(&self, student: &Student) -> Result<Student> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_student_sqlite(self.pool.as_sqlite().unwrap(), student).await
            }
            DatabaseDriver::Mysql => {
                create_student_mysql(self.pool.as_mysql().unwrap(), student).await
            }
        }
    }

    async fn update_fee_status(&self, id: i64, status: FeeStatus) -> Result<bool> {
        let sql = "UPDATE students SET fee_status = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(status.to_string())
                .bind(now)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update fee status")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(status.to_string())
                .bind(now)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update fee status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let sql = "SELECT id, name, duration, created_at FROM courses ORDER BY name";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list courses")?;
                Ok(rows.iter().map(row_to_course_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list courses")?;
                Ok(rows.iter().map(row_to_course_mysql).collect())
            }
        }
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>> {
        let sql = "SELECT id, name, duration, created_at FROM courses WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get course")?;
                Ok(row.as_ref().map(row_to_course_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get course")?;
                Ok(row.as_ref().map(row_to_course_mysql))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_student_sqlite(pool: &SqlitePool, student: &Student) -> Result<Student> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO students (admission_no, name, dob, course_id, year, fee_status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&student.admission_no)
    .bind(&student.name)
    .bind(student.dob)
    .bind(&student.course_id)
    .bind(student.year)
    .bind(student.fee_status.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create student")?;

    Ok(Student {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..student.clone()
    })
}

fn row_to_student_with_course_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<StudentWithCourse> {
    let fee_status: String = row.get("fee_status");
    Ok(StudentWithCourse {
        student: Student {
            id: row.get("id"),
            admission_no: row.get("admission_no"),
            name: row.get("name"),
            dob: row.get("dob"),
            course_id: row.get("course_id"),
            year: row.get("year"),
            fee_status: FeeStatus::from_str(&fee_status)
                .with_context(|| format!("Invalid fee status in database: {}", fee_status))?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        course_name: row.get("course_name"),
    })
}

fn row_to_course_sqlite(row: &sqlx::sqlite::SqliteRow) -> Course {
    Course {
        id: row.get("id"),
        name: row.get("name"),
        duration: row.get("duration"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_student_mysql(pool: &MySqlPool, student: &Student) -> Result<Student> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO students (admission_no, name, dob, course_id, year, fee_status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&student.admission_no)
    .bind(&student.name)
    .bind(student.dob)
    .bind(&student.course_id)
    .bind(student.year)
    .bind(student.fee_status.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create student")?;

    Ok(Student {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..student.clone()
    })
}

fn row_to_student_with_course_mysql(row: &sqlx::mysql::MySqlRow) -> Result<StudentWithCourse> {
    let fee_status: String = row.get("fee_status");
    Ok(StudentWithCourse {
        student: Student {
            id: row.get("id"),
            admission_no: row.get("admission_no"),
            name: row.get("name"),
            dob: row.get("dob"),
            course_id: row.get("course_id"),
            year: row.get("year"),
            fee_status: FeeStatus::from_str(&fee_status)
                .with_context(|| format!("Invalid fee status in database: {}", fee_status))?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        course_name: row.get("course_name"),
    })
}

fn row_to_course_mysql(row: &sqlx::mysql::MySqlRow) -> Course {
    Course {
        id: row.get("id"),
        name: row.get("name"),
        duration: row.get("duration"),
        created_at: row.get("created_at"),
    }
}
