//! Database repositories
//!
//! One repository per collection. Reads take a [`QuerySpec`](crate::db::query::QuerySpec)
//! (filters, ordering, limit); writes are insert-one or update-fields-by-id.

pub mod finance;
pub mod leave;
pub mod session;
pub mod stock;
pub mod student;
pub mod user;

pub use finance::{FinanceRepository, SqlxFinanceRepository};
pub use leave::{LeaveRepository, SqlxLeaveRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use stock::{SqlxStockRepository, StockRepository};
pub use student::{SqlxStudentRepository, StudentRepository};
pub use user::{SqlxUserRepository, UserRepository};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use chrono::Utc;

    pub async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    pub async fn insert_user(pool: &DynDatabasePool, email: &str, role: &str) -> i64 {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (name, email, password_hash, role, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(email.split('@').next().unwrap_or(email))
        .bind(email)
        .bind("hash")
        .bind(role)
        .bind(now)
        .bind(now)
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to insert user")
        .last_insert_rowid()
    }

    pub async fn insert_faculty(pool: &DynDatabasePool, name: &str, designation: &str) -> i64 {
        sqlx::query(
            "INSERT INTO faculty (name, designation, salary, leave_balance, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(designation)
        .bind(45000.0)
        .bind(12)
        .bind(Utc::now())
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to insert faculty")
        .last_insert_rowid()
    }

    pub async fn insert_student(pool: &DynDatabasePool, admission_no: &str, name: &str) -> i64 {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO students (admission_no, name, dob, course_id, year, fee_status, created_at, updated_at) \
             VALUES (?, ?, '2003-05-14', 'gnm', 2024, 'pending', ?, ?)",
        )
        .bind(admission_no)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to insert student")
        .last_insert_rowid()
    }
}
