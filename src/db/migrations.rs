//! Database migrations
//!
//! Schema for the institute store, embedded as SQL strings for both SQLite and
//! MySQL so the server ships as a single binary.
//!
//! ```ignore
//! use aine::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! Applied versions are tracked in `_migrations`; a migration runs once.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'student',
                designation VARCHAR(100),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'student',
                designation VARCHAR(100),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_users_email ON users(email);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    // Courses are reference data; the programme list ships with the schema
    Migration {
        version: 3,
        name: "create_courses",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS courses (
                id VARCHAR(64) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                duration INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT OR IGNORE INTO courses (id, name, duration) VALUES
                ('bsc-nursing', 'B.Sc. Nursing Programme', 4),
                ('post-basic-bsc-nursing', 'Post Basic B.Sc. Nursing', 2),
                ('msc-nursing', 'M.Sc. Nursing Programme', 2),
                ('gnm', 'GNM (General Nursing and Midwifery)', 3),
                ('nurse-practitioner-critical-care', 'Nurse Practitioner in Critical Care', 2);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS courses (
                id VARCHAR(64) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                duration INT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT IGNORE INTO courses (id, name, duration) VALUES
                ('bsc-nursing', 'B.Sc. Nursing Programme', 4),
                ('post-basic-bsc-nursing', 'Post Basic B.Sc. Nursing', 2),
                ('msc-nursing', 'M.Sc. Nursing Programme', 2),
                ('gnm', 'GNM (General Nursing and Midwifery)', 3),
                ('nurse-practitioner-critical-care', 'Nurse Practitioner in Critical Care', 2);
        "#,
    },
    Migration {
        version: 4,
        name: "create_students",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                admission_no VARCHAR(32) NOT NULL UNIQUE,
                name VARCHAR(100) NOT NULL,
                dob DATE NOT NULL,
                course_id VARCHAR(64) NOT NULL,
                year INTEGER NOT NULL,
                fee_status VARCHAR(20) NOT NULL DEFAULT 'pending',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (course_id) REFERENCES courses(id)
            );
            CREATE INDEX IF NOT EXISTS idx_students_course_id ON students(course_id);
            CREATE INDEX IF NOT EXISTS idx_students_fee_status ON students(fee_status);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS students (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                admission_no VARCHAR(32) NOT NULL UNIQUE,
                name VARCHAR(100) NOT NULL,
                dob DATE NOT NULL,
                course_id VARCHAR(64) NOT NULL,
                year INT NOT NULL,
                fee_status VARCHAR(20) NOT NULL DEFAULT 'pending',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (course_id) REFERENCES courses(id)
            );
            CREATE INDEX idx_students_course_id ON students(course_id);
            CREATE INDEX idx_students_fee_status ON students(fee_status);
        "#,
    },
    Migration {
        version: 5,
        name: "create_faculty_and_leaves",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS faculty (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                designation VARCHAR(100) NOT NULL,
                salary REAL NOT NULL DEFAULT 0,
                leave_balance INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS leaves (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                faculty_id INTEGER NOT NULL,
                date_from DATE NOT NULL,
                date_to DATE NOT NULL,
                reason TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                substitute_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (faculty_id) REFERENCES faculty(id) ON DELETE CASCADE,
                FOREIGN KEY (substitute_id) REFERENCES faculty(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_leaves_faculty_id ON leaves(faculty_id);
            CREATE INDEX IF NOT EXISTS idx_leaves_status ON leaves(status);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS faculty (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                designation VARCHAR(100) NOT NULL,
                salary DOUBLE NOT NULL DEFAULT 0,
                leave_balance INT NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS leaves (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                faculty_id BIGINT NOT NULL,
                date_from DATE NOT NULL,
                date_to DATE NOT NULL,
                reason TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                substitute_id BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (faculty_id) REFERENCES faculty(id) ON DELETE CASCADE,
                FOREIGN KEY (substitute_id) REFERENCES faculty(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_leaves_faculty_id ON leaves(faculty_id);
            CREATE INDEX idx_leaves_status ON leaves(status);
        "#,
    },
    Migration {
        version: 6,
        name: "create_finance",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS fees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                due_date DATE NOT NULL,
                paid BOOLEAN NOT NULL DEFAULT 0,
                receipt_url VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category VARCHAR(100) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,
                date DATE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS salary (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                faculty_id INTEGER NOT NULL,
                month VARCHAR(7) NOT NULL,
                base_salary REAL NOT NULL,
                deductions REAL NOT NULL DEFAULT 0,
                net_salary REAL NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (faculty_id) REFERENCES faculty(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_fees_student_id ON fees(student_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
            CREATE INDEX IF NOT EXISTS idx_salary_month ON salary(month);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS fees (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                student_id BIGINT NOT NULL,
                amount DOUBLE NOT NULL,
                due_date DATE NOT NULL,
                paid BOOLEAN NOT NULL DEFAULT FALSE,
                receipt_url VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS expenses (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                category VARCHAR(100) NOT NULL,
                description TEXT NOT NULL,
                amount DOUBLE NOT NULL,
                date DATE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS salary (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                faculty_id BIGINT NOT NULL,
                month VARCHAR(7) NOT NULL,
                base_salary DOUBLE NOT NULL,
                deductions DOUBLE NOT NULL DEFAULT 0,
                net_salary DOUBLE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (faculty_id) REFERENCES faculty(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_fees_student_id ON fees(student_id);
            CREATE INDEX idx_expenses_date ON expenses(date);
            CREATE INDEX idx_salary_month ON salary(month);
        "#,
    },
    Migration {
        version: 7,
        name: "create_stock",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS stock_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code VARCHAR(32) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL,
                category VARCHAR(100) NOT NULL,
                qty_available INTEGER NOT NULL DEFAULT 0,
                min_quantity INTEGER,
                unit_price REAL NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS requisitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER NOT NULL,
                qty INTEGER NOT NULL,
                requester_id INTEGER NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                approved_by INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (item_id) REFERENCES stock_items(id) ON DELETE CASCADE,
                FOREIGN KEY (requester_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (approved_by) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS stock_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER NOT NULL,
                item_name VARCHAR(255) NOT NULL,
                kind VARCHAR(8) NOT NULL,
                quantity INTEGER NOT NULL,
                unit_price REAL NOT NULL,
                party VARCHAR(255),
                date DATE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (item_id) REFERENCES stock_items(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_requisitions_status ON requisitions(status);
            CREATE INDEX IF NOT EXISTS idx_stock_transactions_item_id ON stock_transactions(item_id);
            CREATE INDEX IF NOT EXISTS idx_stock_transactions_date ON stock_transactions(date);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS stock_items (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                code VARCHAR(32) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL,
                category VARCHAR(100) NOT NULL,
                qty_available BIGINT NOT NULL DEFAULT 0,
                min_quantity BIGINT,
                unit_price DOUBLE NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS requisitions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                item_id BIGINT NOT NULL,
                qty BIGINT NOT NULL,
                requester_id BIGINT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                approved_by BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (item_id) REFERENCES stock_items(id) ON DELETE CASCADE,
                FOREIGN KEY (requester_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (approved_by) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS stock_transactions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                item_id BIGINT NOT NULL,
                item_name VARCHAR(255) NOT NULL,
                kind VARCHAR(8) NOT NULL,
                quantity BIGINT NOT NULL,
                unit_price DOUBLE NOT NULL,
                party VARCHAR(255),
                date DATE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (item_id) REFERENCES stock_items(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_requisitions_status ON requisitions(status);
            CREATE INDEX idx_stock_transactions_item_id ON stock_transactions(item_id);
            CREATE INDEX idx_stock_transactions_date ON stock_transactions(date);
        "#,
    },
];

/// Run all pending migrations, returning how many were applied
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.as_sqlite().unwrap()).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.as_mysql().unwrap()).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get::<i32, _>("version") as i64,
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(pool.as_sqlite().unwrap(), migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(pool.as_mysql().unwrap(), migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((cut, _)) => format!("{}...", &sql[..cut]),
        None => sql.to_string(),
    }
}

/// Split a migration body on `;`, dropping empty and comment-only pieces
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with("--")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        // Second run is a no-op
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_courses_seeded() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let row = sqlx::query("SELECT COUNT(*) as count FROM courses")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 5);

        let row = sqlx::query("SELECT name FROM courses WHERE id = 'gnm'")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let name: String = row.get("name");
        assert_eq!(name, "GNM (General Nursing and Midwifery)");
    }

    #[tokio::test]
    async fn test_users_defaults() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?)")
            .bind("Asha")
            .bind("asha@aine.edu")
            .bind("hash")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let row = sqlx::query("SELECT role, designation FROM users WHERE email = ?")
            .bind("asha@aine.edu")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let role: String = row.get("role");
        let designation: Option<String> = row.get("designation");
        assert_eq!(role, "student");
        assert!(designation.is_none());
    }

    #[tokio::test]
    async fn test_unique_email_and_admission_no() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let insert_user = "INSERT INTO users (name, email, password_hash) VALUES ('A', 'a@aine.edu', 'h')";
        sqlx::query(insert_user).execute(sqlite_pool).await.unwrap();
        assert!(sqlx::query(insert_user).execute(sqlite_pool).await.is_err());

        let insert_student = "INSERT INTO students (admission_no, name, dob, course_id, year) \
                              VALUES ('2024GNM001', 'S', '2003-04-01', 'gnm', 2024)";
        sqlx::query(insert_student).execute(sqlite_pool).await.unwrap();
        assert!(sqlx::query(insert_student).execute(sqlite_pool).await.is_err());
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let result = sqlx::query(
            "INSERT INTO leaves (faculty_id, date_from, date_to, reason) VALUES (999, '2024-01-01', '2024-01-02', 'x')",
        )
        .execute(sqlite_pool)
        .await;
        assert!(result.is_err());

        let result = sqlx::query(
            "INSERT INTO students (admission_no, name, dob, course_id, year) VALUES ('X', 'S', '2003-04-01', 'unknown', 2024)",
        )
        .execute(sqlite_pool)
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT);\n  -- note\n;CREATE INDEX i ON a(id);\n";
        let statements = split_sql_statements(sql);
        assert_eq!(statements, vec!["CREATE TABLE a (id INT)", "CREATE INDEX i ON a(id)"]);
    }

    #[test]
    fn test_migrations_have_unique_versions() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, i as i32 + 1);
            assert!(!split_sql_statements(migration.up_sqlite).is_empty());
            assert!(!split_sql_statements(migration.up_mysql).is_empty());
        }
    }

    #[test]
    fn test_truncate_sql() {
        assert_eq!(truncate_sql("SELECT 1"), "SELECT 1");
        let long = "x".repeat(150);
        assert_eq!(truncate_sql(&long).len(), 103);
    }
}
