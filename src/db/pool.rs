//! Store connection handle
//!
//! Repositories see one `DatabasePool` trait object whatever backend
//! `database.driver` selects, and reach the concrete sqlx pool through
//! `as_sqlite` / `as_mysql` after matching on `driver()`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows; yields the affected row count
    async fn execute(&self, sql: &str) -> Result<u64>;

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// Type alias for a boxed database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

pub struct SqliteDatabase {
    pool: SqlitePool,
}

/// Connect options for a configured SQLite location: a bare file path, a
/// `sqlite:` URL or `:memory:`. Foreign keys are switched on for every
/// connection the pool opens, not only the first.
fn sqlite_options(url: &str) -> Result<SqliteConnectOptions> {
    let options = if url == ":memory:" {
        SqliteConnectOptions::from_str("sqlite::memory:")?
    } else if url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid SQLite URL: {}", url))?
    } else {
        SqliteConnectOptions::new().filename(url)
    };
    Ok(options.create_if_missing(true).foreign_keys(true))
}

/// On-disk location named by a SQLite URL; None for in-memory stores
fn sqlite_file(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        None
    } else {
        Some(Path::new(path))
    }
}

impl SqliteDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let options = sqlite_options(url)?;

        if let Some(parent) = sqlite_file(url).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {:?}", parent)
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite store: {}", url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute statement: {}", sql))?;
        Ok(result.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(30)
            .connect(&url)
            .await
            .context("Failed to connect to MySQL store")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute statement: {}", sql))?;
        Ok(result.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Connect to the store described by `config`
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    tracing::debug!("Connecting to {:?} store", config.driver);
    match config.driver {
        DatabaseDriver::Sqlite => Ok(Arc::new(SqliteDatabase::new(&config.url).await?)),
        DatabaseDriver::Mysql => Ok(Arc::new(MysqlDatabase::new(&config.url).await?)),
    }
}

/// Fresh in-memory SQLite store; each call gets its own database
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_location() {
        assert_eq!(sqlite_file("data/aine.db"), Some(Path::new("data/aine.db")));
        assert_eq!(sqlite_file("sqlite://data/aine.db?mode=rwc"), Some(Path::new("data/aine.db")));
        assert_eq!(sqlite_file("sqlite:aine.db"), Some(Path::new("aine.db")));
        assert_eq!(sqlite_file(":memory:"), None);
        assert_eq!(sqlite_file("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn test_memory_store_dispatch() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
    }

    #[tokio::test]
    async fn test_memory_stores_are_isolated() {
        let first = create_test_pool().await.unwrap();
        let second = create_test_pool().await.unwrap();

        first.execute("CREATE TABLE marker (id INTEGER PRIMARY KEY)").await.unwrap();
        assert!(second.execute("INSERT INTO marker (id) VALUES (1)").await.is_err());
    }

    #[tokio::test]
    async fn test_foreign_keys_on_every_connection() {
        let pool = create_test_pool().await.unwrap();
        pool.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)").await.unwrap();
        pool.execute("CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id))")
            .await
            .unwrap();

        // Hold several connections at once so the insert below cannot reuse the first one
        let sqlite = pool.as_sqlite().unwrap();
        let _a = sqlite.acquire().await.unwrap();
        let _b = sqlite.acquire().await.unwrap();

        let orphan = pool.execute("INSERT INTO child (id, parent_id) VALUES (1, 99)").await;
        assert!(orphan.is_err());

        pool.execute("INSERT INTO parent (id) VALUES (99)").await.unwrap();
        let affected = pool
            .execute("INSERT INTO child (id, parent_id) VALUES (1, 99)")
            .await
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_file_store_creates_missing_directories() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("data").join("store").join("aine.db");

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        })
        .await
        .expect("Failed to create pool");
        pool.execute("CREATE TABLE marker (id INTEGER PRIMARY KEY)").await.unwrap();

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_sqlite_url_form() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("aine.db");

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: format!("sqlite:{}", db_path.to_string_lossy()),
        })
        .await
        .expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(db_path.exists());
    }

    // Set AINE_MYSQL_TEST_URL to run against a live server
    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_store_dispatch() {
        let url = std::env::var("AINE_MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/aine_test".to_string());

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        })
        .await
        .expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        assert!(pool.as_mysql().is_some());
        pool.execute("SELECT 1").await.unwrap();
    }
}
