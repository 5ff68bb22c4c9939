//! User repository
//!
//! Profile rows. The stored role string is converted to [`Role`] on read;
//! values outside the enumeration come back as `Role::Unrecognized`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Role, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, designation, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get user by ID")?;
                Ok(row.map(|r| row_to_user_sqlite(&r)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get user by ID")?;
                Ok(row.map(|r| row_to_user_mysql(&r)))
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let email = email.trim().to_lowercase();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(&email)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get user by email")?;
                Ok(row.map(|r| row_to_user_sqlite(&r)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(&email)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get user by email")?;
                Ok(row.map(|r| row_to_user_mysql(&r)))
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM users";
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count users")?
                .get::<i64, _>("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count users")?
                .get::<i64, _>("count"),
        };
        Ok(row)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let email = user.email.trim().to_lowercase();

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role, designation, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(&user.designation)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        email,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: Role::parse(&role),
        designation: row.get("designation"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let email = user.email.trim().to_lowercase();

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role, designation, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(&user.designation)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        email,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: Role::parse(&role),
        designation: row.get("designation"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};

    #[tokio::test]
    async fn test_create_and_get_user() {
        let pool = migrated_pool().await;
        let repo = SqlxUserRepository::new(pool);

        let mut user = User::new(
            "Meera Nair".to_string(),
            "Meera@AINE.edu ".to_string(),
            "hash".to_string(),
            Role::Accountant,
        );
        user.designation = Some("Senior Accountant".to_string());

        let created = repo.create(&user).await.expect("Failed to create user");
        assert!(created.id > 0);
        assert_eq!(created.email, "meera@aine.edu");

        let found = repo.get_by_id(created.id).await.unwrap().expect("User not found");
        assert_eq!(found.role, Role::Accountant);
        assert_eq!(found.designation.as_deref(), Some("Senior Accountant"));

        let by_email = repo.get_by_email("MEERA@aine.edu").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = migrated_pool().await;
        let repo = SqlxUserRepository::new(pool);
        let user = User::new("A".into(), "a@aine.edu".into(), "h".into(), Role::Clerk);
        repo.create(&user).await.unwrap();
        assert!(repo.create(&user).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_role_becomes_unrecognized() {
        let pool = migrated_pool().await;
        let id = insert_user(&pool, "guest@aine.edu", "Visitor").await;
        let repo = SqlxUserRepository::new(pool);

        let user = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Unrecognized("Visitor".to_string()));
        assert!(!user.role.is_recognized());
    }

    #[tokio::test]
    async fn test_missing_user() {
        let pool = migrated_pool().await;
        let repo = SqlxUserRepository::new(pool);
        assert!(repo.get_by_id(404).await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@aine.edu").await.unwrap().is_none());
    }
}
