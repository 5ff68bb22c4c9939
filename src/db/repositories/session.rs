//! Session repository
//!
//! Login sessions keyed by their opaque token.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Look up a session by token. Expired sessions are still returned.
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Remove every expired session, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_session_sqlite(self.pool.as_sqlite().unwrap(), session).await
            }
            DatabaseDriver::Mysql => {
                create_session_mysql(self.pool.as_mysql().unwrap(), session).await
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_session_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_session_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let sql = "DELETE FROM sessions WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete session")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete session")?;
            }
        }
        Ok(())
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        let sql = "DELETE FROM sessions WHERE user_id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(user_id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete sessions by user")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(user_id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete sessions by user")?;
            }
        }
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let sql = "DELETE FROM sessions WHERE expires_at < ?";
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
        };
        Ok(affected)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}
