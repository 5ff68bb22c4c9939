//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session entity for user authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session with a random token
    pub fn issue(user_id: i64, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            user_id,
            expires_at: now + Duration::hours(ttl_hours),
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
