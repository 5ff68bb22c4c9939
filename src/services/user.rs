//! User service
//!
//! The identity gate: login, logout and resolving a session token to a
//! profile. A valid session whose profile row is missing is its own error,
//! distinct from "not logged in", but callers treat both the same way (send
//! the user to the login page). Neither ever degrades to a guest role.

use crate::config::MAX_SESSION_TTL_HOURS;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User};
use crate::services::password::{hash_password, is_acceptable_password, verify_password, MIN_PASSWORD_LENGTH};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

/// Default session lifetime in hours
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

/// Why a request could not be tied to a profile
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session, an unknown token, or an expired session
    #[error("Not authenticated")]
    Unauthenticated,

    /// Session is valid but the user row is gone
    #[error("Profile not found for session")]
    ProfileMissing,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Credentials submitted to the login endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl_hours: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_ttl(user_repo, session_repo, DEFAULT_SESSION_TTL_HOURS)
    }

    /// Sessions last `session_ttl_hours`, held to `1..=MAX_SESSION_TTL_HOURS`
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_ttl_hours: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl_hours: session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS),
        }
    }

    /// Create an account. The password is hashed before it is stored.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(UserServiceError::ValidationError("Name is required".to_string()));
        }
        let email = input.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(UserServiceError::ValidationError(format!(
                "Invalid email address: {}",
                input.email
            )));
        }
        if !is_acceptable_password(&input.password) {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if !input.role.is_recognized() {
            return Err(UserServiceError::ValidationError(format!(
                "Unknown role: {}",
                input.role
            )));
        }

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let mut user = User::new(name.to_string(), email, password_hash, input.role);
        user.designation = input.designation.filter(|d| !d.trim().is_empty());

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!("Created user {} with role {}", created.email, created.role);
        Ok(created)
    }

    /// Check credentials and open a session
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::debug!("Failed login for {}", user.email);
            return Err(invalid());
        }

        let session = Session::issue(user.id, self.session_ttl_hours);
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok((session, user))
    }

    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to the profile behind it
    pub async fn resolve_identity(&self, token: &str) -> Result<User, AuthError> {
        let session = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to load session")?
            .ok_or(AuthError::Unauthenticated)?;

        if session.is_expired() {
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Err(AuthError::Unauthenticated);
        }

        match self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to load profile")?
        {
            Some(user) => Ok(user),
            None => {
                tracing::warn!("Live session refers to missing user {}", session.user_id);
                Err(AuthError::ProfileMissing)
            }
        }
    }

    /// Drop every expired session
    pub async fn purge_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to purge sessions")?;
        if removed > 0 {
            tracing::debug!("Purged {} expired session(s)", removed);
        }
        Ok(removed)
    }

    pub async fn count_users(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await?)
    }
}
