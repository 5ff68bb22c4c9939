//! User model
//!
//! This module defines the User entity and the closed `Role` enumeration.
//! Role strings coming back from the store are converted at the boundary:
//! anything outside the six institute roles becomes `Role::Unrecognized`
//! instead of flowing through as a free-form string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User profile row. Authentication yields a session; the profile is what
/// carries the role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique, used to log in)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Institute role
    pub role: Role,
    /// Optional job title shown next to the name
    pub designation: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User. The password must already be hashed.
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            email,
            password_hash,
            role,
            designation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Institute role.
///
/// The six known roles are the only values a navigation section can grant
/// access to. `Unrecognized` keeps the raw stored value for diagnostics and
/// never matches any section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Principal,
    Faculty,
    Accountant,
    Clerk,
    Student,
    Unrecognized(String),
}

impl Role {
    /// Every enumerated role, in display order
    pub const KNOWN: [Role; 6] = [
        Role::Admin,
        Role::Principal,
        Role::Faculty,
        Role::Accountant,
        Role::Clerk,
        Role::Student,
    ];

    /// Parse a stored role string. Never fails.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "principal" => Role::Principal,
            "faculty" => Role::Faculty,
            "accountant" => Role::Accountant,
            "clerk" => Role::Clerk,
            "student" => Role::Student,
            _ => Role::Unrecognized(s.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Role::Unrecognized(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Principal => "principal",
            Role::Faculty => "faculty",
            Role::Accountant => "accountant",
            Role::Clerk => "clerk",
            Role::Student => "student",
            Role::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(&s)
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Role::parse(s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub designation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "Priya".to_string(),
            "priya@aine.edu".to_string(),
            "hash".to_string(),
            Role::Faculty,
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.role, Role::Faculty);
        assert!(user.designation.is_none());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_role_parse_known() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("PRINCIPAL"), Role::Principal);
        assert_eq!(Role::parse(" Clerk "), Role::Clerk);
        for role in Role::KNOWN {
            assert_eq!(Role::parse(role.as_str()), role);
        }
    }

    #[test]
    fn test_role_parse_unknown_keeps_raw_value() {
        let role = Role::parse("guest");
        assert_eq!(role, Role::Unrecognized("guest".to_string()));
        assert!(!role.is_recognized());
        assert_eq!(role.to_string(), "guest");
    }

    #[test]
    fn test_role_serde_boundary() {
        let role: Role = serde_json::from_str("\"accountant\"").unwrap();
        assert_eq!(role, Role::Accountant);

        let role: Role = serde_json::from_str("\"superuser\"").unwrap();
        assert_eq!(role, Role::Unrecognized("superuser".to_string()));

        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
    }
}
