//! Faculty and leave application models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Faculty member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faculty {
    pub id: i64,
    pub name: String,
    pub designation: String,
    pub salary: f64,
    pub leave_balance: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a faculty member
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFacultyInput {
    pub name: String,
    pub designation: String,
    pub salary: f64,
    #[serde(default)]
    pub leave_balance: i32,
}

/// Status of a leave application or stock requisition.
///
/// `Pending` is the only non-terminal state: it moves to `Approved` or
/// `Rejected` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    /// Apply a decision. Returns `None` when the current state is terminal
    /// or the decision is not itself terminal.
    pub fn decide(self, decision: ApprovalStatus) -> Option<ApprovalStatus> {
        if self.is_terminal() || !decision.is_terminal() {
            return None;
        }
        Some(decision)
    }
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid approval status: {}", s)),
        }
    }
}

/// Leave application filed by a faculty member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveApplication {
    pub id: i64,
    pub faculty_id: i64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub reason: String,
    pub status: ApprovalStatus,
    pub substitute_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveApplication {
    /// Inclusive number of days covered
    pub fn days(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }
}

/// Leave row with the faculty member expanded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveWithFaculty {
    #[serde(flatten)]
    pub leave: LeaveApplication,
    pub faculty_name: Option<String>,
    pub faculty_designation: Option<String>,
}

/// Input for a new leave application
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyLeaveInput {
    pub faculty_id: i64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub substitute_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_from_pending() {
        assert_eq!(
            ApprovalStatus::Pending.decide(ApprovalStatus::Approved),
            Some(ApprovalStatus::Approved)
        );
        assert_eq!(
            ApprovalStatus::Pending.decide(ApprovalStatus::Rejected),
            Some(ApprovalStatus::Rejected)
        );
    }

    #[test]
    fn test_terminal_states_do_not_move() {
        assert_eq!(ApprovalStatus::Approved.decide(ApprovalStatus::Rejected), None);
        assert_eq!(ApprovalStatus::Rejected.decide(ApprovalStatus::Approved), None);
        assert_eq!(ApprovalStatus::Approved.decide(ApprovalStatus::Approved), None);
    }

    #[test]
    fn test_pending_is_not_a_decision() {
        assert_eq!(ApprovalStatus::Pending.decide(ApprovalStatus::Pending), None);
    }

    #[test]
    fn test_leave_days_inclusive() {
        let now = Utc::now();
        let leave = LeaveApplication {
            id: 1,
            faculty_id: 1,
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            reason: "Conference".to_string(),
            status: ApprovalStatus::Pending,
            substitute_id: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(leave.days(), 3);
    }
}
