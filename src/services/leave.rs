//! Leave service
//!
//! Faculty leave applications: filed as pending, decided exactly once.

use crate::db::repositories::LeaveRepository;
use crate::db::QuerySpec;
use crate::models::{
    ApplyLeaveInput, ApprovalStatus, CreateFacultyInput, Faculty, LeaveApplication,
    LeaveWithFaculty,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error("Leave application not found: {0}")]
    NotFound(i64),

    #[error("Faculty member not found: {0}")]
    FacultyNotFound(i64),

    /// The application is already approved or rejected
    #[error("Leave application {id} is already {status}")]
    AlreadyDecided { id: i64, status: ApprovalStatus },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct LeaveService {
    repo: Arc<dyn LeaveRepository>,
}

impl LeaveService {
    pub fn new(repo: Arc<dyn LeaveRepository>) -> Self {
        Self { repo }
    }

    pub async fn add_faculty(&self, input: CreateFacultyInput) -> Result<Faculty, LeaveError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(LeaveError::ValidationError("Name is required".to_string()));
        }
        if !input.salary.is_finite() || input.salary < 0.0 {
            return Err(LeaveError::ValidationError(
                "Salary must be a non-negative amount".to_string(),
            ));
        }
        if input.leave_balance < 0 {
            return Err(LeaveError::ValidationError(
                "Leave balance cannot be negative".to_string(),
            ));
        }

        let faculty = Faculty {
            id: 0,
            name: name.to_string(),
            designation: input.designation.trim().to_string(),
            salary: input.salary,
            leave_balance: input.leave_balance,
            created_at: Utc::now(),
        };
        Ok(self
            .repo
            .create_faculty(&faculty)
            .await
            .context("Failed to add faculty")?)
    }

    pub async fn list_faculty(&self) -> Result<Vec<Faculty>, LeaveError> {
        Ok(self
            .repo
            .list_faculty(&QuerySpec::new().order_by("name", false))
            .await?)
    }

    /// File a leave application. It starts as pending.
    ///
    /// # Errors
    /// - `ValidationError` if the range is inverted, the reason is empty, or
    ///   the substitute is the applicant
    /// - `FacultyNotFound` if the applicant or substitute does not exist
    pub async fn apply(&self, input: ApplyLeaveInput) -> Result<LeaveApplication, LeaveError> {
        if input.date_from > input.date_to {
            return Err(LeaveError::ValidationError(
                "Leave must end on or after its start date".to_string(),
            ));
        }
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(LeaveError::ValidationError("Reason is required".to_string()));
        }
        if input.substitute_id == Some(input.faculty_id) {
            return Err(LeaveError::ValidationError(
                "A faculty member cannot substitute for themselves".to_string(),
            ));
        }

        self.require_faculty(input.faculty_id).await?;
        if let Some(substitute_id) = input.substitute_id {
            self.require_faculty(substitute_id).await?;
        }

        let now = Utc::now();
        let leave = LeaveApplication {
            id: 0,
            faculty_id: input.faculty_id,
            date_from: input.date_from,
            date_to: input.date_to,
            reason: reason.to_string(),
            status: ApprovalStatus::Pending,
            substitute_id: input.substitute_id,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create(&leave)
            .await
            .context("Failed to file leave application")?;
        tracing::debug!(
            "Leave {} filed for faculty {} ({} day(s))",
            created.id,
            created.faculty_id,
            created.days()
        );
        Ok(created)
    }

    /// Approve or reject a pending application
    pub async fn decide(&self, id: i64, decision: ApprovalStatus) -> Result<LeaveApplication, LeaveError> {
        if !decision.is_terminal() {
            return Err(LeaveError::ValidationError(
                "A decision must be approved or rejected".to_string(),
            ));
        }

        let current = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to load leave application")?
            .ok_or(LeaveError::NotFound(id))?;

        let next = current
            .status
            .decide(decision)
            .ok_or(LeaveError::AlreadyDecided {
                id,
                status: current.status,
            })?;

        // The guarded update loses to a concurrent decision
        if !self
            .repo
            .update_status(id, current.status, next)
            .await
            .context("Failed to update leave status")?
        {
            let status = self
                .repo
                .get_by_id(id)
                .await
                .context("Failed to reload leave application")?
                .map(|leave| leave.status)
                .ok_or(LeaveError::NotFound(id))?;
            return Err(LeaveError::AlreadyDecided { id, status });
        }

        tracing::info!("Leave {} {}", id, next);
        Ok(LeaveApplication {
            status: next,
            updated_at: Utc::now(),
            ..current
        })
    }

    /// Applications with the faculty member expanded, newest first
    pub async fn list(&self, status: Option<ApprovalStatus>) -> Result<Vec<LeaveWithFaculty>, LeaveError> {
        let mut spec = QuerySpec::new().order_by("created_at", true);
        if let Some(status) = status {
            spec = spec.eq("status", status.to_string());
        }
        Ok(self.repo.list(&spec).await?)
    }

    async fn require_faculty(&self, id: i64) -> Result<Faculty, LeaveError> {
        self.repo
            .get_faculty(id)
            .await
            .context("Failed to load faculty")?
            .ok_or(LeaveError::FacultyNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_faculty, migrated_pool};
    use crate::db::repositories::SqlxLeaveRepository;
    use crate::db::DynDatabasePool;
    use chrono::NaiveDate;

    async fn setup() -> (DynDatabasePool, LeaveService) {
        let pool = migrated_pool().await;
        let service = LeaveService::new(SqlxLeaveRepository::boxed(pool.clone()));
        (pool, service)
    }

    fn request(faculty_id: i64, from: u32, to: u32) -> ApplyLeaveInput {
        ApplyLeaveInput {
            faculty_id,
            date_from: NaiveDate::from_ymd_opt(2024, 9, from).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 9, to).unwrap(),
            reason: "Medical".to_string(),
            substitute_id: None,
        }
    }

    #[tokio::test]
    async fn test_apply_starts_pending() {
        let (pool, service) = setup().await;
        let faculty = insert_faculty(&pool, "Dr. Mehta", "Professor").await;
        let substitute = insert_faculty(&pool, "Ms. Rao", "Tutor").await;

        let mut input = request(faculty, 10, 12);
        input.substitute_id = Some(substitute);
        let leave = service.apply(input).await.unwrap();

        assert_eq!(leave.status, ApprovalStatus::Pending);
        assert_eq!(leave.days(), 3);
        assert_eq!(leave.substitute_id, Some(substitute));

        let listed = service.list(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].faculty_name.as_deref(), Some("Dr. Mehta"));
    }

    #[tokio::test]
    async fn test_apply_validation() {
        let (pool, service) = setup().await;
        let faculty = insert_faculty(&pool, "Dr. Mehta", "Professor").await;

        assert!(matches!(
            service.apply(request(faculty, 12, 10)).await,
            Err(LeaveError::ValidationError(_))
        ));
        assert!(matches!(
            service.apply(request(404, 10, 12)).await,
            Err(LeaveError::FacultyNotFound(404))
        ));

        let mut own_substitute = request(faculty, 10, 10);
        own_substitute.substitute_id = Some(faculty);
        assert!(matches!(
            service.apply(own_substitute).await,
            Err(LeaveError::ValidationError(_))
        ));

        let mut blank = request(faculty, 10, 10);
        blank.reason = "   ".to_string();
        assert!(matches!(
            service.apply(blank).await,
            Err(LeaveError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_decision_is_terminal() {
        let (pool, service) = setup().await;
        let faculty = insert_faculty(&pool, "Dr. Mehta", "Professor").await;
        let leave = service.apply(request(faculty, 1, 2)).await.unwrap();

        let approved = service.decide(leave.id, ApprovalStatus::Approved).await.unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);

        let again = service.decide(leave.id, ApprovalStatus::Rejected).await;
        assert!(matches!(
            again,
            Err(LeaveError::AlreadyDecided {
                status: ApprovalStatus::Approved,
                ..
            })
        ));

        let pending = service.list(Some(ApprovalStatus::Pending)).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_decide_rejects_bad_input() {
        let (pool, service) = setup().await;
        let faculty = insert_faculty(&pool, "Dr. Mehta", "Professor").await;
        let leave = service.apply(request(faculty, 1, 2)).await.unwrap();

        assert!(matches!(
            service.decide(leave.id, ApprovalStatus::Pending).await,
            Err(LeaveError::ValidationError(_))
        ));
        assert!(matches!(
            service.decide(999, ApprovalStatus::Approved).await,
            Err(LeaveError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_add_faculty() {
        let (_pool, service) = setup().await;
        let faculty = service
            .add_faculty(CreateFacultyInput {
                name: "Dr. Susan Thomas".to_string(),
                designation: "Principal".to_string(),
                salary: 95000.0,
                leave_balance: 24,
            })
            .await
            .unwrap();
        assert!(faculty.id > 0);

        assert!(matches!(
            service
                .add_faculty(CreateFacultyInput {
                    name: "X".to_string(),
                    designation: "Tutor".to_string(),
                    salary: -1.0,
                    leave_balance: 0,
                })
                .await,
            Err(LeaveError::ValidationError(_))
        ));
        assert_eq!(service.list_faculty().await.unwrap().len(), 1);
    }
}
