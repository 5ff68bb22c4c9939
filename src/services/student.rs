//! Student service
//!
//! Admissions, the records list and fee-status updates.

use crate::db::repositories::StudentRepository;
use crate::db::QuerySpec;
use crate::models::{
    generate_admission_no, AdmitStudentInput, Course, FeeStatus, Student, StudentFilter,
    StudentWithCourse,
};
use anyhow::Context;
use chrono::{Datelike, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StudentError {
    #[error("Student not found: {0}")]
    NotFound(i64),

    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct StudentService {
    repo: Arc<dyn StudentRepository>,
}

impl StudentService {
    pub fn new(repo: Arc<dyn StudentRepository>) -> Self {
        Self { repo }
    }

    /// Admit a student.
    ///
    /// The admission number is derived from the year, the course and the
    /// number of students already admitted to that course in that year.
    /// Fee status starts at `pending`.
    ///
    /// # Errors
    /// - `ValidationError` for an empty name, a future date of birth or an
    ///   implausible year
    /// - `CourseNotFound` if the course id is unknown
    pub async fn admit(&self, input: AdmitStudentInput) -> Result<Student, StudentError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(StudentError::ValidationError("Name is required".to_string()));
        }
        let today = Utc::now().date_naive();
        if input.dob >= today {
            return Err(StudentError::ValidationError(
                "Date of birth must be in the past".to_string(),
            ));
        }
        if input.year < 1900 || input.year > today.year() + 1 {
            return Err(StudentError::ValidationError(format!(
                "Invalid academic year: {}",
                input.year
            )));
        }

        let course = self
            .repo
            .get_course(&input.course_id)
            .await
            .context("Failed to load course")?
            .ok_or_else(|| StudentError::CourseNotFound(input.course_id.clone()))?;

        let already_admitted = self
            .repo
            .count(
                &QuerySpec::new()
                    .eq("course_id", course.id.as_str())
                    .eq("year", input.year),
            )
            .await
            .context("Failed to count admissions")?;
        let sequence = u32::try_from(already_admitted + 1).unwrap_or(u32::MAX);

        let now = Utc::now();
        let student = Student {
            id: 0,
            admission_no: generate_admission_no(input.year, &course.id, sequence),
            name: name.to_string(),
            dob: input.dob,
            course_id: course.id,
            year: input.year,
            fee_status: FeeStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create(&student)
            .await
            .context("Failed to admit student")?;
        tracing::info!("Admitted {} as {}", created.name, created.admission_no);
        Ok(created)
    }

    /// Records list, newest first. Column filters go to the store; the
    /// search term is matched against the fetched rows.
    pub async fn list(&self, filter: &StudentFilter) -> Result<Vec<StudentWithCourse>, StudentError> {
        let mut spec = QuerySpec::new().order_by("created_at", true);
        if let Some(status) = filter.fee_status {
            spec = spec.eq("fee_status", status.to_string());
        }
        if let Some(course_id) = filter.course_id.as_deref().filter(|c| !c.is_empty()) {
            spec = spec.eq("course_id", course_id);
        }
        if let Some(year) = filter.year {
            spec = spec.eq("year", year);
        }

        let rows = self
            .repo
            .list(&spec)
            .await
            .context("Failed to list students")?;

        Ok(rows
            .into_iter()
            .filter(|row| filter.matches_search(&row.student))
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<Student, StudentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to load student")?
            .ok_or(StudentError::NotFound(id))
    }

    /// Record the outcome of fee collection
    pub async fn set_fee_status(&self, id: i64, status: FeeStatus) -> Result<Student, StudentError> {
        let updated = self
            .repo
            .update_fee_status(id, status)
            .await
            .context("Failed to update fee status")?;
        if !updated {
            return Err(StudentError::NotFound(id));
        }
        self.get(id).await
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>, StudentError> {
        Ok(self.repo.list_courses().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::migrated_pool;
    use crate::db::repositories::SqlxStudentRepository;
    use chrono::NaiveDate;

    async fn setup() -> StudentService {
        let pool = migrated_pool().await;
        StudentService::new(SqlxStudentRepository::boxed(pool))
    }

    fn admission(name: &str, course_id: &str, year: i32) -> AdmitStudentInput {
        AdmitStudentInput {
            name: name.to_string(),
            dob: NaiveDate::from_ymd_opt(2004, 8, 15).unwrap(),
            course_id: course_id.to_string(),
            year,
        }
    }

    #[tokio::test]
    async fn test_admission_numbers_follow_course_and_year() {
        let service = setup().await;

        let first = service.admit(admission("Anita Singh", "bsc-nursing", 2024)).await.unwrap();
        let second = service.admit(admission("Rahul Verma", "bsc-nursing", 2024)).await.unwrap();
        let other_course = service.admit(admission("Meera Das", "gnm", 2024)).await.unwrap();
        let other_year = service.admit(admission("Joseph K", "bsc-nursing", 2023)).await.unwrap();

        assert_eq!(first.admission_no, "2024BSC001");
        assert_eq!(second.admission_no, "2024BSC002");
        assert_eq!(other_course.admission_no, "2024GNM001");
        assert_eq!(other_year.admission_no, "2023BSC001");
        assert_eq!(first.fee_status, FeeStatus::Pending);
    }

    #[tokio::test]
    async fn test_admit_validation() {
        let service = setup().await;

        assert!(matches!(
            service.admit(admission("  ", "gnm", 2024)).await,
            Err(StudentError::ValidationError(_))
        ));
        assert!(matches!(
            service.admit(admission("Anita", "dentistry", 2024)).await,
            Err(StudentError::CourseNotFound(_))
        ));
        assert!(matches!(
            service.admit(admission("Anita", "gnm", 1850)).await,
            Err(StudentError::ValidationError(_))
        ));

        let mut future = admission("Anita", "gnm", 2024);
        future.dob = Utc::now().date_naive() + chrono::Duration::days(30);
        assert!(matches!(
            service.admit(future).await,
            Err(StudentError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_list_search_and_filters() {
        let service = setup().await;
        let anita = service.admit(admission("Anita Singh", "gnm", 2024)).await.unwrap();
        service.admit(admission("Rahul Verma", "gnm", 2024)).await.unwrap();
        service.admit(admission("Anil Kumar", "msc-nursing", 2024)).await.unwrap();

        let all = service.list(&StudentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|row| row.course_name.is_some()));

        let search = StudentFilter {
            search: Some("ANI".to_string()),
            ..Default::default()
        };
        assert_eq!(service.list(&search).await.unwrap().len(), 2);

        let by_admission = StudentFilter {
            search: Some("gnm001".to_string()),
            ..Default::default()
        };
        let found = service.list(&by_admission).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].student.id, anita.id);

        let by_course = StudentFilter {
            course_id: Some("msc-nursing".to_string()),
            ..Default::default()
        };
        assert_eq!(service.list(&by_course).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_fee_status() {
        let service = setup().await;
        let student = service.admit(admission("Anita Singh", "gnm", 2024)).await.unwrap();

        let updated = service.set_fee_status(student.id, FeeStatus::Paid).await.unwrap();
        assert_eq!(updated.fee_status, FeeStatus::Paid);

        let paid = StudentFilter {
            fee_status: Some(FeeStatus::Paid),
            ..Default::default()
        };
        assert_eq!(service.list(&paid).await.unwrap().len(), 1);

        assert!(matches!(
            service.set_fee_status(999, FeeStatus::Paid).await,
            Err(StudentError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_list_courses() {
        let service = setup().await;
        let courses = service.list_courses().await.unwrap();
        assert_eq!(courses.len(), 5);
    }
}
