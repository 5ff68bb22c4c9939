//! Student and course models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Course a student is enrolled in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Short identifier, e.g. "bsc-nursing"
    pub id: String,
    pub name: String,
    /// Duration in years
    pub duration: i32,
    pub created_at: DateTime<Utc>,
}

/// Fee status of a student, mutated by fee collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Pending,
    Partial,
    Paid,
}

impl Default for FeeStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeStatus::Pending => write!(f, "pending"),
            FeeStatus::Partial => write!(f, "partial"),
            FeeStatus::Paid => write!(f, "paid"),
        }
    }
}

impl FromStr for FeeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(FeeStatus::Pending),
            "partial" => Ok(FeeStatus::Partial),
            "paid" => Ok(FeeStatus::Paid),
            _ => Err(anyhow::anyhow!("Invalid fee status: {}", s)),
        }
    }
}

/// Student admitted to the institute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    /// Admission number (unique)
    pub admission_no: String,
    pub name: String,
    pub dob: NaiveDate,
    pub course_id: String,
    /// Academic year of admission
    pub year: i32,
    pub fee_status: FeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student row with its course expanded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentWithCourse {
    #[serde(flatten)]
    pub student: Student,
    /// None when the referenced course row is missing
    pub course_name: Option<String>,
}

/// Input for admitting a student
#[derive(Debug, Clone, Deserialize)]
pub struct AdmitStudentInput {
    pub name: String,
    pub dob: NaiveDate,
    pub course_id: String,
    pub year: i32,
}

/// List filter for the student records view
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentFilter {
    /// Case-insensitive match on name or admission number
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub fee_status: Option<FeeStatus>,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl StudentFilter {
    /// Client-side search term match, as the records table does it
    pub fn matches_search(&self, student: &Student) -> bool {
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                student.name.to_lowercase().contains(&term)
                    || student.admission_no.to_lowercase().contains(&term)
            }
        }
    }
}

/// Build an admission number: year, first three characters of the course id
/// (uppercased) and a zero-padded sequence, e.g. `2024BSC007`.
pub fn generate_admission_no(year: i32, course_id: &str, sequence: u32) -> String {
    let prefix: String = course_id.chars().take(3).collect::<String>().to_uppercase();
    format!("{}{}{:03}", year, prefix, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(name: &str, admission_no: &str) -> Student {
        let now = Utc::now();
        Student {
            id: 1,
            admission_no: admission_no.to_string(),
            name: name.to_string(),
            dob: NaiveDate::from_ymd_opt(2004, 5, 1).unwrap(),
            course_id: "gnm".to_string(),
            year: 2024,
            fee_status: FeeStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_generate_admission_no() {
        assert_eq!(generate_admission_no(2024, "bsc-nursing", 7), "2024BSC007");
        assert_eq!(generate_admission_no(2023, "gnm", 120), "2023GNM120");
        assert_eq!(generate_admission_no(2024, "ab", 1), "2024AB001");
    }

    #[test]
    fn test_fee_status_from_str() {
        assert_eq!(FeeStatus::from_str("PAID").unwrap(), FeeStatus::Paid);
        assert_eq!(FeeStatus::from_str("partial").unwrap(), FeeStatus::Partial);
        assert!(FeeStatus::from_str("overdue").is_err());
        assert_eq!(FeeStatus::default(), FeeStatus::Pending);
    }

    #[test]
    fn test_filter_search() {
        let s = student("Anita Singh", "2024GNM003");
        let mut filter = StudentFilter::default();
        assert!(filter.matches_search(&s));

        filter.search = Some("anita".to_string());
        assert!(filter.matches_search(&s));

        filter.search = Some("gnm003".to_string());
        assert!(filter.matches_search(&s));

        filter.search = Some("rajesh".to_string());
        assert!(!filter.matches_search(&s));
    }
}
