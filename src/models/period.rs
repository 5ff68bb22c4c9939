//! Reporting period

use chrono::NaiveDate;
use serde::Deserialize;

/// Inclusive date range for report queries. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Whether the range can contain any date
    pub fn is_valid(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_inverted_ranges() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        assert!(DateRange::default().is_valid());
        assert!(DateRange { from: Some(d(1)), to: None }.is_valid());
        assert!(DateRange { from: Some(d(5)), to: Some(d(5)) }.is_valid());
        assert!(!DateRange { from: Some(d(6)), to: Some(d(5)) }.is_valid());
    }
}
