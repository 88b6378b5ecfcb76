//! Attendance period model.
//!
//! This module contains the [`AttendancePeriod`] type, the inclusive calendar
//! window over which payroll is computed once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PeriodId;

/// An inclusive calendar-date range over which payroll is computed once.
///
/// Periods are immutable once created and never overlap each other.
///
/// # Example
///
/// ```
/// use payslip_engine::models::AttendancePeriod;
/// use chrono::NaiveDate;
///
/// let period = AttendancePeriod {
///     id: 1,
///     name: Some("Aug 2025".to_string()),
///     start_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2025, 8, 31).unwrap(),
/// };
///
/// assert!(period.contains_date(NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()));
/// assert!(period.overlaps(
///     NaiveDate::from_ymd_opt(2025, 8, 31).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
/// ));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePeriod {
    /// The period identifier.
    pub id: PeriodId,
    /// Optional display name (e.g., "Aug 2025").
    pub name: Option<String>,
    /// The first day of the period (inclusive).
    pub start_date: NaiveDate,
    /// The last day of the period (inclusive).
    pub end_date: NaiveDate,
}

impl AttendancePeriod {
    /// Checks if a given date falls within this period.
    ///
    /// The check is inclusive of both start and end dates.
    ///
    /// # Example
    ///
    /// ```
    /// use payslip_engine::models::AttendancePeriod;
    /// use chrono::NaiveDate;
    ///
    /// let period = AttendancePeriod {
    ///     id: 1,
    ///     name: None,
    ///     start_date: NaiveDate::from_ymd_opt(2026, 1, 13).unwrap(),
    ///     end_date: NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(),
    /// };
    ///
    /// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 13).unwrap())); // start date
    /// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 26).unwrap())); // end date
    /// assert!(!period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 12).unwrap())); // before
    /// assert!(!period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 27).unwrap())); // after
    /// ```
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Closed-interval overlap test against `[start, end]`.
    ///
    /// Two periods overlap when `self.start <= end && self.end >= start`, so
    /// sharing a single boundary day counts as an overlap.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }
}

/// A validated period that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPeriod {
    /// Optional display name.
    pub name: Option<String>,
    /// The first day of the period (inclusive).
    pub start_date: NaiveDate,
    /// The last day of the period (inclusive).
    pub end_date: NaiveDate,
}
