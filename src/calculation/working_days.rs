//! Working-day detection for attendance periods.
//!
//! A working day is a Monday–Friday calendar date. Payroll prorates salary
//! over the working hours of a period, so every period must contain at
//! least one working day.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Nominal hours in one working day.
pub const HOURS_PER_DAY: u32 = 8;

/// Returns `true` for Saturdays and Sundays.
///
/// # Example
///
/// ```
/// use payslip_engine::calculation::is_weekend;
/// use chrono::NaiveDate;
///
/// // 2025-08-02 is a Saturday, 2025-08-04 a Monday
/// assert!(is_weekend(NaiveDate::from_ymd_opt(2025, 8, 2).unwrap()));
/// assert!(!is_weekend(NaiveDate::from_ymd_opt(2025, 8, 4).unwrap()));
/// ```
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts Mon–Fri dates in `[start, end]`, both inclusive.
///
/// Returns 0 when `end < start`. Whole weeks are counted arithmetically so
/// long ranges cost the same as short ones.
///
/// # Example
///
/// ```
/// use payslip_engine::calculation::count_working_days;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
/// assert_eq!(count_working_days(start, end), 21);
/// ```
pub fn count_working_days(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }

    let total_days = (end - start).num_days() + 1;
    let full_weeks = total_days / 7;
    let mut count = full_weeks * 5;

    let mut cursor = start + chrono::Duration::days(full_weeks * 7);
    while cursor <= end {
        if !is_weekend(cursor) {
            count += 1;
        }
        cursor = match cursor.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    count as u32
}

/// The working-time denominator of a period.
///
/// # Example
///
/// ```
/// use payslip_engine::calculation::WorkSchedule;
/// use chrono::NaiveDate;
///
/// let schedule = WorkSchedule::for_range(
///     NaiveDate::from_ymd_opt(2025, 8, 4).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 8, 10).unwrap(),
/// )
/// .unwrap();
/// assert_eq!(schedule.working_days, 5);
/// assert_eq!(schedule.working_hours, 40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSchedule {
    /// Mon–Fri days in the range.
    pub working_days: u32,
    /// `working_days * HOURS_PER_DAY`.
    pub working_hours: u32,
}

impl WorkSchedule {
    /// Builds the schedule for `[start, end]`.
    ///
    /// Fails with `InvalidInput` when the range holds no working day.
    pub fn for_range(start: NaiveDate, end: NaiveDate) -> EngineResult<Self> {
        let working_days = count_working_days(start, end);
        if working_days == 0 {
            return Err(EngineError::invalid_input("period has no working days"));
        }

        Ok(Self {
            working_days,
            working_hours: working_days * HOURS_PER_DAY,
        })
    }
}
