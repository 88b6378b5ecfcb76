//! The payroll formula shared by payroll runs and live payslips.
//!
//! ## Formula
//!
//! - `hourly_rate = salary / working_hours`
//! - `base_pay = round2(attendance_days * 8 * hourly_rate)`
//! - `overtime_pay = round2(overtime_hours * hourly_rate * 2)`
//! - `grand_total = round2(base_pay + overtime_pay + reimbursements)`
//!
//! Components are rounded before they are summed and the sum is rounded
//! again. Both the run and the live payslip call [`compute_pay`], which is
//! what keeps their numbers identical.

use serde::{Deserialize, Serialize};

use super::rounding::round2;
use super::working_days::{HOURS_PER_DAY, WorkSchedule};
use crate::models::PayBreakdown;

/// Overtime hours are paid at twice the hourly rate.
pub const OVERTIME_MULTIPLIER: f64 = 2.0;

/// Raw per-user aggregates for one period.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PayInputs {
    /// Current monthly salary; 0 when the user has no salary record.
    pub salary: f64,
    /// Attendance marks within the period.
    pub attendance_days: u32,
    /// Sum of overtime hours within the period.
    pub overtime_hours: f64,
    /// Sum of reimbursement amounts within the period, unrounded.
    pub reimbursement_total: f64,
}

/// Unrounded hourly rate; 0 when there are no working hours.
///
/// # Example
///
/// ```
/// use payslip_engine::calculation::hourly_rate;
///
/// assert_eq!(hourly_rate(7_360_000.0, 184), 40_000.0);
/// assert_eq!(hourly_rate(7_360_000.0, 0), 0.0);
/// ```
pub fn hourly_rate(salary: f64, working_hours: u32) -> f64 {
    if working_hours == 0 {
        return 0.0;
    }
    salary / f64::from(working_hours)
}

/// Computes one user's pay for a period.
///
/// # Example
///
/// ```
/// use payslip_engine::calculation::{compute_pay, PayInputs, WorkSchedule};
/// use chrono::NaiveDate;
///
/// // July 2025 has 23 weekdays -> 184 working hours
/// let schedule = WorkSchedule::for_range(
///     NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
/// )
/// .unwrap();
///
/// let pay = compute_pay(
///     schedule,
///     PayInputs {
///         salary: 7_000_000.0,
///         attendance_days: 20,
///         overtime_hours: 5.0,
///         reimbursement_total: 100_000.0,
///     },
/// );
///
/// assert_eq!(pay.base_pay, 6086956.52);
/// assert_eq!(pay.overtime_pay, 380434.78);
/// assert_eq!(pay.grand_total, 6567391.30);
/// ```
pub fn compute_pay(schedule: WorkSchedule, inputs: PayInputs) -> PayBreakdown {
    let attendance_hours = inputs.attendance_days * HOURS_PER_DAY;
    let hourly = hourly_rate(inputs.salary, schedule.working_hours);

    let base_pay = round2(f64::from(attendance_hours) * hourly);
    let overtime_pay = round2(inputs.overtime_hours * (hourly * OVERTIME_MULTIPLIER));
    let grand_total = round2(base_pay + overtime_pay + inputs.reimbursement_total);

    PayBreakdown {
        snapshot_salary: round2(inputs.salary),
        working_days: schedule.working_days,
        attendance_days: inputs.attendance_days,
        working_hours: schedule.working_hours,
        attendance_hours,
        overtime_hours: round2(inputs.overtime_hours),
        base_pay,
        overtime_pay,
        reimbursement_total: round2(inputs.reimbursement_total),
        grand_total,
    }
}
