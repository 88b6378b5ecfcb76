//! Calculation logic for the payslip engine.
//!
//! This module contains the pure pay computation: working-day detection for a
//! period, the two-decimal rounding policy, and the prorated base/overtime
//! formula shared by payroll runs and live payslips.

mod pay_formula;
mod rounding;
mod working_days;

pub use pay_formula::{OVERTIME_MULTIPLIER, PayInputs, compute_pay, hourly_rate};
pub use rounding::{Fixed2, round2};
pub use working_days::{HOURS_PER_DAY, WorkSchedule, count_working_days, is_weekend};
