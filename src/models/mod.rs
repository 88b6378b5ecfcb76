//! Core data models for the payslip engine.
//!
//! This module contains the persisted records of the period registry, the
//! activity ledger and the payroll engine, plus the payslip view.

mod attendance;
mod overtime;
mod payroll;
mod payslip;
mod period;
mod reimbursement;

pub use attendance::{AttendanceRecord, NewAttendance};
pub use overtime::{NewOvertime, OvertimeRecord};
pub use payroll::{NewPayrollItem, PayBreakdown, PayrollItem, PayrollRun, PayrollRunSummary};
pub use payslip::{Payslip, PayslipPeriod, ReimbursementLine};
pub use period::{AttendancePeriod, NewPeriod};
pub use reimbursement::{NewReimbursement, ReimbursementRecord};

/// Identifier of an employee, as supplied by the authentication layer.
pub type UserId = u64;

/// Identifier of an attendance period.
pub type PeriodId = u64;

/// Identifier of a payroll run.
pub type RunId = u64;

/// Identifier of a ledger row (attendance, overtime, reimbursement, payroll item).
pub type RecordId = u64;
