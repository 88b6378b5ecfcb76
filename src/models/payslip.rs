//! Payslip view model.
//!
//! A [`Payslip`] has the same shape whether it was read from a frozen payroll
//! item or computed live; `snapshot_used` tells the two apart.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AttendancePeriod, PeriodId, RecordId, ReimbursementRecord};
use crate::calculation::Fixed2;

/// The period block at the top of a payslip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayslipPeriod {
    /// The period identifier.
    pub id: PeriodId,
    /// Optional display name.
    pub name: Option<String>,
    /// The first day of the period.
    pub start_date: NaiveDate,
    /// The last day of the period.
    pub end_date: NaiveDate,
}

impl From<&AttendancePeriod> for PayslipPeriod {
    fn from(period: &AttendancePeriod) -> Self {
        Self {
            id: period.id,
            name: period.name.clone(),
            start_date: period.start_date,
            end_date: period.end_date,
        }
    }
}

/// One reimbursement listed on a payslip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReimbursementLine {
    /// The reimbursement row identifier.
    pub id: RecordId,
    /// The date of the expense.
    pub date: NaiveDate,
    /// The amount.
    pub amount: Fixed2,
    /// Optional description.
    pub description: Option<String>,
}

impl From<&ReimbursementRecord> for ReimbursementLine {
    fn from(record: &ReimbursementRecord) -> Self {
        Self {
            id: record.id,
            date: record.date,
            amount: Fixed2::new(record.amount),
            description: record.description.clone(),
        }
    }
}

/// A user's pay for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payslip {
    /// The period the payslip covers.
    pub period: PayslipPeriod,
    /// `true` when read from a payroll run snapshot, `false` when computed live.
    pub snapshot_used: bool,
    /// Mon–Fri days in the period.
    pub working_days: u32,
    /// Days the user attended.
    pub attendance_days: u32,
    /// `working_days * 8`.
    pub working_hours: u32,
    /// `attendance_days * 8`.
    pub attendance_hours: u32,
    /// Salary divided by working hours.
    pub hourly_rate: Fixed2,
    /// Prorated base pay.
    pub base_pay: Fixed2,
    /// Overtime hours claimed.
    pub overtime_hours: Fixed2,
    /// Always `2.00`.
    pub overtime_multiplier: Fixed2,
    /// Overtime pay.
    pub overtime_pay: Fixed2,
    /// Reimbursements in the period, always read live, ordered by date then id.
    pub reimbursements: Vec<ReimbursementLine>,
    /// Reimbursement total used in `grand_total`.
    pub reimbursement_sum: Fixed2,
    /// Salary the figures were computed from.
    pub salary_snapshot: Fixed2,
    /// Base pay plus overtime pay plus reimbursements.
    pub grand_total: Fixed2,
}
