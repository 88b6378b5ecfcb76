//! Payroll run and payroll item models.
//!
//! A [`PayrollRun`] locks an attendance period; its [`PayrollItem`]s are the
//! frozen per-user snapshot every later payslip for that period reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PeriodId, RecordId, RunId, UserId};

/// The one-time computation event that freezes pay for a period.
///
/// At most one run exists per period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    /// The run identifier.
    pub id: RunId,
    /// The period this run covers.
    pub period_id: PeriodId,
    /// The instant the run executed.
    pub run_at: DateTime<Utc>,
}

/// Every quantity a payslip needs, already rounded per the pay policy.
///
/// Money and hour values hold `round2` results; day and hour counts are exact.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PayBreakdown {
    /// Monthly salary at computation time.
    pub snapshot_salary: f64,
    /// Mon–Fri days in the period.
    pub working_days: u32,
    /// Days the user marked attendance within the period.
    pub attendance_days: u32,
    /// `working_days * 8`.
    pub working_hours: u32,
    /// `attendance_days * 8`.
    pub attendance_hours: u32,
    /// Overtime hours claimed within the period.
    pub overtime_hours: f64,
    /// Prorated pay for attended hours.
    pub base_pay: f64,
    /// Overtime hours paid at twice the hourly rate.
    pub overtime_pay: f64,
    /// Sum of reimbursements within the period.
    pub reimbursement_total: f64,
    /// `round2(base_pay + overtime_pay + reimbursements)`.
    pub grand_total: f64,
}

impl PayBreakdown {
    /// The all-zero breakdown used for users without a snapshot item.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// A frozen per-user pay snapshot belonging to a [`PayrollRun`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollItem {
    /// The row identifier.
    pub id: RecordId,
    /// The owning run.
    pub run_id: RunId,
    /// The employee this item pays.
    pub user_id: UserId,
    /// The frozen quantities.
    #[serde(flatten)]
    pub pay: PayBreakdown,
}

/// A computed item not yet attached to a persisted run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPayrollItem {
    /// The employee this item pays.
    pub user_id: UserId,
    /// The computed quantities.
    pub pay: PayBreakdown,
}

/// A run together with all of its items.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollRunSummary {
    /// The run record.
    pub run: PayrollRun,
    /// One item per user in the run's user set, ordered by user id.
    pub items: Vec<PayrollItem>,
}
