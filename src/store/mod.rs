//! Persistence boundary.
//!
//! Every engine operation runs inside one [`Transaction`] obtained from a
//! [`Store`]. A transaction exposes the logical tables the engine needs;
//! its writes become visible to other transactions only when
//! [`Transaction::commit`] succeeds. Dropping a transaction without
//! committing discards its writes.
//!
//! Read-only work goes through [`Store::begin_read`], which never waits
//! behind writers and rejects writes.
//!
//! Constraints are the final authority for de-duplication:
//!
//! | constraint                     | rule                                 |
//! |--------------------------------|--------------------------------------|
//! | `attendance_periods_no_overlap`| no two periods share a day           |
//! | `attendances_user_date`        | unique `(user_id, date)`             |
//! | `overtimes_user_date`          | unique `(user_id, date)`             |
//! | `payroll_runs_period_id`       | unique `(period_id)`                 |
//! | `payroll_items_run_user`       | unique `(payroll_run_id, user_id)`   |

mod memory;
mod postgres;

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::warn;

use crate::error::EngineResult;
use crate::models::{
    AttendancePeriod, AttendanceRecord, NewAttendance, NewOvertime, NewPayrollItem, NewPeriod,
    NewReimbursement, OvertimeRecord, PayrollItem, PayrollRun, PeriodId, ReimbursementRecord,
    RunId, UserId,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// No two attendance periods may share a day.
pub const PERIOD_NO_OVERLAP: &str = "attendance_periods_no_overlap";
/// Unique `(user_id, date)` on attendances.
pub const ATTENDANCE_USER_DATE: &str = "attendances_user_date";
/// Unique `(user_id, date)` on overtimes.
pub const OVERTIME_USER_DATE: &str = "overtimes_user_date";
/// Unique `period_id` on payroll runs.
pub const PAYROLL_RUN_PERIOD: &str = "payroll_runs_period_id";
/// Unique `(payroll_run_id, user_id)` on payroll items.
pub const PAYROLL_ITEM_RUN_USER: &str = "payroll_items_run_user";

/// Failures reported by a [`Store`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A write collided with a uniqueness or exclusion constraint.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation {
        /// The constraint name.
        constraint: &'static str,
    },

    /// A concurrent transaction made this one impossible to serialize.
    #[error("transaction conflicted with a concurrent update")]
    SerializationFailure,

    /// A write was attempted in a read-only transaction.
    #[error("read-only transaction cannot {operation}")]
    ReadOnly {
        /// The rejected operation.
        operation: &'static str,
    },

    /// The store could not complete the operation.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// A description of the failure.
        message: String,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A transactional store.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    /// Opens a new transaction.
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;

    /// Opens a transaction that only reads.
    ///
    /// It sees one consistent committed state and fails every write with
    /// [`StoreError::ReadOnly`].
    async fn begin_read(&self) -> StoreResult<Box<dyn Transaction>> {
        self.begin().await
    }
}

/// One unit of work against a [`Store`].
///
/// Date ranges are inclusive on both ends.
#[async_trait]
pub trait Transaction: Send {
    /// Looks up a period by id.
    async fn find_period(&mut self, id: PeriodId) -> StoreResult<Option<AttendancePeriod>>;

    /// All periods ordered by start date.
    async fn list_periods(&mut self) -> StoreResult<Vec<AttendancePeriod>>;

    /// Any period whose range intersects `[start, end]`.
    async fn find_overlapping_period(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Option<AttendancePeriod>>;

    /// Inserts a period and assigns its id.
    async fn insert_period(&mut self, period: NewPeriod) -> StoreResult<AttendancePeriod>;

    /// Inserts or replaces a user's monthly salary.
    async fn upsert_salary(&mut self, user_id: UserId, salary: f64) -> StoreResult<()>;

    /// A user's monthly salary, if one is recorded.
    async fn find_salary(&mut self, user_id: UserId) -> StoreResult<Option<f64>>;

    /// Every recorded salary keyed by user.
    async fn salaries(&mut self) -> StoreResult<BTreeMap<UserId, f64>>;

    /// The attendance mark for `(user_id, date)`.
    async fn find_attendance(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Inserts an attendance mark.
    async fn insert_attendance(&mut self, record: NewAttendance) -> StoreResult<AttendanceRecord>;

    /// The overtime claim for `(user_id, date)`.
    async fn find_overtime(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<OvertimeRecord>>;

    /// Inserts an overtime claim.
    async fn insert_overtime(&mut self, record: NewOvertime) -> StoreResult<OvertimeRecord>;

    /// Inserts a reimbursement request.
    async fn insert_reimbursement(
        &mut self,
        record: NewReimbursement,
    ) -> StoreResult<ReimbursementRecord>;

    /// Attendance day counts per user within `[start, end]`.
    async fn attendance_days(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, u32>>;

    /// Overtime hour sums per user within `[start, end]`.
    async fn overtime_hours(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, f64>>;

    /// Reimbursement sums per user within `[start, end]`.
    ///
    /// Each user's amounts are added in `(date, id)` order, the same order
    /// [`Transaction::reimbursements`] lists them.
    async fn reimbursement_totals(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, f64>>;

    /// One user's reimbursements within `[start, end]`, ordered by `(date, id)`.
    async fn reimbursements(
        &mut self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<ReimbursementRecord>>;

    /// The run recorded for a period.
    async fn find_run(&mut self, period_id: PeriodId) -> StoreResult<Option<PayrollRun>>;

    /// Inserts a run and all of its items.
    async fn insert_run(
        &mut self,
        period_id: PeriodId,
        run_at: DateTime<Utc>,
        items: Vec<NewPayrollItem>,
    ) -> StoreResult<(PayrollRun, Vec<PayrollItem>)>;

    /// One user's item under a run.
    async fn find_item(
        &mut self,
        run_id: RunId,
        user_id: UserId,
    ) -> StoreResult<Option<PayrollItem>>;

    /// All items of a run ordered by user.
    async fn items(&mut self, run_id: RunId) -> StoreResult<Vec<PayrollItem>>;

    /// Makes every write of this transaction visible, or none of them.
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every write of this transaction.
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Ends a transaction according to `outcome`.
///
/// Commits when `outcome` is `Ok` and rolls back otherwise. A failed commit
/// replaces the value with the store error.
pub async fn finish<T>(tx: Box<dyn Transaction>, outcome: EngineResult<T>) -> EngineResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
