//! In-process implementation of the [`Store`] boundary.
//!
//! The committed tables are an immutable value behind one shared lock.
//! A transaction starts from a shared handle to them and copies them on its
//! first write; it records a log of writes and commit publishes them all at
//! once. How concurrent writers interact depends on the configured
//! [`Isolation`]:
//!
//! - [`Isolation::Serializable`]: a writer holds the store gate from
//!   `begin` until it ends, so writers never interleave.
//! - [`Isolation::Snapshot`]: writers run concurrently on the snapshot
//!   taken at `begin`. At commit the write log is replayed against the
//!   latest tables, so every constraint (period overlap included) still
//!   holds.
//!
//! Read transactions skip the gate in both modes. They see the tables as
//! committed at `begin`, which is a state some serial order produced.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::{
    ATTENDANCE_USER_DATE, OVERTIME_USER_DATE, PAYROLL_ITEM_RUN_USER, PAYROLL_RUN_PERIOD,
    PERIOD_NO_OVERLAP, Store, StoreError, StoreResult, Transaction,
};
use crate::config::{Isolation, StoreConfig};
use crate::models::{
    AttendancePeriod, AttendanceRecord, NewAttendance, NewOvertime, NewPayrollItem, NewPeriod,
    NewReimbursement, OvertimeRecord, PayrollItem, PayrollRun, PeriodId, RecordId,
    ReimbursementRecord, RunId, UserId,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    periods: BTreeMap<PeriodId, AttendancePeriod>,
    salaries: BTreeMap<UserId, f64>,
    attendances: BTreeMap<(UserId, NaiveDate), AttendanceRecord>,
    overtimes: BTreeMap<(UserId, NaiveDate), OvertimeRecord>,
    reimbursements: BTreeMap<RecordId, ReimbursementRecord>,
    runs: BTreeMap<PeriodId, PayrollRun>,
    items: BTreeMap<(RunId, UserId), PayrollItem>,
}

/// One staged row write.
#[derive(Debug, Clone)]
enum Write {
    Period(AttendancePeriod),
    Salary(UserId, f64),
    Attendance(AttendanceRecord),
    Overtime(OvertimeRecord),
    Reimbursement(ReimbursementRecord),
    Run(PayrollRun, Vec<PayrollItem>),
}

impl Write {
    fn operation(&self) -> &'static str {
        match self {
            Write::Period(_) => "insert period",
            Write::Salary(..) => "upsert salary",
            Write::Attendance(_) => "insert attendance",
            Write::Overtime(_) => "insert overtime",
            Write::Reimbursement(_) => "insert reimbursement",
            Write::Run(..) => "insert payroll run",
        }
    }
}

impl Tables {
    /// Applies a write, leaving the tables untouched when a constraint fails.
    fn apply(&mut self, write: &Write) -> StoreResult<()> {
        match write {
            Write::Period(period) => {
                if self
                    .periods
                    .values()
                    .any(|p| p.overlaps(period.start_date, period.end_date))
                {
                    return Err(violation(PERIOD_NO_OVERLAP));
                }
                self.periods.insert(period.id, period.clone());
            }
            Write::Salary(user_id, salary) => {
                self.salaries.insert(*user_id, *salary);
            }
            Write::Attendance(record) => {
                let key = (record.user_id, record.date);
                if self.attendances.contains_key(&key) {
                    return Err(violation(ATTENDANCE_USER_DATE));
                }
                self.attendances.insert(key, record.clone());
            }
            Write::Overtime(record) => {
                let key = (record.user_id, record.date);
                if self.overtimes.contains_key(&key) {
                    return Err(violation(OVERTIME_USER_DATE));
                }
                self.overtimes.insert(key, record.clone());
            }
            Write::Reimbursement(record) => {
                self.reimbursements.insert(record.id, record.clone());
            }
            Write::Run(run, items) => {
                if self.runs.contains_key(&run.period_id) {
                    return Err(violation(PAYROLL_RUN_PERIOD));
                }
                let mut users = BTreeSet::new();
                for item in items {
                    if !users.insert(item.user_id)
                        || self.items.contains_key(&(run.id, item.user_id))
                    {
                        return Err(violation(PAYROLL_ITEM_RUN_USER));
                    }
                }

                self.runs.insert(run.period_id, run.clone());
                for item in items {
                    self.items.insert((run.id, item.user_id), item.clone());
                }
            }
        }
        Ok(())
    }

    fn reimbursements_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<&ReimbursementRecord> {
        let mut rows: Vec<_> = self
            .reimbursements
            .values()
            .filter(|r| r.date >= start && r.date <= end)
            .collect();
        rows.sort_by_key(|r| (r.date, r.id));
        rows
    }
}

fn violation(constraint: &'static str) -> StoreError {
    StoreError::UniqueViolation { constraint }
}

/// Id sequences. Like database sequences they are not transactional: an id
/// handed to a transaction that later rolls back is never reused.
#[derive(Debug, Default)]
struct Sequences {
    periods: AtomicU64,
    attendances: AtomicU64,
    overtimes: AtomicU64,
    reimbursements: AtomicU64,
    runs: AtomicU64,
    items: AtomicU64,
}

fn next_id(seq: &AtomicU64) -> u64 {
    seq.fetch_add(1, Ordering::Relaxed) + 1
}

#[derive(Debug)]
struct Shared {
    isolation: Isolation,
    tables: Mutex<Arc<Tables>>,
    gate: Arc<tokio::sync::Mutex<()>>,
    sequences: Sequences,
    commit_fault: Mutex<Option<StoreError>>,
}

impl Shared {
    fn snapshot(&self) -> StoreResult<Arc<Tables>> {
        let tables = self.tables.lock().map_err(|_| poisoned())?;
        Ok(Arc::clone(&tables))
    }

    /// Publishes a transaction's writes.
    ///
    /// Under the gate nobody else can have committed since `begin`, so the
    /// transaction's working copy already is the next state. Otherwise the
    /// log is replayed on top of the latest tables.
    fn publish(&self, view: Arc<Tables>, log: &[Write], gated: bool) -> StoreResult<()> {
        let mut tables = self.tables.lock().map_err(|_| poisoned())?;
        if gated {
            *tables = view;
            return Ok(());
        }

        let mut next = (**tables).clone();
        for write in log {
            next.apply(write)?;
        }
        *tables = Arc::new(next);
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable {
        message: "table lock poisoned".to_string(),
    }
}

/// A transactional store held entirely in process memory.
///
/// Cloning is cheap; clones share the same tables.
///
/// # Example
///
/// ```
/// use payslip_engine::config::Isolation;
/// use payslip_engine::store::{MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new(Isolation::Serializable);
///
/// let mut tx = store.begin().await.unwrap();
/// tx.upsert_salary(7, 5_000_000.0).await.unwrap();
/// tx.commit().await.unwrap();
///
/// let mut tx = store.begin().await.unwrap();
/// assert_eq!(tx.find_salary(7).await.unwrap(), Some(5_000_000.0));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store with the given isolation.
    pub fn new(isolation: Isolation) -> Self {
        Self {
            shared: Arc::new(Shared {
                isolation,
                tables: Mutex::new(Arc::default()),
                gate: Arc::new(tokio::sync::Mutex::new(())),
                sequences: Sequences::default(),
                commit_fault: Mutex::new(None),
            }),
        }
    }

    /// Creates an empty store as described by the configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.isolation)
    }

    /// Makes every subsequent commit that carries writes fail with
    /// [`StoreError::Unavailable`] until switched off again.
    pub fn set_commit_failure(&self, fail: bool) {
        self.fail_commits_with(fail.then(|| StoreError::Unavailable {
            message: "commit rejected".to_string(),
        }));
    }

    /// Makes every subsequent commit that carries writes fail with `error`,
    /// or lets commits through again when `None`.
    pub fn fail_commits_with(&self, error: Option<StoreError>) {
        match self.shared.commit_fault.lock() {
            Ok(mut fault) => *fault = error,
            Err(poisoned) => *poisoned.into_inner() = error,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Isolation::default())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let gate = match self.shared.isolation {
            Isolation::Serializable => Some(self.shared.gate.clone().lock_owned().await),
            Isolation::Snapshot => None,
        };
        let view = self.shared.snapshot()?;

        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            view,
            log: Vec::new(),
            mode: Mode::Write { gate },
        }))
    }

    async fn begin_read(&self) -> StoreResult<Box<dyn Transaction>> {
        let view = self.shared.snapshot()?;

        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            view,
            log: Vec::new(),
            mode: Mode::Read,
        }))
    }
}

enum Mode {
    Read,
    Write { gate: Option<OwnedMutexGuard<()>> },
}

/// A transaction over a [`MemoryStore`].
struct MemoryTransaction {
    shared: Arc<Shared>,
    view: Arc<Tables>,
    log: Vec<Write>,
    mode: Mode,
}

impl MemoryTransaction {
    fn stage(&mut self, write: Write) -> StoreResult<()> {
        if let Mode::Read = self.mode {
            return Err(StoreError::ReadOnly {
                operation: write.operation(),
            });
        }
        Arc::make_mut(&mut self.view).apply(&write)?;
        self.log.push(write);
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn find_period(&mut self, id: PeriodId) -> StoreResult<Option<AttendancePeriod>> {
        Ok(self.view.periods.get(&id).cloned())
    }

    async fn list_periods(&mut self) -> StoreResult<Vec<AttendancePeriod>> {
        let mut periods: Vec<_> = self.view.periods.values().cloned().collect();
        periods.sort_by_key(|p| (p.start_date, p.id));
        Ok(periods)
    }

    async fn find_overlapping_period(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Option<AttendancePeriod>> {
        Ok(self
            .view
            .periods
            .values()
            .find(|p| p.overlaps(start, end))
            .cloned())
    }

    async fn insert_period(&mut self, period: NewPeriod) -> StoreResult<AttendancePeriod> {
        let period = AttendancePeriod {
            id: next_id(&self.shared.sequences.periods),
            name: period.name,
            start_date: period.start_date,
            end_date: period.end_date,
        };
        self.stage(Write::Period(period.clone()))?;
        Ok(period)
    }

    async fn upsert_salary(&mut self, user_id: UserId, salary: f64) -> StoreResult<()> {
        self.stage(Write::Salary(user_id, salary))
    }

    async fn find_salary(&mut self, user_id: UserId) -> StoreResult<Option<f64>> {
        Ok(self.view.salaries.get(&user_id).copied())
    }

    async fn salaries(&mut self) -> StoreResult<BTreeMap<UserId, f64>> {
        Ok(self.view.salaries.clone())
    }

    async fn find_attendance(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.view.attendances.get(&(user_id, date)).cloned())
    }

    async fn insert_attendance(&mut self, record: NewAttendance) -> StoreResult<AttendanceRecord> {
        let record = AttendanceRecord {
            id: next_id(&self.shared.sequences.attendances),
            user_id: record.user_id,
            date: record.date,
        };
        self.stage(Write::Attendance(record.clone()))?;
        Ok(record)
    }

    async fn find_overtime(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<OvertimeRecord>> {
        Ok(self.view.overtimes.get(&(user_id, date)).cloned())
    }

    async fn insert_overtime(&mut self, record: NewOvertime) -> StoreResult<OvertimeRecord> {
        let record = OvertimeRecord {
            id: next_id(&self.shared.sequences.overtimes),
            user_id: record.user_id,
            date: record.date,
            hours: record.hours,
        };
        self.stage(Write::Overtime(record.clone()))?;
        Ok(record)
    }

    async fn insert_reimbursement(
        &mut self,
        record: NewReimbursement,
    ) -> StoreResult<ReimbursementRecord> {
        let record = ReimbursementRecord {
            id: next_id(&self.shared.sequences.reimbursements),
            user_id: record.user_id,
            date: record.date,
            amount: record.amount,
            description: record.description,
        };
        self.stage(Write::Reimbursement(record.clone()))?;
        Ok(record)
    }

    async fn attendance_days(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, u32>> {
        let mut days = BTreeMap::new();
        for record in self
            .view
            .attendances
            .values()
            .filter(|r| r.date >= start && r.date <= end)
        {
            *days.entry(record.user_id).or_insert(0) += 1;
        }
        Ok(days)
    }

    async fn overtime_hours(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, f64>> {
        let mut hours = BTreeMap::new();
        for record in self
            .view
            .overtimes
            .values()
            .filter(|r| r.date >= start && r.date <= end)
        {
            *hours.entry(record.user_id).or_insert(0.0) += record.hours;
        }
        Ok(hours)
    }

    async fn reimbursement_totals(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, f64>> {
        let mut totals = BTreeMap::new();
        for record in self.view.reimbursements_between(start, end) {
            *totals.entry(record.user_id).or_insert(0.0) += record.amount;
        }
        Ok(totals)
    }

    async fn reimbursements(
        &mut self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<ReimbursementRecord>> {
        Ok(self
            .view
            .reimbursements_between(start, end)
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_run(&mut self, period_id: PeriodId) -> StoreResult<Option<PayrollRun>> {
        Ok(self.view.runs.get(&period_id).cloned())
    }

    async fn insert_run(
        &mut self,
        period_id: PeriodId,
        run_at: DateTime<Utc>,
        items: Vec<NewPayrollItem>,
    ) -> StoreResult<(PayrollRun, Vec<PayrollItem>)> {
        let run = PayrollRun {
            id: next_id(&self.shared.sequences.runs),
            period_id,
            run_at,
        };
        let items: Vec<PayrollItem> = items
            .into_iter()
            .map(|item| PayrollItem {
                id: next_id(&self.shared.sequences.items),
                run_id: run.id,
                user_id: item.user_id,
                pay: item.pay,
            })
            .collect();

        self.stage(Write::Run(run.clone(), items.clone()))?;
        Ok((run, items))
    }

    async fn find_item(
        &mut self,
        run_id: RunId,
        user_id: UserId,
    ) -> StoreResult<Option<PayrollItem>> {
        Ok(self.view.items.get(&(run_id, user_id)).cloned())
    }

    async fn items(&mut self, run_id: RunId) -> StoreResult<Vec<PayrollItem>> {
        Ok(self
            .view
            .items
            .range((run_id, UserId::MIN)..=(run_id, UserId::MAX))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction {
            shared,
            view,
            log,
            mode,
        } = *self;

        if log.is_empty() {
            return Ok(());
        }
        let fault = shared.commit_fault.lock().map_err(|_| poisoned())?.clone();
        if let Some(err) = fault {
            return Err(err);
        }

        let gated = matches!(mode, Mode::Write { gate: Some(_) });
        shared.publish(view, &log, gated)?;
        debug!(writes = log.len(), "Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        if !self.log.is_empty() {
            debug!(writes = self.log.len(), "Transaction rolled back");
        }
        Ok(())
    }
}
