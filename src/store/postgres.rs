//! PostgreSQL implementation of the [`Store`] boundary.
//!
//! Every constraint of the store contract is a real table constraint
//! (`migrations/`), so de-duplication holds across processes and restarts.
//! Writing transactions run at the configured [`Isolation`]:
//! `Serializable` is `SERIALIZABLE`, `Snapshot` is `REPEATABLE READ`.
//! Read transactions are `REPEATABLE READ, READ ONLY` and never abort on
//! concurrent writers.
//!
//! Money and hours are `NUMERIC` columns. They cross the boundary as `f64`
//! through explicit `float8` casts; sums that feed pay figures are folded
//! here in the same order the in-memory store uses.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Connection, FromRow, PgConnection, Postgres};
use tracing::{debug, info, warn};

use super::{
    ATTENDANCE_USER_DATE, OVERTIME_USER_DATE, PAYROLL_ITEM_RUN_USER, PAYROLL_RUN_PERIOD,
    PERIOD_NO_OVERLAP, Store, StoreError, StoreResult, Transaction,
};
use crate::config::{Isolation, StoreConfig};
use crate::models::{
    AttendancePeriod, AttendanceRecord, NewAttendance, NewOvertime, NewPayrollItem, NewPeriod,
    NewReimbursement, OvertimeRecord, PayBreakdown, PayrollItem, PayrollRun, PeriodId,
    ReimbursementRecord, RunId, UserId,
};

const PERIOD_COLUMNS: &str = "id, name, start_date, end_date";
const ATTENDANCE_COLUMNS: &str = "id, user_id, date";
const OVERTIME_COLUMNS: &str = "id, user_id, date, hours::float8 AS hours";
const REIMBURSEMENT_COLUMNS: &str =
    "id, user_id, date, amount::float8 AS amount, description";
const RUN_COLUMNS: &str = "id, period_id, run_at";
const ITEM_COLUMNS: &str = "id, payroll_run_id, user_id, \
    snapshot_salary::float8 AS snapshot_salary, working_days, attendance_days, \
    working_hours, attendance_hours, overtime_hours::float8 AS overtime_hours, \
    base_pay::float8 AS base_pay, overtime_pay::float8 AS overtime_pay, \
    reimbursement_total::float8 AS reimbursement_total, grand_total::float8 AS grand_total";

/// SQLSTATE codes the store distinguishes.
const UNIQUE_VIOLATION: &str = "23505";
const EXCLUSION_VIOLATION: &str = "23P01";
const READ_ONLY_TRANSACTION: &str = "25006";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

const CONSTRAINTS: [&str; 5] = [
    PERIOD_NO_OVERLAP,
    ATTENDANCE_USER_DATE,
    OVERTIME_USER_DATE,
    PAYROLL_RUN_PERIOD,
    PAYROLL_ITEM_RUN_USER,
];

/// A store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    isolation: Isolation,
}

impl PgStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool, isolation: Isolation) -> Self {
        Self { pool, isolation }
    }

    /// Opens a pool to `database_url` sized by the configuration.
    pub async fn connect(database_url: &str, config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(database_url)
            .await
            .map_err(store_error)?;
        info!(
            max_connections = config.max_connections,
            isolation = ?config.isolation,
            "Database connection pool created"
        );
        Ok(Self::new(pool, config.isolation))
    }

    /// Applies any pending migrations from `migrations/`.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable {
                message: format!("migration failed: {}", e),
            })?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Round-trips a trivial query.
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn open(&self, mode: &str) -> StoreResult<Box<dyn Transaction>> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        sqlx::query(&format!("SET TRANSACTION {}", mode))
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let mode = match self.isolation {
            Isolation::Serializable => "ISOLATION LEVEL SERIALIZABLE",
            Isolation::Snapshot => "ISOLATION LEVEL REPEATABLE READ",
        };
        self.open(mode).await
    }

    async fn begin_read(&self) -> StoreResult<Box<dyn Transaction>> {
        self.open("ISOLATION LEVEL REPEATABLE READ, READ ONLY").await
    }
}

/// Maps a driver error onto the store's error contract.
fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(mapped) = classify(db_err.code().as_deref(), db_err.constraint()) {
            return mapped;
        }
    }
    StoreError::Unavailable {
        message: err.to_string(),
    }
}

fn classify(code: Option<&str>, constraint: Option<&str>) -> Option<StoreError> {
    match code? {
        UNIQUE_VIOLATION | EXCLUSION_VIOLATION => constraint
            .and_then(known_constraint)
            .map(|constraint| StoreError::UniqueViolation { constraint }),
        SERIALIZATION_FAILURE | DEADLOCK_DETECTED => Some(StoreError::SerializationFailure),
        READ_ONLY_TRANSACTION => Some(StoreError::ReadOnly { operation: "write" }),
        _ => None,
    }
}

fn known_constraint(name: &str) -> Option<&'static str> {
    CONSTRAINTS.into_iter().find(|known| *known == name)
}

fn violation(constraint: &'static str) -> StoreError {
    StoreError::UniqueViolation { constraint }
}

fn to_db(id: u64) -> StoreResult<i64> {
    i64::try_from(id).map_err(|_| StoreError::Unavailable {
        message: format!("id out of range: {}", id),
    })
}

fn from_db(id: i64) -> StoreResult<u64> {
    u64::try_from(id).map_err(|_| StoreError::Unavailable {
        message: format!("negative id in database: {}", id),
    })
}

fn count_from_db(value: i64) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Unavailable {
        message: format!("count out of range: {}", value),
    })
}

#[derive(FromRow)]
struct PeriodRow {
    id: i64,
    name: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<PeriodRow> for AttendancePeriod {
    type Error = StoreError;

    fn try_from(row: PeriodRow) -> StoreResult<Self> {
        Ok(Self {
            id: from_db(row.id)?,
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: i64,
    user_id: i64,
    date: NaiveDate,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> StoreResult<Self> {
        Ok(Self {
            id: from_db(row.id)?,
            user_id: from_db(row.user_id)?,
            date: row.date,
        })
    }
}

#[derive(FromRow)]
struct OvertimeRow {
    id: i64,
    user_id: i64,
    date: NaiveDate,
    hours: f64,
}

impl TryFrom<OvertimeRow> for OvertimeRecord {
    type Error = StoreError;

    fn try_from(row: OvertimeRow) -> StoreResult<Self> {
        Ok(Self {
            id: from_db(row.id)?,
            user_id: from_db(row.user_id)?,
            date: row.date,
            hours: row.hours,
        })
    }
}

#[derive(FromRow)]
struct ReimbursementRow {
    id: i64,
    user_id: i64,
    date: NaiveDate,
    amount: f64,
    description: Option<String>,
}

impl TryFrom<ReimbursementRow> for ReimbursementRecord {
    type Error = StoreError;

    fn try_from(row: ReimbursementRow) -> StoreResult<Self> {
        Ok(Self {
            id: from_db(row.id)?,
            user_id: from_db(row.user_id)?,
            date: row.date,
            amount: row.amount,
            description: row.description,
        })
    }
}

#[derive(FromRow)]
struct RunRow {
    id: i64,
    period_id: i64,
    run_at: DateTime<Utc>,
}

impl TryFrom<RunRow> for PayrollRun {
    type Error = StoreError;

    fn try_from(row: RunRow) -> StoreResult<Self> {
        Ok(Self {
            id: from_db(row.id)?,
            period_id: from_db(row.period_id)?,
            run_at: row.run_at,
        })
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: i64,
    payroll_run_id: i64,
    user_id: i64,
    snapshot_salary: f64,
    working_days: i32,
    attendance_days: i32,
    working_hours: i32,
    attendance_hours: i32,
    overtime_hours: f64,
    base_pay: f64,
    overtime_pay: f64,
    reimbursement_total: f64,
    grand_total: f64,
}

impl TryFrom<ItemRow> for PayrollItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> StoreResult<Self> {
        Ok(Self {
            id: from_db(row.id)?,
            run_id: from_db(row.payroll_run_id)?,
            user_id: from_db(row.user_id)?,
            pay: PayBreakdown {
                snapshot_salary: row.snapshot_salary,
                working_days: count_from_db(row.working_days.into())?,
                attendance_days: count_from_db(row.attendance_days.into())?,
                working_hours: count_from_db(row.working_hours.into())?,
                attendance_hours: count_from_db(row.attendance_hours.into())?,
                overtime_hours: row.overtime_hours,
                base_pay: row.base_pay,
                overtime_pay: row.overtime_pay,
                reimbursement_total: row.reimbursement_total,
                grand_total: row.grand_total,
            },
        })
    }
}

fn convert<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Adds `(user_id, value)` rows per user in the order they arrive.
fn fold_per_user(rows: Vec<(i64, f64)>) -> StoreResult<BTreeMap<UserId, f64>> {
    let mut totals = BTreeMap::new();
    for (user_id, value) in rows {
        *totals.entry(from_db(user_id)?).or_insert(0.0) += value;
    }
    Ok(totals)
}

fn count_to_db(value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Unavailable {
        message: format!("count out of range: {}", value),
    })
}

async fn insert_run_rows(
    conn: &mut PgConnection,
    period_id: PeriodId,
    run_at: DateTime<Utc>,
    items: &[NewPayrollItem],
) -> StoreResult<(PayrollRun, Vec<PayrollItem>)> {
    let query = format!(
        "INSERT INTO payroll_runs (period_id, run_at) VALUES ($1, $2) \
         ON CONFLICT ON CONSTRAINT {} DO NOTHING RETURNING {}",
        PAYROLL_RUN_PERIOD, RUN_COLUMNS
    );
    let run: PayrollRun = sqlx::query_as::<_, RunRow>(&query)
        .bind(to_db(period_id)?)
        .bind(run_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(store_error)?
        .ok_or_else(|| violation(PAYROLL_RUN_PERIOD))?
        .try_into()?;

    let query = format!(
        "INSERT INTO payroll_items (payroll_run_id, user_id, snapshot_salary, working_days, \
         attendance_days, working_hours, attendance_hours, overtime_hours, base_pay, \
         overtime_pay, reimbursement_total, grand_total) \
         VALUES ($1, $2, $3::float8::numeric, $4, $5, $6, $7, $8::float8::numeric, \
         $9::float8::numeric, $10::float8::numeric, $11::float8::numeric, $12::float8::numeric) \
         ON CONFLICT ON CONSTRAINT {} DO NOTHING RETURNING {}",
        PAYROLL_ITEM_RUN_USER, ITEM_COLUMNS
    );
    let mut stored = Vec::with_capacity(items.len());
    for item in items {
        let pay = &item.pay;
        let row = sqlx::query_as::<_, ItemRow>(&query)
            .bind(to_db(run.id)?)
            .bind(to_db(item.user_id)?)
            .bind(pay.snapshot_salary)
            .bind(count_to_db(pay.working_days)?)
            .bind(count_to_db(pay.attendance_days)?)
            .bind(count_to_db(pay.working_hours)?)
            .bind(count_to_db(pay.attendance_hours)?)
            .bind(pay.overtime_hours)
            .bind(pay.base_pay)
            .bind(pay.overtime_pay)
            .bind(pay.reimbursement_total)
            .bind(pay.grand_total)
            .fetch_optional(&mut *conn)
            .await
            .map_err(store_error)?
            .ok_or_else(|| violation(PAYROLL_ITEM_RUN_USER))?;
        stored.push(PayrollItem::try_from(row)?);
    }

    Ok((run, stored))
}

/// A transaction over a [`PgStore`]. Dropping it rolls back.
struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn find_period(&mut self, id: PeriodId) -> StoreResult<Option<AttendancePeriod>> {
        let query = format!("SELECT {} FROM attendance_periods WHERE id = $1", PERIOD_COLUMNS);
        sqlx::query_as::<_, PeriodRow>(&query)
            .bind(to_db(id)?)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .map(AttendancePeriod::try_from)
            .transpose()
    }

    async fn list_periods(&mut self) -> StoreResult<Vec<AttendancePeriod>> {
        let query = format!(
            "SELECT {} FROM attendance_periods ORDER BY start_date, id",
            PERIOD_COLUMNS
        );
        let rows = sqlx::query_as::<_, PeriodRow>(&query)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;
        convert(rows)
    }

    async fn find_overlapping_period(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Option<AttendancePeriod>> {
        let query = format!(
            "SELECT {} FROM attendance_periods \
             WHERE start_date <= $2 AND end_date >= $1 ORDER BY start_date LIMIT 1",
            PERIOD_COLUMNS
        );
        sqlx::query_as::<_, PeriodRow>(&query)
            .bind(start)
            .bind(end)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .map(AttendancePeriod::try_from)
            .transpose()
    }

    async fn insert_period(&mut self, period: NewPeriod) -> StoreResult<AttendancePeriod> {
        let query = format!(
            "INSERT INTO attendance_periods (name, start_date, end_date) VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT {} DO NOTHING RETURNING {}",
            PERIOD_NO_OVERLAP, PERIOD_COLUMNS
        );
        sqlx::query_as::<_, PeriodRow>(&query)
            .bind(period.name)
            .bind(period.start_date)
            .bind(period.end_date)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .ok_or_else(|| violation(PERIOD_NO_OVERLAP))?
            .try_into()
    }

    async fn upsert_salary(&mut self, user_id: UserId, salary: f64) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO salaries (user_id, salary) VALUES ($1, $2::float8::numeric) \
             ON CONFLICT (user_id) DO UPDATE SET salary = EXCLUDED.salary, updated_at = NOW()",
        )
        .bind(to_db(user_id)?)
        .bind(salary)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn find_salary(&mut self, user_id: UserId) -> StoreResult<Option<f64>> {
        sqlx::query_scalar::<_, f64>("SELECT salary::float8 FROM salaries WHERE user_id = $1")
            .bind(to_db(user_id)?)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)
    }

    async fn salaries(&mut self) -> StoreResult<BTreeMap<UserId, f64>> {
        let rows = sqlx::query_as::<_, (i64, f64)>("SELECT user_id, salary::float8 FROM salaries")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;
        rows.into_iter()
            .map(|(user_id, salary)| Ok::<_, StoreError>((from_db(user_id)?, salary)))
            .collect()
    }

    async fn find_attendance(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let query = format!(
            "SELECT {} FROM attendances WHERE user_id = $1 AND date = $2",
            ATTENDANCE_COLUMNS
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(to_db(user_id)?)
            .bind(date)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn insert_attendance(&mut self, record: NewAttendance) -> StoreResult<AttendanceRecord> {
        let query = format!(
            "INSERT INTO attendances (user_id, date) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT {} DO NOTHING RETURNING {}",
            ATTENDANCE_USER_DATE, ATTENDANCE_COLUMNS
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(to_db(record.user_id)?)
            .bind(record.date)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .ok_or_else(|| violation(ATTENDANCE_USER_DATE))?
            .try_into()
    }

    async fn find_overtime(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<OvertimeRecord>> {
        let query = format!(
            "SELECT {} FROM overtimes WHERE user_id = $1 AND date = $2",
            OVERTIME_COLUMNS
        );
        sqlx::query_as::<_, OvertimeRow>(&query)
            .bind(to_db(user_id)?)
            .bind(date)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .map(OvertimeRecord::try_from)
            .transpose()
    }

    async fn insert_overtime(&mut self, record: NewOvertime) -> StoreResult<OvertimeRecord> {
        let query = format!(
            "INSERT INTO overtimes (user_id, date, hours) VALUES ($1, $2, $3::float8::numeric) \
             ON CONFLICT ON CONSTRAINT {} DO NOTHING RETURNING {}",
            OVERTIME_USER_DATE, OVERTIME_COLUMNS
        );
        sqlx::query_as::<_, OvertimeRow>(&query)
            .bind(to_db(record.user_id)?)
            .bind(record.date)
            .bind(record.hours)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .ok_or_else(|| violation(OVERTIME_USER_DATE))?
            .try_into()
    }

    async fn insert_reimbursement(
        &mut self,
        record: NewReimbursement,
    ) -> StoreResult<ReimbursementRecord> {
        let query = format!(
            "INSERT INTO reimbursements (user_id, date, amount, description) \
             VALUES ($1, $2, $3::float8::numeric, $4) RETURNING {}",
            REIMBURSEMENT_COLUMNS
        );
        sqlx::query_as::<_, ReimbursementRow>(&query)
            .bind(to_db(record.user_id)?)
            .bind(record.date)
            .bind(record.amount)
            .bind(record.description)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(store_error)?
            .try_into()
    }

    async fn attendance_days(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, u32>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT user_id, COUNT(*) FROM attendances \
             WHERE date BETWEEN $1 AND $2 GROUP BY user_id",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_error)?;
        rows.into_iter()
            .map(|(user_id, days)| Ok::<_, StoreError>((from_db(user_id)?, count_from_db(days)?)))
            .collect()
    }

    async fn overtime_hours(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, f64>> {
        let rows = sqlx::query_as::<_, (i64, f64)>(
            "SELECT user_id, hours::float8 FROM overtimes \
             WHERE date BETWEEN $1 AND $2 ORDER BY user_id, date",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_error)?;
        fold_per_user(rows)
    }

    async fn reimbursement_totals(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<BTreeMap<UserId, f64>> {
        let rows = sqlx::query_as::<_, (i64, f64)>(
            "SELECT user_id, amount::float8 FROM reimbursements \
             WHERE date BETWEEN $1 AND $2 ORDER BY user_id, date, id",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_error)?;
        fold_per_user(rows)
    }

    async fn reimbursements(
        &mut self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<ReimbursementRecord>> {
        let query = format!(
            "SELECT {} FROM reimbursements \
             WHERE user_id = $1 AND date BETWEEN $2 AND $3 ORDER BY date, id",
            REIMBURSEMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ReimbursementRow>(&query)
            .bind(to_db(user_id)?)
            .bind(start)
            .bind(end)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;
        convert(rows)
    }

    async fn find_run(&mut self, period_id: PeriodId) -> StoreResult<Option<PayrollRun>> {
        let query = format!("SELECT {} FROM payroll_runs WHERE period_id = $1", RUN_COLUMNS);
        sqlx::query_as::<_, RunRow>(&query)
            .bind(to_db(period_id)?)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .map(PayrollRun::try_from)
            .transpose()
    }

    async fn insert_run(
        &mut self,
        period_id: PeriodId,
        run_at: DateTime<Utc>,
        items: Vec<NewPayrollItem>,
    ) -> StoreResult<(PayrollRun, Vec<PayrollItem>)> {
        // A savepoint keeps a rejected run from leaving a partial row behind
        let mut savepoint = Connection::begin(&mut *self.tx)
            .await
            .map_err(store_error)?;
        match insert_run_rows(&mut savepoint, period_id, run_at, &items).await {
            Ok(inserted) => {
                savepoint.commit().await.map_err(store_error)?;
                Ok(inserted)
            }
            Err(err) => {
                if let Err(rollback_err) = savepoint.rollback().await {
                    warn!(error = %rollback_err, "Rollback to savepoint failed");
                }
                Err(err)
            }
        }
    }

    async fn find_item(
        &mut self,
        run_id: RunId,
        user_id: UserId,
    ) -> StoreResult<Option<PayrollItem>> {
        let query = format!(
            "SELECT {} FROM payroll_items WHERE payroll_run_id = $1 AND user_id = $2",
            ITEM_COLUMNS
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(to_db(run_id)?)
            .bind(to_db(user_id)?)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .map(PayrollItem::try_from)
            .transpose()
    }

    async fn items(&mut self, run_id: RunId) -> StoreResult<Vec<PayrollItem>> {
        let query = format!(
            "SELECT {} FROM payroll_items WHERE payroll_run_id = $1 ORDER BY user_id",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ItemRow>(&query)
            .bind(to_db(run_id)?)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;
        convert(rows)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(store_error)
    }
}
