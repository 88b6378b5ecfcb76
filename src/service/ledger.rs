//! Activity ledger.
//!
//! Attendance and overtime share one idempotent-insert contract keyed by
//! `(user, date)`: the first submission inserts, every later one returns
//! the stored row flagged `already_exists`. The store's unique constraint
//! is what actually guarantees a single row; the lookup only avoids the
//! insert in the common case. A submission that loses a race to a
//! concurrent duplicate reports the winner's row instead of failing.
//!
//! Reimbursements have no such key and always insert.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::two_decimals;
use crate::calculation::is_weekend;
use crate::clock::CivilCalendar;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceRecord, NewAttendance, NewOvertime, NewReimbursement, OvertimeRecord,
    ReimbursementRecord, UserId,
};
use crate::store::{
    self, ATTENDANCE_USER_DATE, OVERTIME_USER_DATE, Store, StoreError, StoreResult, Transaction,
};

/// Largest overtime claim for one day, in hours.
pub const MAX_OVERTIME_HOURS: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

/// The outcome of an idempotent submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission<T> {
    /// The stored row.
    pub record: T,
    /// `true` when the row existed before this submission.
    pub already_exists: bool,
}

impl<T> Submission<T> {
    fn created(record: T) -> Self {
        Self {
            record,
            already_exists: false,
        }
    }

    fn existing(record: T) -> Self {
        Self {
            record,
            already_exists: true,
        }
    }
}

/// A ledger row unique per `(user, date)`.
#[async_trait]
trait DailyEntry: Sized + Send {
    type Draft: Copy + Send;

    /// The unique constraint guarding the table.
    const CONSTRAINT: &'static str;

    fn key(draft: &Self::Draft) -> (UserId, NaiveDate);

    async fn find(
        tx: &mut dyn Transaction,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<Self>>;

    async fn insert(tx: &mut dyn Transaction, draft: Self::Draft) -> StoreResult<Self>;
}

#[async_trait]
impl DailyEntry for AttendanceRecord {
    type Draft = NewAttendance;

    const CONSTRAINT: &'static str = ATTENDANCE_USER_DATE;

    fn key(draft: &NewAttendance) -> (UserId, NaiveDate) {
        (draft.user_id, draft.date)
    }

    async fn find(
        tx: &mut dyn Transaction,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<Self>> {
        tx.find_attendance(user_id, date).await
    }

    async fn insert(tx: &mut dyn Transaction, draft: NewAttendance) -> StoreResult<Self> {
        tx.insert_attendance(draft).await
    }
}

#[async_trait]
impl DailyEntry for OvertimeRecord {
    type Draft = NewOvertime;

    const CONSTRAINT: &'static str = OVERTIME_USER_DATE;

    fn key(draft: &NewOvertime) -> (UserId, NaiveDate) {
        (draft.user_id, draft.date)
    }

    async fn find(
        tx: &mut dyn Transaction,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<Self>> {
        tx.find_overtime(user_id, date).await
    }

    async fn insert(tx: &mut dyn Transaction, draft: NewOvertime) -> StoreResult<Self> {
        tx.insert_overtime(draft).await
    }
}

/// Records attendance, overtime and reimbursements.
#[derive(Debug, Clone)]
pub struct ActivityLedger {
    store: Arc<dyn Store>,
    calendar: CivilCalendar,
}

impl ActivityLedger {
    /// Creates a ledger over `store`, resolving dates in `calendar`.
    pub fn new(store: Arc<dyn Store>, calendar: CivilCalendar) -> Self {
        Self { store, calendar }
    }

    /// Marks `user_id` present on `date` (today when absent).
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed date or a Saturday/Sunday.
    pub async fn submit_attendance(
        &self,
        user_id: UserId,
        date: Option<&str>,
    ) -> EngineResult<Submission<AttendanceRecord>> {
        let date = self.calendar.resolve_date("date", date)?;
        if is_weekend(date) {
            return Err(EngineError::invalid_input(
                "cannot submit attendance on weekend",
            ));
        }

        let submission = self
            .submit_once::<AttendanceRecord>(NewAttendance { user_id, date })
            .await?;
        info!(
            user_id,
            date = %date,
            record_id = submission.record.id,
            already_exists = submission.already_exists,
            "Attendance submitted"
        );
        Ok(submission)
    }

    /// Claims `hours` of overtime for `user_id` on `date` (today when absent).
    ///
    /// Weekends are allowed. Same-day claims open at the overtime cutoff.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when hours are outside `(0, 3]` or finer than cents,
    /// the date is malformed, or the claim is for today before the cutoff.
    pub async fn submit_overtime(
        &self,
        user_id: UserId,
        date: Option<&str>,
        hours: Decimal,
    ) -> EngineResult<Submission<OvertimeRecord>> {
        if hours <= Decimal::ZERO || hours > MAX_OVERTIME_HOURS {
            return Err(EngineError::invalid_input("hours must be > 0 and <= 3"));
        }
        let hours = two_decimals("hours", hours)?;

        let date = self.calendar.resolve_date("date", date)?;
        if !self.calendar.overtime_window_open(date) {
            return Err(EngineError::invalid_input(format!(
                "overtime can only be submitted after {} WIB",
                self.calendar.overtime_cutoff().format("%H:%M")
            )));
        }

        let submission = self
            .submit_once::<OvertimeRecord>(NewOvertime {
                user_id,
                date,
                hours,
            })
            .await?;
        info!(
            user_id,
            date = %date,
            record_id = submission.record.id,
            already_exists = submission.already_exists,
            "Overtime submitted"
        );
        Ok(submission)
    }

    /// Files a reimbursement for `user_id` on `date` (today when absent).
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the amount is not positive or finer than cents,
    /// or the date is malformed.
    pub async fn create_reimbursement(
        &self,
        user_id: UserId,
        date: Option<&str>,
        amount: Decimal,
        description: Option<String>,
    ) -> EngineResult<ReimbursementRecord> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::invalid_input("amount must be > 0"));
        }
        let amount = two_decimals("amount", amount)?;
        let date = self.calendar.resolve_date("date", date)?;

        let draft = NewReimbursement {
            user_id,
            date,
            amount,
            description: description.filter(|d| !d.trim().is_empty()),
        };

        let mut tx = self.store.begin().await?;
        let outcome = tx
            .insert_reimbursement(draft)
            .await
            .map_err(EngineError::from);
        let record = store::finish(tx, outcome).await?;

        info!(
            user_id,
            date = %date,
            record_id = record.id,
            "Reimbursement created"
        );
        Ok(record)
    }

    async fn submit_once<E: DailyEntry>(&self, draft: E::Draft) -> EngineResult<Submission<E>> {
        let (user_id, date) = E::key(&draft);

        let mut tx = self.store.begin().await?;
        let outcome = lookup_or_insert::<E>(tx.as_mut(), draft).await;
        match store::finish(tx, outcome).await {
            // A concurrent duplicate committed first
            Err(err) if err.violated_constraint() == Some(E::CONSTRAINT) => {
                debug!(user_id, date = %date, "Duplicate submission resolved at commit");
                self.read_existing::<E>(user_id, date).await
            }
            // A serializable store may report the same race this way
            Err(err) if err.is_serialization_failure() => {
                debug!(user_id, date = %date, "Submission lost a serialization race");
                match self.read_existing::<E>(user_id, date).await {
                    Err(_) => Err(err),
                    found => found,
                }
            }
            other => other,
        }
    }

    async fn read_existing<E: DailyEntry>(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> EngineResult<Submission<E>> {
        let mut tx = self.store.begin_read().await?;
        let outcome = E::find(tx.as_mut(), user_id, date)
            .await
            .map_err(EngineError::from)
            .and_then(|found| found.ok_or_else(|| vanished(E::CONSTRAINT)));
        let record = store::finish(tx, outcome).await?;
        Ok(Submission::existing(record))
    }
}

async fn lookup_or_insert<E: DailyEntry>(
    tx: &mut dyn Transaction,
    draft: E::Draft,
) -> EngineResult<Submission<E>> {
    let (user_id, date) = E::key(&draft);

    if let Some(record) = E::find(tx, user_id, date).await? {
        return Ok(Submission::existing(record));
    }

    match E::insert(tx, draft).await {
        Ok(record) => Ok(Submission::created(record)),
        Err(StoreError::UniqueViolation { constraint }) if constraint == E::CONSTRAINT => {
            warn!(user_id, date = %date, constraint, "Insert raced a duplicate");
            let record = E::find(tx, user_id, date)
                .await?
                .ok_or_else(|| vanished(E::CONSTRAINT))?;
            Ok(Submission::existing(record))
        }
        Err(err) => Err(err.into()),
    }
}

fn vanished(constraint: &str) -> EngineError {
    EngineError::Internal {
        message: format!("row guarded by {} is missing after a conflict", constraint),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::Isolation;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use chrono::{FixedOffset, NaiveTime};
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    /// A ledger whose clock reads `h:m` UTC+7 on Wednesday 2025-08-06.
    fn ledger_at(store: MemoryStore, h: u32, m: u32) -> ActivityLedger {
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let clock = FixedClock::at_civil(
            date(2025, 8, 6),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            wib,
        );
        let calendar = CivilCalendar::new(
            Arc::new(clock),
            wib,
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        );
        ActivityLedger::new(Arc::new(store), calendar)
    }

    fn ledger() -> ActivityLedger {
        ledger_at(MemoryStore::default(), 9, 0)
    }

    #[tokio::test]
    async fn test_attendance_defaults_to_today() {
        let submission = ledger().submit_attendance(1, None).await.unwrap();
        assert_eq!(submission.record.date, date(2025, 8, 6));
        assert!(!submission.already_exists);
    }

    #[tokio::test]
    async fn test_second_attendance_returns_same_row() {
        let ledger = ledger();
        let first = ledger.submit_attendance(1, Some("2025-08-04")).await.unwrap();
        let second = ledger.submit_attendance(1, Some("2025-08-04")).await.unwrap();

        assert!(!first.already_exists);
        assert!(second.already_exists);
        assert_eq!(first.record, second.record);
    }

    #[tokio::test]
    async fn test_attendance_on_weekend_is_rejected() {
        let ledger = ledger();
        for day in ["2025-08-02", "2025-08-03"] {
            let err = ledger.submit_attendance(1, Some(day)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert_eq!(
                err.to_string(),
                "Invalid input: cannot submit attendance on weekend"
            );
        }
    }

    #[tokio::test]
    async fn test_attendance_with_malformed_date_is_rejected() {
        let err = ledger()
            .submit_attendance(1, Some("2025-8-4x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_overtime_hours_bounds() {
        let ledger = ledger();

        for hours in ["0", "3.01", "-1"] {
            let err = ledger
                .submit_overtime(1, Some("2025-08-01"), dec(hours))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "hours = {}", hours);
        }

        let ok = ledger
            .submit_overtime(1, Some("2025-08-01"), dec("3.00"))
            .await
            .unwrap();
        assert_eq!(ok.record.hours, 3.0);
    }

    #[tokio::test]
    async fn test_overtime_rejects_sub_cent_hours() {
        let err = ledger()
            .submit_overtime(1, Some("2025-08-01"), dec("1.234"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_same_day_overtime_before_cutoff_is_rejected() {
        let ledger = ledger_at(MemoryStore::default(), 16, 59);
        let err = ledger.submit_overtime(1, None, dec("2")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: overtime can only be submitted after 17:00 WIB"
        );
    }

    #[tokio::test]
    async fn test_same_day_overtime_at_cutoff_is_accepted() {
        let ledger = ledger_at(MemoryStore::default(), 17, 0);
        let ok = ledger
            .submit_overtime(1, Some("2025-08-06"), dec("2"))
            .await
            .unwrap();
        assert_eq!(ok.record.date, date(2025, 8, 6));
    }

    #[tokio::test]
    async fn test_past_overtime_ignores_time_of_day() {
        let ledger = ledger_at(MemoryStore::default(), 8, 0);
        ledger
            .submit_overtime(1, Some("2025-08-05"), dec("1.5"))
            .await
            .unwrap();
        // Weekends are fine for overtime
        ledger
            .submit_overtime(1, Some("2025-08-02"), dec("1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_overtime_is_idempotent_and_keeps_first_hours() {
        let ledger = ledger();
        let first = ledger
            .submit_overtime(1, Some("2025-08-01"), dec("2"))
            .await
            .unwrap();
        let second = ledger
            .submit_overtime(1, Some("2025-08-01"), dec("1"))
            .await
            .unwrap();

        assert!(second.already_exists);
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(second.record.hours, 2.0);
    }

    #[tokio::test]
    async fn test_attendance_and_overtime_do_not_collide() {
        let ledger = ledger();
        let attendance = ledger.submit_attendance(1, Some("2025-08-01")).await.unwrap();
        let overtime = ledger
            .submit_overtime(1, Some("2025-08-01"), dec("1"))
            .await
            .unwrap();
        assert!(!attendance.already_exists);
        assert!(!overtime.already_exists);
    }

    #[tokio::test]
    async fn test_reimbursement_validation() {
        let ledger = ledger();
        for amount in ["0", "-5"] {
            let err = ledger
                .create_reimbursement(1, None, dec(amount), None)
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Invalid input: amount must be > 0");
        }
    }

    #[tokio::test]
    async fn test_reimbursements_always_insert() {
        let ledger = ledger();
        let first = ledger
            .create_reimbursement(1, Some("2025-08-01"), dec("50000"), Some("taxi".into()))
            .await
            .unwrap();
        let second = ledger
            .create_reimbursement(1, Some("2025-08-01"), dec("50000"), Some("taxi".into()))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.amount, 50_000.0);
        assert_eq!(first.description.as_deref(), Some("taxi"));
    }

    async fn race_duplicate_attendance(isolation: Isolation) {
        let store = MemoryStore::new(isolation);
        let ledger = ledger_at(store.clone(), 9, 0);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.submit_attendance(7, Some("2025-08-04")).await
            }));
        }

        let mut ids = Vec::new();
        let mut created = 0;
        for handle in handles {
            let submission = handle.await.unwrap().unwrap();
            if !submission.already_exists {
                created += 1;
            }
            ids.push(submission.record.id);
        }

        assert_eq!(created, 1);
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let mut tx = store.begin().await.unwrap();
        let days = tx
            .attendance_days(date(2025, 8, 1), date(2025, 8, 31))
            .await
            .unwrap();
        assert_eq!(days.get(&7), Some(&1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_store_one_row_serializable() {
        race_duplicate_attendance(Isolation::Serializable).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_store_one_row_snapshot() {
        race_duplicate_attendance(Isolation::Snapshot).await;
    }

    #[tokio::test]
    async fn test_serialization_failure_without_winner_is_reported() {
        let store = MemoryStore::default();
        let ledger = ledger_at(store.clone(), 9, 0);
        store.fail_commits_with(Some(StoreError::SerializationFailure));

        let err = ledger
            .submit_attendance(7, Some("2025-08-04"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_serialization_failure());

        store.fail_commits_with(None);
        let retried = ledger.submit_attendance(7, Some("2025-08-04")).await.unwrap();
        assert!(!retried.already_exists);
    }

    #[tokio::test]
    async fn test_resubmission_succeeds_while_commits_fail() {
        let store = MemoryStore::default();
        let ledger = ledger_at(store.clone(), 9, 0);
        let first = ledger.submit_attendance(7, Some("2025-08-04")).await.unwrap();

        store.fail_commits_with(Some(StoreError::SerializationFailure));
        let again = ledger.submit_attendance(7, Some("2025-08-04")).await.unwrap();
        assert!(again.already_exists);
        assert_eq!(again.record, first.record);
    }
}
