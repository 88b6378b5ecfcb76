//! Shared test data for the service tests.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveTime};

use crate::calculation::is_weekend;
use crate::clock::{Clock, FixedClock};
use crate::models::{
    AttendancePeriod, NewAttendance, NewOvertime, NewPeriod, NewReimbursement, UserId,
};
use crate::store::{MemoryStore, Store};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2025-08-01 09:00 UTC+7.
pub(crate) fn clock() -> Arc<dyn Clock> {
    let wib = FixedOffset::east_opt(7 * 3600).unwrap();
    Arc::new(FixedClock::at_civil(
        date(2025, 8, 1),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        wib,
    ))
}

/// Inserts the period `[start, end]` directly through the store.
pub(crate) async fn create_period(
    store: &MemoryStore,
    start: NaiveDate,
    end: NaiveDate,
) -> AttendancePeriod {
    let mut tx = store.begin().await.unwrap();
    let period = tx
        .insert_period(NewPeriod {
            name: None,
            start_date: start,
            end_date: end,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    period
}

/// July 2025: 23 weekdays, 184 working hours.
pub(crate) async fn create_july(store: &MemoryStore) -> AttendancePeriod {
    create_period(store, date(2025, 7, 1), date(2025, 7, 31)).await
}

/// Salary 7,000,000, 20 attended days, 5 overtime hours and 100,000 in
/// reimbursements, all within July 2025.
pub(crate) async fn seed_reference_user(store: &MemoryStore, user_id: UserId) {
    let mut tx = store.begin().await.unwrap();
    tx.upsert_salary(user_id, 7_000_000.0).await.unwrap();

    let weekdays = date(2025, 7, 1)
        .iter_days()
        .filter(|d| !is_weekend(*d))
        .take(20);
    for day in weekdays {
        tx.insert_attendance(NewAttendance { user_id, date: day })
            .await
            .unwrap();
    }

    for (day, hours) in [(1, 3.0), (2, 2.0)] {
        tx.insert_overtime(NewOvertime {
            user_id,
            date: date(2025, 7, day),
            hours,
        })
        .await
        .unwrap();
    }

    for (day, amount) in [(10, 60_000.0), (3, 40_000.0)] {
        tx.insert_reimbursement(NewReimbursement {
            user_id,
            date: date(2025, 7, day),
            amount,
            description: Some("client visit".to_string()),
        })
        .await
        .unwrap();
    }

    tx.commit().await.unwrap();
}

/// Adds one reimbursement for `user_id`.
pub(crate) async fn add_reimbursement(
    store: &MemoryStore,
    user_id: UserId,
    date: NaiveDate,
    amount: f64,
) {
    let mut tx = store.begin().await.unwrap();
    tx.insert_reimbursement(NewReimbursement {
        user_id,
        date,
        amount,
        description: None,
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();
}
