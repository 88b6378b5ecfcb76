//! Period registry.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::parse_date;
use crate::error::{EngineError, EngineResult};
use crate::models::{AttendancePeriod, NewPeriod, PeriodId};
use crate::store::{self, PERIOD_NO_OVERLAP, Store, Transaction};

const OVERLAP_MESSAGE: &str = "period overlaps existing payroll period";

/// Owns attendance-period definitions.
///
/// No two periods may overlap. The overlap check and the insert run in one
/// transaction, and the store's `attendance_periods_no_overlap` constraint
/// rejects whichever of two concurrent overlapping creations commits last.
#[derive(Debug, Clone)]
pub struct PeriodRegistry {
    store: Arc<dyn Store>,
}

impl PeriodRegistry {
    /// Creates a registry over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates the period `[start, end]`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when a date is malformed or `end < start`
    /// - `Conflict` when the range overlaps an existing period
    pub async fn create_period(
        &self,
        name: Option<String>,
        start: &str,
        end: &str,
    ) -> EngineResult<AttendancePeriod> {
        let start_date = parse_date("start_date", start)?;
        let end_date = parse_date("end_date", end)?;
        if end_date < start_date {
            return Err(EngineError::invalid_input("end_date must be >= start_date"));
        }

        let draft = NewPeriod {
            name: name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            start_date,
            end_date,
        };

        let mut tx = self.store.begin().await?;
        let outcome = insert_unless_overlapping(tx.as_mut(), draft).await;
        let period = match store::finish(tx, outcome).await {
            Err(err) if err.violated_constraint() == Some(PERIOD_NO_OVERLAP) => {
                warn!(
                    start_date = %start_date,
                    end_date = %end_date,
                    "Concurrent overlapping period committed first"
                );
                return Err(EngineError::conflict(OVERLAP_MESSAGE));
            }
            other => other?,
        };

        info!(
            period_id = period.id,
            start_date = %period.start_date,
            end_date = %period.end_date,
            "Attendance period created"
        );
        Ok(period)
    }

    /// Looks up a period.
    pub async fn get_period(&self, id: PeriodId) -> EngineResult<AttendancePeriod> {
        let mut tx = self.store.begin_read().await?;
        let outcome = tx
            .find_period(id)
            .await
            .map_err(EngineError::from)
            .and_then(|found| found.ok_or_else(|| EngineError::not_found("attendance period", id)));
        store::finish(tx, outcome).await
    }

    /// All periods ordered by start date.
    pub async fn list_periods(&self) -> EngineResult<Vec<AttendancePeriod>> {
        let mut tx = self.store.begin_read().await?;
        let outcome = tx.list_periods().await.map_err(EngineError::from);
        store::finish(tx, outcome).await
    }
}

async fn insert_unless_overlapping(
    tx: &mut dyn Transaction,
    draft: NewPeriod,
) -> EngineResult<AttendancePeriod> {
    if let Some(existing) = tx
        .find_overlapping_period(draft.start_date, draft.end_date)
        .await?
    {
        warn!(
            existing_period_id = existing.id,
            start_date = %draft.start_date,
            end_date = %draft.end_date,
            "Period overlaps existing period"
        );
        return Err(EngineError::conflict(OVERLAP_MESSAGE));
    }

    Ok(tx.insert_period(draft).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Isolation;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn registry() -> PeriodRegistry {
        PeriodRegistry::new(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn test_create_and_get_period() {
        let registry = registry();
        let period = registry
            .create_period(Some(" July 2025 ".to_string()), "2025-07-01", "2025-07-31")
            .await
            .unwrap();

        assert_eq!(period.name.as_deref(), Some("July 2025"));
        assert_eq!(registry.get_period(period.id).await.unwrap(), period);
    }

    #[tokio::test]
    async fn test_blank_name_is_dropped() {
        let period = registry()
            .create_period(Some("   ".to_string()), "2025-07-01", "2025-07-31")
            .await
            .unwrap();
        assert_eq!(period.name, None);
    }

    #[tokio::test]
    async fn test_single_day_period_is_valid() {
        let period = registry()
            .create_period(None, "2025-07-04", "2025-07-04")
            .await
            .unwrap();
        assert_eq!(period.start_date, period.end_date);
    }

    #[tokio::test]
    async fn test_end_before_start_is_invalid() {
        let err = registry()
            .create_period(None, "2025-07-31", "2025-07-01")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "Invalid input: end_date must be >= start_date");
    }

    #[tokio::test]
    async fn test_malformed_dates_name_the_field() {
        let registry = registry();

        let err = registry
            .create_period(None, "2025/07/01", "2025-07-31")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid start_date format"));

        let err = registry
            .create_period(None, "2025-07-01", "31-07-2025")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid end_date format"));
    }

    #[tokio::test]
    async fn test_shared_boundary_day_conflicts() {
        let registry = registry();
        registry
            .create_period(None, "2025-07-01", "2025-07-31")
            .await
            .unwrap();

        let err = registry
            .create_period(None, "2025-07-31", "2025-08-31")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Conflict: period overlaps existing payroll period");

        registry
            .create_period(None, "2025-08-01", "2025-08-31")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_unknown_period_is_not_found() {
        let err = registry().get_period(42).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "attendance period not found: 42");
    }

    #[tokio::test]
    async fn test_list_periods_ordered_by_start() {
        let registry = registry();
        registry
            .create_period(None, "2025-09-01", "2025-09-30")
            .await
            .unwrap();
        registry
            .create_period(None, "2025-07-01", "2025-07-31")
            .await
            .unwrap();

        let starts: Vec<_> = registry
            .list_periods()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.start_date.to_string())
            .collect();
        assert_eq!(starts, vec!["2025-07-01", "2025-09-01"]);
    }

    async fn race_overlapping_creations(isolation: Isolation) {
        let registry = PeriodRegistry::new(Arc::new(MemoryStore::new(isolation)));

        let mut handles = Vec::new();
        for day in 1..=8u32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let start = format!("2025-07-{:02}", day);
                registry.create_period(None, &start, "2025-07-31").await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => {
                    assert_eq!(err.kind(), ErrorKind::Conflict);
                    assert_eq!(err.to_string(), format!("Conflict: {}", OVERLAP_MESSAGE));
                }
            }
        }
        assert_eq!(created, 1);
        assert_eq!(registry.list_periods().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_overlapping_creations_admit_one() {
        race_overlapping_creations(Isolation::Serializable).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_overlapping_creations_admit_one_under_snapshot() {
        race_overlapping_creations(Isolation::Snapshot).await;
    }

    proptest! {
        #[test]
        fn prop_creation_succeeds_iff_no_overlap(
            a_start in 0i64..60, a_len in 0i64..20,
            b_start in 0i64..60, b_len in 0i64..20,
        ) {
            let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
            let (a0, a1) = (base + Duration::days(a_start), base + Duration::days(a_start + a_len));
            let (b0, b1) = (base + Duration::days(b_start), base + Duration::days(b_start + b_len));

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let second = rt.block_on(async {
                let registry = registry();
                registry
                    .create_period(None, &a0.to_string(), &a1.to_string())
                    .await
                    .unwrap();
                registry.create_period(None, &b0.to_string(), &b1.to_string()).await
            });

            let overlaps = a0 <= b1 && a1 >= b0;
            prop_assert_eq!(second.is_ok(), !overlaps);
        }
    }
}
