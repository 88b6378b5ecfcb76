//! Payroll engine.
//!
//! A period moves from unrun to run exactly once. The run reads every
//! ledger aggregate and salary in one transaction, computes one item per
//! user, and persists the run with its items in the same transaction.
//! The unique constraint on the run's period backs the "already run"
//! check, so a concurrent second run fails instead of creating a twin.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::calculation::{PayInputs, WorkSchedule, compute_pay};
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::models::{NewPayrollItem, PayrollRunSummary, PeriodId, UserId};
use crate::store::{self, PAYROLL_RUN_PERIOD, Store, Transaction};

/// Per-user aggregates over one period window.
#[derive(Debug, Clone, Default)]
struct PeriodActivity {
    salaries: BTreeMap<UserId, f64>,
    attendance_days: BTreeMap<UserId, u32>,
    overtime_hours: BTreeMap<UserId, f64>,
    reimbursement_totals: BTreeMap<UserId, f64>,
}

impl PeriodActivity {
    /// Every user present in any source.
    fn users(&self) -> BTreeSet<UserId> {
        self.salaries
            .keys()
            .chain(self.attendance_days.keys())
            .chain(self.overtime_hours.keys())
            .chain(self.reimbursement_totals.keys())
            .copied()
            .collect()
    }

    /// The formula inputs for one user; absent sources count as zero.
    fn inputs_for(&self, user_id: UserId) -> PayInputs {
        PayInputs {
            salary: self.salaries.get(&user_id).copied().unwrap_or(0.0),
            attendance_days: self.attendance_days.get(&user_id).copied().unwrap_or(0),
            overtime_hours: self.overtime_hours.get(&user_id).copied().unwrap_or(0.0),
            reimbursement_total: self
                .reimbursement_totals
                .get(&user_id)
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// One item per user, ordered by user id.
    fn items(&self, schedule: WorkSchedule) -> Vec<NewPayrollItem> {
        self.users()
            .into_iter()
            .map(|user_id| NewPayrollItem {
                user_id,
                pay: compute_pay(schedule, self.inputs_for(user_id)),
            })
            .collect()
    }
}

/// Computes and freezes payroll, once per period.
#[derive(Debug, Clone)]
pub struct PayrollEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl PayrollEngine {
    /// Creates an engine over `store`, stamping runs with `clock`.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Runs payroll for a period.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when the period does not exist, was already run, or
    ///   has no working days
    /// - `Conflict` when a concurrent run for the same period committed first
    /// - `InternalFailure` when persisting the run fails; nothing is stored
    pub async fn run_payroll(&self, period_id: PeriodId) -> EngineResult<PayrollRunSummary> {
        let started = Instant::now();

        let mut tx = self.store.begin().await?;
        let outcome = self.run_in(tx.as_mut(), period_id).await;
        let summary = match store::finish(tx, outcome).await {
            Err(err) if err.violated_constraint() == Some(PAYROLL_RUN_PERIOD) => {
                warn!(period_id, "Concurrent payroll run for period");
                return Err(EngineError::conflict(
                    "payroll run already exists for this period",
                ));
            }
            other => other?,
        };

        let grand_total: f64 = summary.items.iter().map(|i| i.pay.grand_total).sum();
        info!(
            period_id,
            run_id = summary.run.id,
            items = summary.items.len(),
            grand_total,
            duration_us = started.elapsed().as_micros() as u64,
            "Payroll run completed"
        );
        Ok(summary)
    }

    /// The run recorded for a period, with its items.
    ///
    /// # Errors
    ///
    /// `NotFound` when payroll has not been run for the period.
    pub async fn get_run(&self, period_id: PeriodId) -> EngineResult<PayrollRunSummary> {
        let mut tx = self.store.begin_read().await?;
        let outcome = load_run(tx.as_mut(), period_id).await;
        store::finish(tx, outcome).await
    }

    async fn run_in(
        &self,
        tx: &mut dyn Transaction,
        period_id: PeriodId,
    ) -> EngineResult<PayrollRunSummary> {
        let period = tx
            .find_period(period_id)
            .await?
            .ok_or_else(|| EngineError::invalid_input("attendance period not found"))?;

        if tx.find_run(period_id).await?.is_some() {
            return Err(EngineError::invalid_input(
                "payroll has already been run for this period",
            ));
        }

        let schedule = WorkSchedule::for_range(period.start_date, period.end_date)?;
        let (start, end) = (period.start_date, period.end_date);
        let activity = PeriodActivity {
            salaries: tx.salaries().await?,
            attendance_days: tx.attendance_days(start, end).await?,
            overtime_hours: tx.overtime_hours(start, end).await?,
            reimbursement_totals: tx.reimbursement_totals(start, end).await?,
        };

        let items = activity.items(schedule);
        let (run, items) = tx
            .insert_run(period_id, self.clock.now_utc(), items)
            .await?;
        Ok(PayrollRunSummary { run, items })
    }
}

async fn load_run(
    tx: &mut dyn Transaction,
    period_id: PeriodId,
) -> EngineResult<PayrollRunSummary> {
    let run = tx
        .find_run(period_id)
        .await?
        .ok_or_else(|| EngineError::not_found("payroll run for period", period_id))?;
    let items = tx.items(run.id).await?;
    Ok(PayrollRunSummary { run, items })
}
