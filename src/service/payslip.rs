//! Payslip resolver.
//!
//! Once a period has been run, its payslips come from the frozen payroll
//! items; before that they are computed live with the same formula and
//! the same aggregation order, so a live payslip matches what a run at the
//! same instant would freeze.
//!
//! Reimbursement lines are always read live. After a run, the listed lines
//! may therefore add up to more than the frozen `reimbursement_sum` when
//! reimbursements were filed later.

use std::sync::Arc;

use tracing::debug;

use crate::calculation::{
    Fixed2, OVERTIME_MULTIPLIER, PayInputs, WorkSchedule, compute_pay, hourly_rate,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendancePeriod, PayBreakdown, Payslip, PayslipPeriod, PeriodId, ReimbursementLine,
    ReimbursementRecord, UserId,
};
use crate::store::{self, Store, Transaction};

/// Produces payslips, from snapshots when available.
#[derive(Debug, Clone)]
pub struct PayslipResolver {
    store: Arc<dyn Store>,
}

impl PayslipResolver {
    /// Creates a resolver over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The payslip of `user_id` for a period.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the period does not exist, or when it has not
    /// been run and contains no working days.
    pub async fn generate_payslip(
        &self,
        user_id: UserId,
        period_id: PeriodId,
    ) -> EngineResult<Payslip> {
        let mut tx = self.store.begin_read().await?;
        let outcome = resolve(tx.as_mut(), user_id, period_id).await;
        let payslip = store::finish(tx, outcome).await?;

        debug!(
            user_id,
            period_id,
            snapshot_used = payslip.snapshot_used,
            "Payslip resolved"
        );
        Ok(payslip)
    }
}

async fn resolve(
    tx: &mut dyn Transaction,
    user_id: UserId,
    period_id: PeriodId,
) -> EngineResult<Payslip> {
    let period = tx
        .find_period(period_id)
        .await?
        .ok_or_else(|| EngineError::invalid_input("attendance period not found"))?;
    let (start, end) = (period.start_date, period.end_date);

    if let Some(run) = tx.find_run(period_id).await? {
        let pay = tx
            .find_item(run.id, user_id)
            .await?
            .map(|item| item.pay)
            .unwrap_or_else(PayBreakdown::zero);
        let lines = tx.reimbursements(user_id, start, end).await?;
        return Ok(build_payslip(&period, true, pay, &lines));
    }

    let schedule = WorkSchedule::for_range(start, end)?;
    let lines = tx.reimbursements(user_id, start, end).await?;
    let inputs = PayInputs {
        salary: tx.find_salary(user_id).await?.unwrap_or(0.0),
        attendance_days: tx
            .attendance_days(start, end)
            .await?
            .get(&user_id)
            .copied()
            .unwrap_or(0),
        overtime_hours: tx
            .overtime_hours(start, end)
            .await?
            .get(&user_id)
            .copied()
            .unwrap_or(0.0),
        // Lines come in (date, id) order, the order the run sums them in
        reimbursement_total: lines.iter().fold(0.0, |sum, line| sum + line.amount),
    };

    let pay = compute_pay(schedule, inputs);
    Ok(build_payslip(&period, false, pay, &lines))
}

fn build_payslip(
    period: &AttendancePeriod,
    snapshot_used: bool,
    pay: PayBreakdown,
    lines: &[ReimbursementRecord],
) -> Payslip {
    Payslip {
        period: PayslipPeriod::from(period),
        snapshot_used,
        working_days: pay.working_days,
        attendance_days: pay.attendance_days,
        working_hours: pay.working_hours,
        attendance_hours: pay.attendance_hours,
        hourly_rate: Fixed2::new(hourly_rate(pay.snapshot_salary, pay.working_hours)),
        base_pay: Fixed2::new(pay.base_pay),
        overtime_hours: Fixed2::new(pay.overtime_hours),
        overtime_multiplier: Fixed2::new(OVERTIME_MULTIPLIER),
        overtime_pay: Fixed2::new(pay.overtime_pay),
        reimbursements: lines.iter().map(ReimbursementLine::from).collect(),
        reimbursement_sum: Fixed2::new(pay.reimbursement_total),
        salary_snapshot: Fixed2::new(pay.snapshot_salary),
        grand_total: Fixed2::new(pay.grand_total),
    }
}
