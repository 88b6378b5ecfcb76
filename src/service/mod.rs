//! The engine's operations.
//!
//! Each component owns one slice of the workflow and runs every operation
//! inside a single store transaction:
//!
//! - [`PeriodRegistry`]: attendance periods and their non-overlap rule.
//! - [`ActivityLedger`]: idempotent attendance and overtime, reimbursements.
//! - [`EmployeeDirectory`]: monthly salaries.
//! - [`PayrollEngine`]: the once-per-period payroll run.
//! - [`PayslipResolver`]: snapshot or live payslips.

mod directory;
#[cfg(test)]
pub(crate) mod fixtures;
mod ledger;
mod payroll;
mod payslip;
mod periods;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{EngineError, EngineResult};

pub use directory::EmployeeDirectory;
pub use ledger::{ActivityLedger, MAX_OVERTIME_HOURS, Submission};
pub use payroll::PayrollEngine;
pub use payslip::PayslipResolver;
pub use periods::PeriodRegistry;

/// Converts a validated decimal input to the engine's float domain.
///
/// Inputs carry at most two decimal places, like every quantity the engine
/// stores.
pub(crate) fn two_decimals(field: &str, value: Decimal) -> EngineResult<f64> {
    if value.normalize().scale() > 2 {
        return Err(EngineError::invalid_input(format!(
            "{} must have at most 2 decimal places",
            field
        )));
    }

    value
        .to_f64()
        .ok_or_else(|| EngineError::invalid_input(format!("{} is out of range", field)))
}
