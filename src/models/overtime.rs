//! Overtime claim model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{RecordId, UserId};

/// Overtime hours claimed by one user for one calendar day.
///
/// Keyed by `(user_id, date)` independently of attendance, so an overtime
/// claim and an attendance mark for the same day never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeRecord {
    /// The row identifier.
    pub id: RecordId,
    /// The employee claiming overtime.
    pub user_id: UserId,
    /// The civil date the overtime was worked.
    pub date: NaiveDate,
    /// Hours claimed, `0 < hours <= 3`, two-decimal precision.
    pub hours: f64,
}

/// An overtime claim waiting to be inserted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewOvertime {
    /// The employee claiming overtime.
    pub user_id: UserId,
    /// The civil date the overtime was worked.
    pub date: NaiveDate,
    /// Hours claimed.
    pub hours: f64,
}
