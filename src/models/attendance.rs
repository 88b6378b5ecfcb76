//! Attendance record model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{RecordId, UserId};

/// A "present" mark for one user on one calendar day.
///
/// At most one record exists per `(user_id, date)`; records are never
/// updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The row identifier.
    pub id: RecordId,
    /// The employee who was present.
    pub user_id: UserId,
    /// The civil (UTC+7) date of attendance.
    pub date: NaiveDate,
}

/// An attendance mark waiting to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAttendance {
    /// The employee who was present.
    pub user_id: UserId,
    /// The civil date of attendance.
    pub date: NaiveDate,
}
