//! Reimbursement request model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{RecordId, UserId};

/// A reimbursement requested by a user for a calendar day.
///
/// Unlike attendance and overtime there is no uniqueness constraint: any
/// number of reimbursements may exist per user per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReimbursementRecord {
    /// The row identifier.
    pub id: RecordId,
    /// The employee being reimbursed.
    pub user_id: UserId,
    /// The civil date of the expense.
    pub date: NaiveDate,
    /// The amount, always positive.
    pub amount: f64,
    /// Optional free-text description (at most 255 characters).
    pub description: Option<String>,
}

/// A reimbursement waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReimbursement {
    /// The employee being reimbursed.
    pub user_id: UserId,
    /// The civil date of the expense.
    pub date: NaiveDate,
    /// The amount.
    pub amount: f64,
    /// Optional description.
    pub description: Option<String>,
}
