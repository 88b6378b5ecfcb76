//! Request types for the payslip API.
//!
//! Dates stay strings here: the engine parses them so that malformed dates
//! surface as `INVALID_INPUT` with the field named, and absent dates can
//! default to today in the civil calendar. Money and hours arrive as
//! decimals, either JSON numbers or strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::response::ApiError;

/// Longest reimbursement description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 255;

/// Body of `POST /periods`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePeriodRequest {
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// First day, `YYYY-MM-DD`.
    pub start_date: String,
    /// Last day, `YYYY-MM-DD`.
    pub end_date: String,
}

/// Body of `PUT /employees/:user_id/salary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryRequest {
    /// Monthly salary.
    pub salary: Decimal,
}

/// Body of `POST /attendance`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceRequest {
    /// Day to mark, `YYYY-MM-DD`; today when absent.
    #[serde(default)]
    pub date: Option<String>,
}

/// Body of `POST /overtime`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvertimeRequest {
    /// Day worked, `YYYY-MM-DD`; today when absent.
    #[serde(default)]
    pub date: Option<String>,
    /// Hours claimed, in `(0, 3]`.
    pub hours: Decimal,
}

/// Body of `POST /reimbursements`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReimbursementRequest {
    /// Day of the expense, `YYYY-MM-DD`; today when absent.
    #[serde(default)]
    pub date: Option<String>,
    /// Amount, greater than zero.
    pub amount: Decimal,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ReimbursementRequest {
    /// Checks the constraints the engine leaves to the caller.
    pub fn validate(&self) -> Result<(), ApiError> {
        match &self.description {
            Some(description) if description.chars().count() > MAX_DESCRIPTION_CHARS => {
                Err(ApiError::validation_error(format!(
                    "description must be at most {} characters",
                    MAX_DESCRIPTION_CHARS
                )))
            }
            _ => Ok(()),
        }
    }
}
