//! Response types for the payslip API.
//!
//! This module defines the JSON bodies the endpoints return, the error
//! body, and the mapping from engine errors to HTTP statuses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calculation::Fixed2;
use crate::error::{EngineError, ErrorKind};
use crate::models::{
    AttendanceRecord, OvertimeRecord, PayrollItem, PayrollRunSummary, PeriodId, RecordId,
    ReimbursementRecord, RunId, UserId,
};
use crate::service::Submission;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A `400 Bad Request` carrying `error`.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }

    /// A `401 Unauthorized`.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: ApiError::new("UNAUTHORIZED", message),
        }
    }

    /// A `403 Forbidden`.
    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: ApiError::new("FORBIDDEN", "admin role required"),
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        match error.kind() {
            ErrorKind::InvalidInput => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::new("INVALID_INPUT", message_of(&error)),
            },
            ErrorKind::NotFound => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new("NOT_FOUND", error.to_string()),
            },
            ErrorKind::Conflict => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::new("CONFLICT", message_of(&error)),
            },
            ErrorKind::InternalFailure => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "INTERNAL_ERROR",
                    "Internal server error",
                    error.to_string(),
                ),
            },
        }
    }
}

/// The bare message, without the variant prefix used by `Display`.
fn message_of(error: &EngineError) -> String {
    match error {
        EngineError::InvalidInput { message } | EngineError::Conflict { message } => {
            message.clone()
        }
        other => other.to_string(),
    }
}

/// Whether a ledger submission inserted a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// A new row was stored.
    Created,
    /// The row already existed; nothing was stored.
    AlreadyExists,
}

impl SubmissionStatus {
    fn of(already_exists: bool) -> Self {
        if already_exists {
            Self::AlreadyExists
        } else {
            Self::Created
        }
    }
}

/// Body returned by `POST /attendance` and `POST /overtime`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// The stored row.
    pub id: RecordId,
    /// The submitting user.
    pub user_id: UserId,
    /// The day the row is for.
    pub date: NaiveDate,
    /// Overtime hours; absent for attendance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Fixed2>,
    /// `created` or `already_exists`.
    pub status: SubmissionStatus,
}

impl From<Submission<AttendanceRecord>> for SubmissionResponse {
    fn from(submission: Submission<AttendanceRecord>) -> Self {
        let record = submission.record;
        Self {
            id: record.id,
            user_id: record.user_id,
            date: record.date,
            hours: None,
            status: SubmissionStatus::of(submission.already_exists),
        }
    }
}

impl From<Submission<OvertimeRecord>> for SubmissionResponse {
    fn from(submission: Submission<OvertimeRecord>) -> Self {
        let record = submission.record;
        Self {
            id: record.id,
            user_id: record.user_id,
            date: record.date,
            hours: Some(Fixed2::new(record.hours)),
            status: SubmissionStatus::of(submission.already_exists),
        }
    }
}

/// Body returned by `POST /reimbursements`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReimbursementResponse {
    /// The stored row.
    pub id: RecordId,
    /// The submitting user.
    pub user_id: UserId,
    /// The date of the expense.
    pub date: NaiveDate,
    /// The amount.
    pub amount: Fixed2,
    /// Optional description.
    pub description: Option<String>,
}

impl From<ReimbursementRecord> for ReimbursementResponse {
    fn from(record: ReimbursementRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            date: record.date,
            amount: Fixed2::new(record.amount),
            description: record.description,
        }
    }
}

/// Body returned by `PUT /employees/:user_id/salary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryResponse {
    /// The employee.
    pub user_id: UserId,
    /// The monthly salary now on record.
    pub salary: Fixed2,
}

/// One frozen item in a payroll run body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollItemResponse {
    /// The employee.
    pub user_id: UserId,
    /// Salary at run time.
    pub snapshot_salary: Fixed2,
    /// Mon–Fri days in the period.
    pub working_days: u32,
    /// Days attended.
    pub attendance_days: u32,
    /// `working_days * 8`.
    pub working_hours: u32,
    /// `attendance_days * 8`.
    pub attendance_hours: u32,
    /// Overtime hours claimed.
    pub overtime_hours: Fixed2,
    /// Prorated base pay.
    pub base_pay: Fixed2,
    /// Overtime pay.
    pub overtime_pay: Fixed2,
    /// Reimbursements within the period.
    pub reimbursement_total: Fixed2,
    /// Total pay.
    pub grand_total: Fixed2,
}

impl From<&PayrollItem> for PayrollItemResponse {
    fn from(item: &PayrollItem) -> Self {
        let pay = item.pay;
        Self {
            user_id: item.user_id,
            snapshot_salary: Fixed2::new(pay.snapshot_salary),
            working_days: pay.working_days,
            attendance_days: pay.attendance_days,
            working_hours: pay.working_hours,
            attendance_hours: pay.attendance_hours,
            overtime_hours: Fixed2::new(pay.overtime_hours),
            base_pay: Fixed2::new(pay.base_pay),
            overtime_pay: Fixed2::new(pay.overtime_pay),
            reimbursement_total: Fixed2::new(pay.reimbursement_total),
            grand_total: Fixed2::new(pay.grand_total),
        }
    }
}

/// Body returned by the payroll run endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRunResponse {
    /// The run.
    pub run_id: RunId,
    /// The period the run covers.
    pub period_id: PeriodId,
    /// When the run executed.
    pub run_at: DateTime<Utc>,
    /// One item per user, ordered by user id.
    pub items: Vec<PayrollItemResponse>,
}

impl From<PayrollRunSummary> for PayrollRunResponse {
    fn from(summary: PayrollRunSummary) -> Self {
        Self {
            run_id: summary.run.id,
            period_id: summary.run.period_id,
            run_at: summary.run.run_at,
            items: summary.items.iter().map(PayrollItemResponse::from).collect(),
        }
    }
}
