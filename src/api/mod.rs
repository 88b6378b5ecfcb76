//! HTTP API module for the payslip engine.
//!
//! This module exposes the period registry, activity ledger, payroll engine
//! and payslip resolver as REST endpoints.

mod handlers;
mod identity;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use identity::{Identity, ROLE_HEADER, Role, USER_ID_HEADER};
pub use request::{
    AttendanceRequest, CreatePeriodRequest, OvertimeRequest, ReimbursementRequest, SalaryRequest,
};
pub use response::{
    ApiError, ApiErrorResponse, PayrollItemResponse, PayrollRunResponse, ReimbursementResponse,
    SalaryResponse, SubmissionResponse, SubmissionStatus,
};
pub use state::AppState;
