//! HTTP request handlers for the payslip API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::Fixed2;
use crate::error::EngineError;
use crate::models::{PeriodId, UserId};

use super::identity::Identity;
use super::request::{
    AttendanceRequest, CreatePeriodRequest, OvertimeRequest, ReimbursementRequest, SalaryRequest,
};
use super::response::{
    ApiError, ApiErrorResponse, PayrollRunResponse, ReimbursementResponse, SalaryResponse,
    SubmissionResponse,
};
use super::state::AppState;

type HandlerResult<T> = Result<T, ApiErrorResponse>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config().config().server.request_timeout_secs);

    Router::new()
        .route("/health", get(health_handler))
        .route("/periods", post(create_period_handler).get(list_periods_handler))
        .route("/periods/:id", get(get_period_handler))
        .route(
            "/employees/:user_id/salary",
            put(set_salary_handler).get(get_salary_handler),
        )
        .route("/attendance", post(attendance_handler))
        .route("/overtime", post(overtime_handler))
        .route("/reimbursements", post(reimbursement_handler))
        .route("/payroll/periods/:id/run", post(run_payroll_handler))
        .route("/payroll/periods/:id", get(get_payroll_handler))
        .route("/payslips/periods/:id", get(payslip_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler for GET /health.
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

/// Handler for POST /periods.
async fn create_period_handler(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<CreatePeriodRequest>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    info!(
        correlation_id = %correlation_id,
        user_id = identity.user_id,
        "Creating attendance period"
    );

    identity.require_admin()?;
    let request = read_json(correlation_id, payload)?;

    let period = state
        .periods()
        .create_period(request.name, &request.start_date, &request.end_date)
        .await
        .map_err(|err| failed(correlation_id, "Period creation", err))?;

    Ok((StatusCode::CREATED, Json(period)))
}

/// Handler for GET /periods.
async fn list_periods_handler(
    State(state): State<AppState>,
    _identity: Identity,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    let periods = state
        .periods()
        .list_periods()
        .await
        .map_err(|err| failed(correlation_id, "Period listing", err))?;
    Ok(Json(periods))
}

/// Handler for GET /periods/:id.
async fn get_period_handler(
    State(state): State<AppState>,
    _identity: Identity,
    id: Result<Path<PeriodId>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    let period_id = path_id("period_id", id)?;

    let period = state
        .periods()
        .get_period(period_id)
        .await
        .map_err(|err| failed(correlation_id, "Period lookup", err))?;
    Ok(Json(period))
}

/// Handler for PUT /employees/:user_id/salary.
async fn set_salary_handler(
    State(state): State<AppState>,
    identity: Identity,
    user_id: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<SalaryRequest>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    identity.require_admin()?;
    let user_id = path_id("user_id", user_id)?;
    let request = read_json(correlation_id, payload)?;

    let salary = state
        .directory()
        .set_salary(user_id, request.salary)
        .await
        .map_err(|err| failed(correlation_id, "Salary update", err))?;

    info!(correlation_id = %correlation_id, user_id, "Salary updated");
    Ok(Json(SalaryResponse {
        user_id,
        salary: Fixed2::new(salary),
    }))
}

/// Handler for GET /employees/:user_id/salary.
///
/// Admins read any salary; employees only their own.
async fn get_salary_handler(
    State(state): State<AppState>,
    identity: Identity,
    user_id: Result<Path<UserId>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    let user_id = path_id("user_id", user_id)?;
    identity.require_self_or_admin(user_id)?;

    let salary = state
        .directory()
        .salary_of(user_id)
        .await
        .map_err(|err| failed(correlation_id, "Salary lookup", err))?;
    Ok(Json(SalaryResponse {
        user_id,
        salary: Fixed2::new(salary),
    }))
}

/// Handler for POST /attendance.
///
/// Resubmitting the same day answers `200` with `already_exists`.
async fn attendance_handler(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<AttendanceRequest>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    let request = read_json(correlation_id, payload)?;

    let submission = state
        .ledger()
        .submit_attendance(identity.user_id, request.date.as_deref())
        .await
        .map_err(|err| failed(correlation_id, "Attendance submission", err))?;

    Ok(Json(SubmissionResponse::from(submission)))
}

/// Handler for POST /overtime.
async fn overtime_handler(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<OvertimeRequest>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    let request = read_json(correlation_id, payload)?;

    let submission = state
        .ledger()
        .submit_overtime(identity.user_id, request.date.as_deref(), request.hours)
        .await
        .map_err(|err| failed(correlation_id, "Overtime submission", err))?;

    Ok(Json(SubmissionResponse::from(submission)))
}

/// Handler for POST /reimbursements.
async fn reimbursement_handler(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<ReimbursementRequest>, JsonRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    let request = read_json(correlation_id, payload)?;
    request.validate().map_err(ApiErrorResponse::bad_request)?;

    let record = state
        .ledger()
        .create_reimbursement(
            identity.user_id,
            request.date.as_deref(),
            request.amount,
            request.description,
        )
        .await
        .map_err(|err| failed(correlation_id, "Reimbursement creation", err))?;

    Ok((StatusCode::CREATED, Json(ReimbursementResponse::from(record))))
}

/// Handler for POST /payroll/periods/:id/run.
async fn run_payroll_handler(
    State(state): State<AppState>,
    identity: Identity,
    id: Result<Path<PeriodId>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    identity.require_admin()?;
    let period_id = path_id("period_id", id)?;
    info!(correlation_id = %correlation_id, period_id, "Processing payroll run request");

    let summary = state
        .payroll()
        .run_payroll(period_id)
        .await
        .map_err(|err| failed(correlation_id, "Payroll run", err))?;

    info!(
        correlation_id = %correlation_id,
        run_id = summary.run.id,
        "Payroll run request completed"
    );
    Ok((StatusCode::CREATED, Json(PayrollRunResponse::from(summary))))
}

/// Handler for GET /payroll/periods/:id.
async fn get_payroll_handler(
    State(state): State<AppState>,
    identity: Identity,
    id: Result<Path<PeriodId>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    identity.require_admin()?;
    let period_id = path_id("period_id", id)?;

    let summary = state
        .payroll()
        .get_run(period_id)
        .await
        .map_err(|err| failed(correlation_id, "Payroll lookup", err))?;
    Ok(Json(PayrollRunResponse::from(summary)))
}

/// Handler for GET /payslips/periods/:id.
///
/// Always the caller's own payslip.
async fn payslip_handler(
    State(state): State<AppState>,
    identity: Identity,
    id: Result<Path<PeriodId>, PathRejection>,
) -> HandlerResult<impl IntoResponse> {
    let correlation_id = Uuid::new_v4();
    let period_id = path_id("period_id", id)?;

    let payslip = state
        .payslips()
        .generate_payslip(identity.user_id, period_id)
        .await
        .map_err(|err| failed(correlation_id, "Payslip generation", err))?;

    info!(
        correlation_id = %correlation_id,
        user_id = identity.user_id,
        period_id,
        snapshot_used = payslip.snapshot_used,
        grand_total = %payslip.grand_total,
        "Payslip generated"
    );
    Ok(Json(payslip))
}

/// Unwraps a JSON body, turning extractor rejections into `400`s.
fn read_json<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> HandlerResult<T> {
    let rejection = match payload {
        Ok(Json(body)) => return Ok(body),
        Err(rejection) => rejection,
    };

    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // Get the body text which contains the detailed error from serde
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    Err(ApiErrorResponse::bad_request(error))
}

/// Extracts a positive numeric path segment.
fn path_id(field: &str, segment: Result<Path<u64>, PathRejection>) -> HandlerResult<u64> {
    match segment {
        Ok(Path(id)) if id > 0 => Ok(id),
        _ => Err(ApiErrorResponse::bad_request(ApiError::validation_error(
            format!("invalid {}", field),
        ))),
    }
}

fn failed(correlation_id: Uuid, operation: &str, err: EngineError) -> ApiErrorResponse {
    warn!(
        correlation_id = %correlation_id,
        error = %err,
        "{} failed",
        operation
    );
    err.into()
}
