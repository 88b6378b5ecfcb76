//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the caller as two
//! trusted headers, `x-user-id` and `x-user-role`.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::response::ApiErrorResponse;
use crate::models::UserId;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated role.
pub const ROLE_HEADER: &str = "x-user-role";

/// What the caller may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Manages periods, salaries and payroll runs.
    Admin,
    /// Records their own activity and reads their own payslips.
    Employee,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "employee" | "user" => Some(Self::Employee),
            _ => None,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// The caller's user id.
    pub user_id: UserId,
    /// The caller's role.
    pub role: Role,
}

impl Identity {
    /// Rejects callers that are not admins.
    pub fn require_admin(&self) -> Result<(), ApiErrorResponse> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Employee => Err(ApiErrorResponse::forbidden()),
        }
    }

    /// Rejects employees acting on anyone but themselves.
    pub fn require_self_or_admin(&self, user_id: UserId) -> Result<(), ApiErrorResponse> {
        if self.role == Role::Admin || self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiErrorResponse::forbidden())
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER)
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| invalid_header(USER_ID_HEADER))?;
        let role = header(ROLE_HEADER)
            .as_deref()
            .and_then(Role::parse)
            .ok_or_else(|| invalid_header(ROLE_HEADER))?;

        Ok(Self { user_id, role })
    }
}

fn invalid_header(name: &str) -> ApiErrorResponse {
    ApiErrorResponse::unauthorized(format!("missing or invalid {} header", name))
}
