//! Application error type with HTTP response conversion.
//!
//! Every recoverable failure in the scheduling core is expressed as an
//! [`AppError`] carrying a closed [`ErrorCode`], an HTTP status, and an
//! optional structured `details` payload (e.g. the conflicting class and
//! time range when a room assignment is rejected). `System` errors are
//! logged with full diagnostic detail server-side and rendered as a
//! generic message to the caller.

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

/// Closed taxonomy of failure kinds surfaced by the scheduling core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Schedule, room, or exception does not exist.
    NotFound,
    /// Date outside the class window, missing field, duplicate exception.
    Validation,
    /// Room already occupied at that day/slot.
    Conflict,
    /// Exception redirect target unavailable.
    TargetConflict,
    /// Room flagged inactive.
    RoomUnavailable,
    /// Underlying store failure.
    System,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Conflict | ErrorCode::TargetConflict => StatusCode::CONFLICT,
            ErrorCode::RoomUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::System => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub error: Error,
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn new<E>(code: ErrorCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status: code.status(),
            code,
            error: err.into(),
            details: None,
        }
    }

    /// Attach structured detail for the UI (conflicting class, teacher,
    /// time range, ...).
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the HTTP status while keeping the error code (used by
    /// the identity boundary for 401/403).
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::NotFound, err)
    }

    pub fn validation<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::Validation, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::Conflict, err)
    }

    pub fn target_conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::TargetConflict, err)
    }

    pub fn room_unavailable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::RoomUnavailable, err)
    }

    pub fn system<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::System, err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.code == ErrorCode::System {
            tracing::error!(error = ?self.error, "internal error");
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        };

        let body = match self.details {
            Some(details) => Json(json!({
                "error": message,
                "code": self.code,
                "details": details,
            })),
            None => Json(json!({
                "error": message,
                "code": self.code,
            })),
        };

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::system(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_maps_to_status() {
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::TargetConflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::Validation.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::System.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn constructor_sets_matching_status() {
        let err = AppError::conflict(anyhow::anyhow!("room taken"));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.details.is_none());
    }

    #[test]
    fn details_are_attached() {
        let err = AppError::conflict(anyhow::anyhow!("room taken"))
            .with_details(json!({"class_name": "Algebra I"}));
        assert_eq!(
            err.details.unwrap()["class_name"],
            serde_json::Value::from("Algebra I")
        );
    }

    #[test]
    fn store_errors_become_system() {
        fn fails() -> Result<(), std::io::Error> {
            Err(std::io::Error::other("boom"))
        }
        let err: AppError = fails().unwrap_err().into();
        assert_eq!(err.code, ErrorCode::System);
    }
}
