use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveTime;

use crate::models::{ApprovalStatus, BookingStatus, Role};

/// Failures of the booking lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("slot conflict at {}: {}", .time.format("%H:%M"), .detail)]
    SlotConflict { time: NaiveTime, detail: String },

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("service {service_id} cannot move from {from} to {to}")]
    InvalidServiceTransition {
        service_id: String,
        from: ApprovalStatus,
        to: ApprovalStatus,
    },

    #[error("staff {staff_id} is not assigned to booking {booking_id}")]
    NotAssigned { staff_id: String, booking_id: String },

    #[error("{role} may not {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("booking {0} was modified concurrently")]
    Conflict(String),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation_error",
            BookingError::SlotConflict { .. } => "slot_conflict",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::InvalidServiceTransition { .. } => "invalid_transition",
            BookingError::NotAssigned { .. } => "not_assigned",
            BookingError::Forbidden { .. } => "forbidden",
            BookingError::NotFound(_) => "not_found",
            BookingError::Conflict(_) => "concurrent_modification",
            BookingError::DependencyUnavailable(_) => "dependency_unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::SlotConflict { .. } => StatusCode::CONFLICT,
            BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BookingError::InvalidServiceTransition { .. } => StatusCode::CONFLICT,
            BookingError::NotAssigned { .. } => StatusCode::FORBIDDEN,
            BookingError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Booking(BookingError::SlotConflict { time, detail }) => (
                StatusCode::CONFLICT,
                serde_json::json!({
                    "error": "slot_conflict",
                    "time": time.format("%H:%M").to_string(),
                    "detail": detail,
                }),
            ),
            AppError::Booking(BookingError::DependencyUnavailable(detail)) => {
                tracing::error!(detail = %detail, "dependency unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    serde_json::json!({ "error": "dependency_unavailable" }),
                )
            }
            AppError::Booking(e) => (
                e.status_code(),
                serde_json::json!({ "error": e.code(), "detail": e.to_string() }),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "bad_request", "detail": msg }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "unauthorized" }),
            ),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                let body = if cfg!(debug_assertions) {
                    serde_json::json!({ "error": "internal error", "detail": format!("{e:#}") })
                } else {
                    serde_json::json!({ "error": "internal error" })
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
