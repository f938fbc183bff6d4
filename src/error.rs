use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

use crate::model::attendance::{DailyState, EventKind};

/// Errors surfaced by the attendance core.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// The event is not a legal transition from the day's current state.
    #[error("{kind} is not allowed while the day is {state}")]
    OutOfSequenceEvent { state: DailyState, kind: EventKind },

    /// The kind was already recorded for that employee and day.
    #[error("{kind} already recorded on {date}")]
    DuplicateEvent { kind: EventKind, date: NaiveDate },

    #[error("no work schedule configured for employee {employee_id}")]
    NotConfigured { employee_id: u64 },

    #[error("{what} not found")]
    NotFound { what: String },

    /// Ledger or store unavailable. The only variant retried on writes.
    #[error("store unavailable: {0}")]
    TransientStoreError(String),

    #[error("{0}")]
    InvalidRequest(String),
}

impl AttendanceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AttendanceError::NotFound { what: what.into() }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AttendanceError::TransientStoreError(_))
    }

    /// Stable machine-readable code returned to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::OutOfSequenceEvent { .. } => "out_of_sequence_event",
            AttendanceError::DuplicateEvent { .. } => "duplicate_event",
            AttendanceError::NotConfigured { .. } => "not_configured",
            AttendanceError::NotFound { .. } => "not_found",
            AttendanceError::TransientStoreError(_) => "transient_store_error",
            AttendanceError::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<sqlx::Error> for AttendanceError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AttendanceError::not_found("record"),
            other => AttendanceError::TransientStoreError(other.to_string()),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::OutOfSequenceEvent { .. }
            | AttendanceError::DuplicateEvent { .. }
            | AttendanceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AttendanceError::NotConfigured { .. } | AttendanceError::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AttendanceError::TransientStoreError(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // store details stay in the logs
        let message = match self {
            AttendanceError::TransientStoreError(_) => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": message,
        }))
    }
}
