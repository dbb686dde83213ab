use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::domain::payment::{ErrorEnvelope, ErrorPayload};
use crate::error::LedgerError;

pub fn envelope(code: &str, message: &str, details: Option<String>) -> ErrorEnvelope {
    ErrorEnvelope {
        error: ErrorPayload {
            code: code.to_string(),
            message: message.to_string(),
            details,
        },
    }
}

pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidPeriod(_) | LedgerError::InvalidWeight | LedgerError::InvalidWindow => {
            StatusCode::BAD_REQUEST
        }
        LedgerError::RequestNotApproved(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::InvoiceLocked(_)
        | LedgerError::IllegalTransition { .. }
        | LedgerError::InvalidState { .. } => StatusCode::CONFLICT,
        LedgerError::UnknownTransaction | LedgerError::SignatureMismatch => StatusCode::BAD_REQUEST,
        LedgerError::PersistenceConflict => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Unauthorized => StatusCode::UNAUTHORIZED,
        LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: LedgerError) -> Response {
    let status = status_for(&err);
    let body = if err.is_security_event() {
        envelope("CALLBACK_REJECTED", "callback rejected", None)
    } else if let LedgerError::Internal(inner) = &err {
        tracing::error!(error = %inner, "request failed");
        envelope(err.code(), "internal error", None)
    } else {
        envelope(err.code(), &err.to_string(), None)
    };
    (status, Json(body)).into_response()
}

pub fn bad_request(code: &str, message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(envelope(code, message, None))).into_response()
}
