//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`; every failure renders as
//! `{"success": false, "error": "..."}` with the status its kind maps to.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::errors::DomainError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Wrapper so domain errors can be returned straight from handlers
#[derive(Debug)]
pub struct HttpAppError(pub DomainError);

impl From<DomainError> for HttpAppError {
    fn from(err: DomainError) -> Self {
        HttpAppError(err)
    }
}

/// Status code a domain error is reported with
pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::BadRequest(_) => StatusCode::BAD_REQUEST,
        DomainError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::EncodingFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        DomainError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn log_error(error: &DomainError, status: StatusCode) {
    let kind = error.kind();
    if status.is_server_error() {
        tracing::error!(error = %error, kind, status = status.as_u16(), "Request failed");
    } else {
        tracing::debug!(error = %error, kind, status = status.as_u16(), "Request rejected");
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        log_error(&self.0, status);

        let body = Json(ErrorResponse {
            success: false,
            error: self.0.client_message(),
        });
        (status, body).into_response()
    }
}
