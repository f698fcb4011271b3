//! Request extractors for the trim endpoint

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    Form, Json,
};
use serde::Deserialize;

use crate::domain::errors::DomainError;
use crate::domain::model::TimeInput;
use crate::http::error::HttpAppError;
use crate::http::AppState;

/// Raw trim fields, all optional so validation can report what is missing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrimFields {
    pub filename: Option<String>,
    pub start: Option<TimeInput>,
    pub end: Option<TimeInput>,
}

/// Trim fields read from a JSON, URL-encoded or multipart body.
///
/// An empty body without a content type yields empty fields, so the request
/// fails validation with a precise message instead of a parse error.
#[derive(Debug, Clone)]
pub struct TrimParams(pub TrimFields);

impl FromRequest<AppState> for TrimParams {
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let limit = state.container.upload_interactor().max_upload_bytes();
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match content_type.as_str() {
            "application/json" => Json::<TrimFields>::from_request(req, state)
                .await
                .map(|Json(fields)| TrimParams(fields))
                .map_err(|r| rejection_error(r.status(), r.body_text(), limit)),
            "application/x-www-form-urlencoded" => Form::<TrimFields>::from_request(req, state)
                .await
                .map(|Form(fields)| TrimParams(fields))
                .map_err(|r| rejection_error(r.status(), r.body_text(), limit)),
            "multipart/form-data" => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|r| rejection_error(r.status(), r.body_text(), limit))?;
                read_multipart_fields(multipart, limit).await.map(TrimParams)
            }
            "" => {
                let body = Bytes::from_request(req, state)
                    .await
                    .map_err(|r| rejection_error(r.status(), r.body_text(), limit))?;
                if body.iter().all(u8::is_ascii_whitespace) {
                    return Ok(TrimParams(TrimFields::default()));
                }
                serde_json::from_slice(&body).map(TrimParams).map_err(|e| {
                    HttpAppError(DomainError::BadRequest(format!("Invalid JSON body: {}", e)))
                })
            }
            other => Err(HttpAppError(DomainError::BadRequest(format!(
                "Unsupported content type: {}",
                other
            )))),
        }
    }
}

async fn read_multipart_fields(
    mut multipart: Multipart,
    limit: u64,
) -> Result<TrimFields, HttpAppError> {
    let mut fields = TrimFields::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if !matches!(name.as_str(), "filename" | "start" | "end") {
            continue;
        }
        let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
        match name.as_str() {
            "filename" => fields.filename = Some(value),
            "start" => fields.start = Some(TimeInput::Text(value)),
            _ => fields.end = Some(TimeInput::Text(value)),
        }
    }
    Ok(fields)
}

/// Map a multipart stream failure, keeping body-limit hits as 413
pub fn multipart_error(error: axum::extract::multipart::MultipartError, limit: u64) -> HttpAppError {
    rejection_error(error.status(), error.body_text(), limit)
}

fn rejection_error(status: StatusCode, detail: String, limit: u64) -> HttpAppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        HttpAppError(DomainError::PayloadTooLarge { limit_bytes: limit })
    } else {
        HttpAppError(DomainError::BadRequest(format!("Invalid request body: {}", detail)))
    }
}
