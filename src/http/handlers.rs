//! Route handlers

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header::CONTENT_LENGTH, HeaderMap},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::domain::errors::DomainError;
use crate::domain::model::{StoredSource, TrimRequest};
use crate::http::error::HttpAppError;
use crate::http::extract::{multipart_error, TrimParams};
use crate::http::{multipart_body_limit, AppState};

/// Multipart field carrying the upload
pub const UPLOAD_FIELD: &str = "video";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct TrimResponse {
    pub success: bool,
    pub url: String,
}

pub async fn health() -> &'static str {
    "Video trimmer backend is running"
}

/// Stream one `video` file into the upload directory
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let uploads = state.container.upload_interactor();
    let store = state.container.artifact_store();
    let limit = uploads.max_upload_bytes();

    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    if declared.is_some_and(|length| length > multipart_body_limit(limit)) {
        return Err(DomainError::PayloadTooLarge { limit_bytes: limit }.into());
    }

    let mut multipart = multipart.map_err(|r| {
        HttpAppError(DomainError::BadRequest(format!(
            "Invalid multipart request: {}",
            r.body_text()
        )))
    })?;

    let mut stored: Option<StoredSource> = None;
    loop {
        let next = multipart.next_field().await;
        let mut field = match next {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                if let Some(first) = &stored {
                    store.discard(&first.path).await;
                }
                return Err(multipart_error(e, limit));
            }
        };

        if field.name() != Some(UPLOAD_FIELD) || field.file_name().is_none() {
            continue;
        }
        if let Some(first) = stored.take() {
            store.discard(&first.path).await;
            return Err(DomainError::BadRequest(
                "Only one video file may be uploaded per request".to_string(),
            )
            .into());
        }

        let original_name = field.file_name().map(str::to_string);
        let mut sink = uploads.begin(original_name.as_deref()).await?;
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = sink.write_chunk(&chunk).await {
                        sink.abort().await;
                        return Err(e.into());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    sink.abort().await;
                    return Err(multipart_error(e, limit));
                }
            }
        }
        stored = Some(sink.commit().await?);
    }

    let stored =
        stored.ok_or_else(|| DomainError::BadRequest("No file uploaded".to_string()))?;
    info!(
        identifier = %stored.identifier,
        size_bytes = stored.size_bytes,
        content_type = %stored.content_type,
        "Upload accepted"
    );

    Ok(Json(UploadResponse {
        success: true,
        filename: stored.identifier,
    }))
}

/// Cut a window out of a stored upload
pub async fn trim(
    State(state): State<AppState>,
    TrimParams(fields): TrimParams,
) -> Result<Json<TrimResponse>, HttpAppError> {
    let request = TrimRequest::from_parts(fields.filename, fields.start, fields.end)?;
    let artifact = state.container.trim_interactor().trim(request).await?;

    Ok(Json(TrimResponse {
        success: true,
        url: artifact.url,
    }))
}
