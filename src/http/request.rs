//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Read inbound form data from the body and query string
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body values come before query values, matching form semantics
//! - Urlencoded and multipart/form-data bodies are decoded; multipart file
//!   parts are skipped, other content types have their body ignored

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, FromRequest, Multipart},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::forward::{FormError, FormPayload, FORM_CONTENT_TYPE};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Issues a fresh UUID v4 per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRelayRequestId;

impl MakeRequestId for MakeRelayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID set by the request-id layer, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Media type of multipart form submissions.
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Collect form fields from an inbound request.
pub async fn read_form(
    headers: &HeaderMap,
    query: Option<&str>,
    body: Result<Bytes, BytesRejection>,
) -> Result<FormPayload, FormError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .map(|v| v.to_str().map_err(|_| FormError::MalformedContentType))
        .transpose()?;
    let essence = content_type.map(|ct| {
        ct.split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    });

    let body = body.map_err(|e| FormError::Body(e.body_text()))?;

    let mut payload = FormPayload::new();
    match essence.as_deref() {
        Some(FORM_CONTENT_TYPE) => payload.extend_from_urlencoded(&body)?,
        Some(MULTIPART_FORM_DATA) => read_multipart(headers, body, &mut payload).await?,
        Some("") => return Err(FormError::MalformedContentType),
        Some(other) if other.starts_with("multipart/") => {
            return Err(FormError::UnsupportedContentType(other.to_string()));
        }
        _ => {}
    }

    if let Some(query) = query {
        payload.extend_from_urlencoded(query.as_bytes())?;
    }

    Ok(payload)
}

/// Append the text fields of a buffered multipart body to `payload`.
async fn read_multipart(
    headers: &HeaderMap,
    body: Bytes,
    payload: &mut FormPayload,
) -> Result<(), FormError> {
    let mut request = Request::new(Body::from(body));
    *request.headers_mut() = headers.clone();

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| FormError::Multipart(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FormError::Multipart(e.body_text()))?
    {
        if field.file_name().is_some() {
            tracing::debug!(name = ?field.name(), "Skipping multipart file part");
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| FormError::Multipart(e.body_text()))?;
        payload.append(name, value);
    }

    Ok(())
}
