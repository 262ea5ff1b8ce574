//! Response shaping.
//!
//! # Responsibilities
//! - Map gateway values to HTTP status codes and JSON bodies
//! - Uniform JSON body for unmatched routes
//!
//! # Design Decisions
//! - `ErrorResponse` is always a 500; the gateway already classified it
//! - `EventResponse` and health markers are always a 200

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::gateway::{ErrorResponse, EventResponse, HealthResponse};

impl IntoResponse for EventResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Body for requests the router does not handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn not_found(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "No route matched");
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse {
            message: "Not Found".to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CounterSnapshot;

    #[test]
    fn test_status_codes() {
        let counts = CounterSnapshot { event_count: 1, error_count: 2 };
        assert_eq!(EventResponse::ok(counts).into_response().status(), StatusCode::OK);
        assert_eq!(
            ErrorResponse::new("m", "e", counts).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(HealthResponse::ok().into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = not_found(Uri::from_static("/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let message: MessageResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(message.message, "Not Found");
    }
}
