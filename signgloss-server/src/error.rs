//! HTTP error responses
//!
//! The two endpoints keep distinct payload shapes: text-to-gloss errors carry
//! `success: false`, gloss-to-video errors carry a `timestamp`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::pipeline::{PipelineError, Stage};
use crate::resolver::MappingError;

pub const TEXT_FAILURE_DETAILS: &str = "Error processing text to gloss conversion";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or blank `text` (400)
    #[error("Invalid text request: {0}")]
    InvalidText(String),

    /// Text-to-gloss failure (400 for empty input, else 500)
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Missing or blank `gloss` (400)
    #[error("Invalid gloss request: {0}")]
    InvalidGloss(String),

    /// Gloss-to-video failure (404 for unknown gloss, else 500)
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidText(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg, "success": false }),
            ),
            ApiError::Pipeline(PipelineError::EmptyInput) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Empty text provided", "success": false }),
            ),
            ApiError::Pipeline(err) => {
                error!("Service error ({} stage): {}", err.stage(), err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": err.to_string(),
                        "details": TEXT_FAILURE_DETAILS,
                        "stage": err.stage(),
                        "success": false,
                    }),
                )
            }
            ApiError::InvalidGloss(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg, "timestamp": timestamp() }),
            ),
            ApiError::Mapping(MappingError::UnknownGloss(token)) => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": MappingError::UnknownGloss(token.clone()).to_string(),
                    "token": token,
                    "timestamp": timestamp(),
                }),
            ),
            ApiError::Mapping(err @ MappingError::Catalog(_)) => {
                error!("Video catalog error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": err.to_string(),
                        "stage": Stage::Catalog,
                        "timestamp": timestamp(),
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// UTC timestamp in RFC 3339
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;
    use crate::clients::UpstreamError;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_empty_input_is_bad_request() {
        let (status, body) = render(PipelineError::EmptyInput.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_upstream_failure_names_stage() {
        let err = PipelineError::Upstream {
            stage: Stage::Generation,
            source: UpstreamError::Api(429, "quota".into()),
        };
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["stage"], "generation");
        assert_eq!(body["details"], TEXT_FAILURE_DETAILS);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_gloss_is_not_found() {
        let err = MappingError::UnknownGloss("XYZZY".into());
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No video mapping found for gloss: XYZZY");
        assert_eq!(body["token"], "XYZZY");
        assert!(body["timestamp"].is_string());
        assert!(body.get("video_mappings").is_none());
    }

    #[tokio::test]
    async fn test_catalog_outage_is_server_error() {
        let err = MappingError::Catalog(CacheError::Unavailable {
            catalog: "videos".into(),
            consecutive_errors: 4,
            reason: "connection refused".into(),
        });
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["stage"], "catalog");
    }
}
