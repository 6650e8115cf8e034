//! Upstream service clients
//!
//! Each external collaborator sits behind a trait so the cache and the
//! pipeline can be exercised with in-process fakes:
//! - [`CatalogSource`](crate::cache::CatalogSource): document store bulk reads
//! - [`Translator`]: language detection + translation
//! - [`GlossGenerator`]: generative text-to-gloss model

pub mod document_store;
pub mod generator;
pub mod translation;

pub use document_store::{DocumentStoreClient, GlossKeySource, VideoAssetSource};
pub use generator::{GeminiClient, GlossGenerator};
pub use translation::{CloudTranslateClient, Translator};

use std::time::Duration;
use thiserror::Error;

pub(crate) const USER_AGENT: &str = concat!("signgloss/", env!("CARGO_PKG_VERSION"));
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised by upstream HTTP services
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(HTTP_TIMEOUT)
        } else if err.is_decode() {
            UpstreamError::Parse(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

/// Build the shared reqwest client used by every upstream client
pub(crate) fn http_client() -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| UpstreamError::Network(e.to_string()))
}

/// Turn a non-success response into `UpstreamError::Api`
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Api(status.as_u16(), body))
}
