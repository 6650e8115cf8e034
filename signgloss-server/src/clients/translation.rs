//! Translation service client
//!
//! Speaks the Cloud Translation v3 REST shape: `:detectLanguage` and
//! `:translateText` under `projects/{project}/locations/{location}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use signgloss_common::config::TranslationConfig;
use tracing::{debug, info};

use super::{check_status, http_client, UpstreamError};

/// Language detection and translation
#[async_trait]
pub trait Translator: Send + Sync {
    /// Detect the language code of `text` (e.g. "en", "zh-TW")
    async fn detect_language(&self, text: &str) -> Result<String, UpstreamError>;

    /// Translate `text` from `source` into `target`
    async fn translate(&self, text: &str, source: &str, target: &str)
        -> Result<String, UpstreamError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectRequest<'a> {
    content: &'a str,
    mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    languages: Vec<DetectedLanguage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectedLanguage {
    language_code: String,
    #[serde(default)]
    confidence: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    contents: [&'a str; 1],
    mime_type: &'static str,
    source_language_code: &'a str,
    target_language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// HTTP translation client
pub struct CloudTranslateClient {
    http_client: reqwest::Client,
    base_url: String,
    parent: String,
    access_token: Option<String>,
}

impl CloudTranslateClient {
    pub fn new(
        config: &TranslationConfig,
        access_token: Option<String>,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            http_client: http_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            parent: format!(
                "projects/{}/locations/{}",
                config.project_id, config.location
            ),
            access_token,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v3/{}:{}", self.base_url, self.parent, method)
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, UpstreamError> {
        let mut request = self.http_client.post(self.endpoint(method)).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = check_status(request.send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Translator for CloudTranslateClient {
    async fn detect_language(&self, text: &str) -> Result<String, UpstreamError> {
        debug!("Detecting language for text: {}", text);

        let response: DetectResponse = self
            .post(
                "detectLanguage",
                &DetectRequest {
                    content: text,
                    mime_type: "text/plain",
                },
            )
            .await?;

        let detected = response
            .languages
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::Parse("no language detected".to_string()))?;

        info!(
            "Detected language: {} (confidence {:.2})",
            detected.language_code, detected.confidence
        );
        Ok(detected.language_code)
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, UpstreamError> {
        let response: TranslateResponse = self
            .post(
                "translateText",
                &TranslateRequest {
                    contents: [text],
                    mime_type: "text/plain",
                    source_language_code: source,
                    target_language_code: target,
                },
            )
            .await?;

        let translated = response
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| UpstreamError::Parse("empty translation response".to_string()))?;

        info!("Translation successful: {}", translated);
        Ok(translated)
    }
}
