//! Generative model client
//!
//! Calls the Gemini `generateContent` REST endpoint and returns the
//! concatenated text of the first candidate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use signgloss_common::config::GeneratorConfig;
use tracing::debug;

use super::{check_status, http_client, UpstreamError};

/// Text generation backend used for the text-to-gloss step
#[async_trait]
pub trait GlossGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    candidate_count: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini REST client
pub struct GeminiClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: &GeneratorConfig, api_key: String) -> Result<Self, UpstreamError> {
        Ok(Self {
            http_client: http_client()?,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
            generation_config: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
                candidate_count: 1,
            },
        })
    }
}

#[async_trait]
impl GlossGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: self.generation_config.clone(),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let response: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(UpstreamError::Parse(
                "model returned no candidate text".to_string(),
            ));
        }

        debug!("Model response: {}", text.trim());
        Ok(text)
    }
}
