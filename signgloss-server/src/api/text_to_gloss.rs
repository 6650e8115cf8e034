//! POST /api/text-to-gloss

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::types::GlossKey;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TextToGlossRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextToGlossResponse {
    pub original_text: String,
    pub cleaned_text: String,
    pub translated_text: String,
    pub detected_language: String,
    pub gloss: String,
    pub replacements: BTreeMap<String, GlossKey>,
    pub word_count: usize,
    pub skipped_words: Vec<String>,
    pub success: bool,
}

pub async fn text_to_gloss(
    State(state): State<AppState>,
    payload: Result<Json<TextToGlossRequest>, JsonRejection>,
) -> ApiResult<Json<TextToGlossResponse>> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected text-to-gloss body: {}", rejection);
            return Err(ApiError::InvalidText("No text provided".to_string()));
        }
    };
    let text = request
        .text
        .ok_or_else(|| ApiError::InvalidText("No text provided".to_string()))?;
    if text.trim().is_empty() {
        return Err(ApiError::InvalidText("Empty text provided".to_string()));
    }

    let outcome = state.pipeline.resolve(&text).await?;
    info!("Successfully converted text to gloss: {}", outcome.gloss());

    Ok(Json(TextToGlossResponse {
        gloss: outcome.gloss(),
        word_count: outcome.resolved_gloss_sequence.len(),
        original_text: outcome.original_text,
        cleaned_text: outcome.normalized_text,
        translated_text: outcome.translated_text,
        detected_language: outcome.detected_language,
        replacements: outcome.substitutions,
        skipped_words: outcome.unresolved_tokens,
        success: true,
    }))
}

pub fn text_to_gloss_routes() -> Router<AppState> {
    Router::new().route("/api/text-to-gloss", post(text_to_gloss))
}
