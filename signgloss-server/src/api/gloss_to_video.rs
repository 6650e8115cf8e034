//! POST /api/gloss-to-video

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{timestamp, ApiError, ApiResult};
use crate::types::GlossAsset;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GlossToVideoRequest {
    pub gloss: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoMapping {
    pub gloss: String,
    pub video_path: String,
    pub video_url: String,
    pub duration: f64,
    pub metadata: Map<String, Value>,
}

impl VideoMapping {
    fn new(gloss: String, asset: GlossAsset) -> Self {
        Self {
            gloss,
            video_path: asset.storage_path,
            video_url: asset.public_url,
            duration: asset.duration_seconds,
            metadata: asset.metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GlossToVideoResponse {
    pub video_mappings: Vec<VideoMapping>,
    pub total_clips: usize,
    pub timestamp: String,
}

pub async fn gloss_to_video(
    State(state): State<AppState>,
    payload: Result<Json<GlossToVideoRequest>, JsonRejection>,
) -> ApiResult<Json<GlossToVideoResponse>> {
    let gloss = match payload {
        Ok(Json(GlossToVideoRequest { gloss: Some(gloss) })) => gloss,
        Ok(_) => return Err(ApiError::InvalidGloss("No ASL gloss provided".to_string())),
        Err(rejection) => {
            debug!("Rejected gloss-to-video body: {}", rejection);
            return Err(ApiError::InvalidGloss("No ASL gloss provided".to_string()));
        }
    };

    let tokens: Vec<String> = gloss.split_whitespace().map(str::to_uppercase).collect();
    if tokens.is_empty() {
        return Err(ApiError::InvalidGloss("Empty gloss provided".to_string()));
    }
    info!("Processing gloss words: {:?}", tokens);

    let assets = state.mapping.resolve_sequence(tokens.as_slice()).await?;
    let video_mappings: Vec<VideoMapping> = tokens
        .into_iter()
        .zip(assets)
        .map(|(token, asset)| VideoMapping::new(token, asset))
        .collect();

    Ok(Json(GlossToVideoResponse {
        total_clips: video_mappings.len(),
        video_mappings,
        timestamp: timestamp(),
    }))
}

pub fn gloss_to_video_routes() -> Router<AppState> {
    Router::new().route("/api/gloss-to-video", post(gloss_to_video))
}
