//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::cache::CacheStatus;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CacheReport {
    pub gloss_catalog: CacheStatus,
    pub video_catalog: CacheStatus,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", "degraded" (a refresh is failing) or "warming" (a catalog never loaded)
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub caches: CacheReport,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let caches = CacheReport {
        gloss_catalog: state.gloss_cache.status().await,
        video_catalog: state.video_cache.status().await,
    };

    Json(HealthResponse {
        status: overall_status(&[&caches.gloss_catalog, &caches.video_catalog]).to_string(),
        module: "signgloss-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        caches,
    })
}

fn overall_status(caches: &[&CacheStatus]) -> &'static str {
    if caches.iter().any(|c| !c.loaded) {
        "warming"
    } else if caches.iter().any(|c| c.consecutive_errors > 0) {
        "degraded"
    } else {
        "ok"
    }
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
