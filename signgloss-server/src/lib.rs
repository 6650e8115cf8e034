//! signgloss-server - text-to-gloss and gloss-to-video service
//!
//! Two endpoints share a pair of self-healing catalog caches:
//! - `POST /api/text-to-gloss`: free text -> validated gloss sequence
//! - `POST /api/gloss-to-video`: gloss sequence -> ordered video clips
//!
//! The caches are built once by the entry point and injected through
//! [`AppState`].

pub mod api;
pub mod cache;
pub mod clients;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod resolver;
pub mod types;

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cache::SelfHealingCache;
use pipeline::ResolutionPipeline;
use resolver::MappingResolver;
use types::GlossAsset;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResolutionPipeline>,
    pub mapping: Arc<MappingResolver>,
    /// Gloss-validity catalog (also held by the pipeline)
    pub gloss_cache: Arc<SelfHealingCache<()>>,
    /// Video catalog (also held by the mapping resolver)
    pub video_cache: Arc<SelfHealingCache<GlossAsset>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        pipeline: ResolutionPipeline,
        gloss_cache: Arc<SelfHealingCache<()>>,
        video_cache: Arc<SelfHealingCache<GlossAsset>>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            mapping: Arc::new(MappingResolver::new(Arc::clone(&video_cache))),
            gloss_cache,
            video_cache,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::text_to_gloss_routes())
        .merge(api::gloss_to_video_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
