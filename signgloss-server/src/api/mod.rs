//! HTTP API handlers

pub mod gloss_to_video;
pub mod health;
pub mod text_to_gloss;

pub use gloss_to_video::gloss_to_video_routes;
pub use health::health_routes;
pub use text_to_gloss::text_to_gloss_routes;
