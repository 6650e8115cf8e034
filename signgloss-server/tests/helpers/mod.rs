//! In-process fakes for the upstream services

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Map;
use signgloss_common::ManualClock;
use signgloss_server::cache::{CatalogSource, RefreshPolicy, SelfHealingCache};
use signgloss_server::clients::{GlossGenerator, Translator, UpstreamError};
use signgloss_server::pipeline::{PipelineSettings, ResolutionPipeline};
use signgloss_server::types::{GlossAsset, GlossKey};
use signgloss_server::{build_router, AppState};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Catalog source serving a fixed key list; can be switched into an outage
pub struct FixedSource {
    keys: Vec<String>,
    down: AtomicBool,
}

impl FixedSource {
    pub fn new(keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            down: AtomicBool::new(false),
        })
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn keys(&self) -> Result<Vec<GlossKey>, UpstreamError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(UpstreamError::Network("connection refused".into()));
        }
        Ok(self.keys.iter().filter_map(|k| GlossKey::normalize(k)).collect())
    }
}

#[async_trait]
impl CatalogSource<()> for FixedSource {
    async fn load(&self) -> Result<BTreeMap<GlossKey, ()>, UpstreamError> {
        Ok(self.keys()?.into_iter().map(|k| (k, ())).collect())
    }
}

#[async_trait]
impl CatalogSource<GlossAsset> for FixedSource {
    async fn load(&self) -> Result<BTreeMap<GlossKey, GlossAsset>, UpstreamError> {
        Ok(self
            .keys()?
            .into_iter()
            .map(|gloss| {
                let mut metadata = Map::new();
                metadata.insert("source".into(), "test".into());
                let asset = GlossAsset {
                    storage_path: format!("{}.mp4", gloss),
                    public_url: format!("https://cdn.example.org/videos/{}.mp4", gloss),
                    duration_seconds: 1.5,
                    metadata,
                    gloss: gloss.clone(),
                };
                (gloss, asset)
            })
            .collect())
    }
}

/// Reports English for ASCII text, "zh-TW" otherwise; translates to "thank you"
pub struct FakeTranslator;

#[async_trait]
impl Translator for FakeTranslator {
    async fn detect_language(&self, text: &str) -> Result<String, UpstreamError> {
        Ok(if text.is_ascii() { "en" } else { "zh-TW" }.to_string())
    }

    async fn translate(
        &self,
        _text: &str,
        _source: &str,
        _target: &str,
    ) -> Result<String, UpstreamError> {
        Ok("thank you".to_string())
    }
}

/// Echoes the prompt's text line back in capitals
pub struct FakeGenerator;

#[async_trait]
impl GlossGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let text = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Text: "))
            .ok_or_else(|| UpstreamError::Parse("prompt without text".into()))?;
        Ok(text.to_uppercase())
    }
}

pub fn test_policy() -> RefreshPolicy {
    RefreshPolicy {
        min_items: 1,
        ..RefreshPolicy::default()
    }
}

/// Application wired to fakes, plus handles for steering it
pub struct TestApp {
    pub state: AppState,
    pub gloss_source: Arc<FixedSource>,
    pub video_source: Arc<FixedSource>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new(gloss_keys: &[&str], video_keys: &[&str]) -> Self {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let gloss_source = FixedSource::new(gloss_keys);
        let video_source = FixedSource::new(video_keys);

        let gloss_cache = Arc::new(
            SelfHealingCache::<()>::new("gloss_catalog", gloss_source.clone(), test_policy())
                .with_clock(clock.clone()),
        );
        let video_cache = Arc::new(
            SelfHealingCache::<GlossAsset>::new(
                "video_catalog",
                video_source.clone(),
                test_policy(),
            )
            .with_clock(clock.clone()),
        );

        let pipeline = ResolutionPipeline::new(
            Arc::clone(&gloss_cache),
            Arc::new(FakeTranslator),
            Arc::new(FakeGenerator),
            PipelineSettings::default(),
        );

        Self {
            state: AppState::new(pipeline, gloss_cache, video_cache),
            gloss_source,
            video_source,
            clock,
        }
    }

    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }
}
