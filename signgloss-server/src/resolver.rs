//! Gloss-to-video mapping

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheError, SelfHealingCache};
use crate::types::GlossAsset;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("No video mapping found for gloss: {0}")]
    UnknownGloss(String),

    #[error(transparent)]
    Catalog(#[from] CacheError),
}

/// Maps gloss tokens to their video assets
pub struct MappingResolver {
    video_cache: Arc<SelfHealingCache<GlossAsset>>,
}

impl MappingResolver {
    pub fn new(video_cache: Arc<SelfHealingCache<GlossAsset>>) -> Self {
        Self { video_cache }
    }

    /// Resolve every token in order, failing on the first unknown one
    ///
    /// Tokens are uppercased and looked up verbatim; punctuation is not
    /// stripped, so `HELLO!` is an unknown gloss.
    ///
    /// Repeated tokens are resolved independently, so the output has exactly
    /// one asset per input token. No partial result is returned on failure.
    pub async fn resolve_sequence<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> Result<Vec<GlossAsset>, MappingError> {
        let catalog = self.video_cache.all().await?;

        let mut assets = Vec::with_capacity(tokens.len());
        for token in tokens {
            let key = token.as_ref().to_uppercase();
            match catalog.get(&key) {
                Some(asset) => {
                    debug!("Found video for gloss '{}': {}", key, asset.storage_path);
                    assets.push(asset.clone());
                }
                None => {
                    warn!("No video mapping found for gloss: {}", key);
                    return Err(MappingError::UnknownGloss(key));
                }
            }
        }
        Ok(assets)
    }

    /// Split a space-separated gloss string and resolve it
    pub async fn resolve_text(&self, gloss: &str) -> Result<Vec<GlossAsset>, MappingError> {
        let tokens: Vec<&str> = gloss.split_whitespace().collect();
        self.resolve_sequence(tokens.as_slice()).await
    }
}
