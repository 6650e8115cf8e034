//! Document store client and catalog sources
//!
//! The store exposes collections of JSON documents keyed by id. Only paginated
//! bulk enumeration is used; every read of a single gloss goes through the
//! in-process cache.
//!
//! Both catalogs are read from here:
//! - [`GlossKeySource`]: document ids only (gloss-validity catalog)
//! - [`VideoAssetSource`]: documents mapped to [`GlossAsset`] (video catalog)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use signgloss_common::config::{AssetsConfig, DocumentStoreConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{check_status, http_client, UpstreamError};
use crate::cache::CatalogSource;
use crate::types::{GlossAsset, GlossKey};

/// One stored document
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DocumentPage {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// HTTP client for the document store
pub struct DocumentStoreClient {
    http_client: reqwest::Client,
    base_url: String,
    page_size: u32,
    access_token: Option<String>,
}

impl DocumentStoreClient {
    pub fn new(
        config: &DocumentStoreConfig,
        access_token: Option<String>,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            http_client: http_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.max(1),
            access_token,
        })
    }

    /// Enumerate every document in `collection`, following page tokens
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, UpstreamError> {
        let url = format!("{}/collections/{}/documents", self.base_url, collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .query(&[("page_size", self.page_size.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("page_token", token)]);
            }
            if let Some(access_token) = &self.access_token {
                request = request.bearer_auth(access_token);
            }

            debug!(collection = %collection, page_token = ?page_token, "Fetching document page");

            let response = check_status(request.send().await?).await?;
            let page: DocumentPage = response
                .json()
                .await
                .map_err(|e| UpstreamError::Parse(e.to_string()))?;

            documents.extend(page.documents);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) if page_token.as_deref() == Some(next.as_str()) => {
                    return Err(UpstreamError::Parse(format!(
                        "document store repeated page token '{}'",
                        next
                    )));
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(collection = %collection, "Fetched {} documents", documents.len());
        Ok(documents)
    }
}

/// Gloss-validity catalog: the set of document ids
pub struct GlossKeySource {
    client: Arc<DocumentStoreClient>,
    collection: String,
}

impl GlossKeySource {
    pub fn new(client: Arc<DocumentStoreClient>, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl CatalogSource<()> for GlossKeySource {
    async fn load(&self) -> Result<BTreeMap<GlossKey, ()>, UpstreamError> {
        let documents = self.client.list_documents(&self.collection).await?;
        let mut keys = BTreeMap::new();
        for doc in &documents {
            let Some(key) = GlossKey::normalize(&doc.id) else {
                continue;
            };
            if keys.contains_key(&key) {
                warn!("Document '{}' collides with an earlier id as gloss {}", doc.id, key);
                continue;
            }
            keys.insert(key, ());
        }
        Ok(keys)
    }
}

/// Video catalog: documents describing clips in the asset bucket
pub struct VideoAssetSource {
    client: Arc<DocumentStoreClient>,
    collection: String,
    public_base_url: String,
}

impl VideoAssetSource {
    pub fn new(
        client: Arc<DocumentStoreClient>,
        collection: impl Into<String>,
        assets: &AssetsConfig,
    ) -> Self {
        Self {
            client,
            collection: collection.into(),
            public_base_url: assets.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Map one document to an asset; `None` when it has no usable video path
    fn to_asset(&self, doc: &Document) -> Option<GlossAsset> {
        let gloss = GlossKey::normalize(&doc.id)?;
        let storage_path = doc.data.get("video_path").and_then(Value::as_str)?;
        if storage_path.trim().is_empty() {
            return None;
        }

        let duration_seconds = doc
            .data
            .get("duration")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .max(0.0);
        let metadata = doc
            .data
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Some(GlossAsset {
            gloss,
            public_url: format!(
                "{}/{}",
                self.public_base_url,
                storage_path.trim_start_matches('/')
            ),
            storage_path: storage_path.to_string(),
            duration_seconds,
            metadata,
        })
    }
}

#[async_trait]
impl CatalogSource<GlossAsset> for VideoAssetSource {
    async fn load(&self) -> Result<BTreeMap<GlossKey, GlossAsset>, UpstreamError> {
        let documents = self.client.list_documents(&self.collection).await?;
        let mut assets = BTreeMap::new();
        for doc in &documents {
            match self.to_asset(doc) {
                Some(asset) if assets.contains_key(&asset.gloss) => warn!(
                    "Document '{}' collides with an earlier id as gloss {}, keeping the first",
                    doc.id, asset.gloss
                ),
                Some(asset) => {
                    assets.insert(asset.gloss.clone(), asset);
                }
                None => warn!("Skipping document '{}' without a video_path", doc.id),
            }
        }
        Ok(assets)
    }
}
