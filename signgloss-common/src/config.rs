//! Configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument / `SIGNGLOSS_CONFIG` (highest priority)
//! 2. User config file (`~/.config/signgloss/config.toml`)
//! 3. System config file (`/etc/signgloss/config.toml`, Linux only)
//! 4. Compiled defaults (fallback)
//!
//! A missing implicit config file is not an error: loading reports
//! [`ConfigSource::Defaults`] and the service warns once logging is up. An explicitly requested file that is missing or
//! malformed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub document_store: DocumentStoreConfig,
    pub assets: AssetsConfig,
    pub translation: TranslationConfig,
    pub generator: GeneratorConfig,
    pub pipeline: PipelineConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind (host:port)
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5740".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Self-healing catalog cache policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base staleness interval before a refresh is attempted
    pub refresh_interval_hours: u32,
    /// Snapshots smaller than this are rejected as partial loads
    pub min_items: usize,
    /// Consecutive failed refreshes tolerated while serving the last good snapshot
    pub max_errors: u32,
    /// Deadline for one bulk load from the document store
    pub load_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_hours: 24,
            min_items: 100,
            max_errors: 3,
            load_timeout_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.refresh_interval_hours))
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

/// Document store holding the gloss catalog collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    pub base_url: String,
    /// Collection whose document ids form the gloss-validity catalog
    pub gloss_collection: String,
    /// Collection whose documents describe video assets
    pub video_collection: String,
    pub page_size: u32,
    pub access_token: Option<String>,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/v1".to_string(),
            gloss_collection: "asl_mappings".to_string(),
            video_collection: "asl_mappings".to_string(),
            page_size: 300,
            access_token: None,
        }
    }
}

/// Public object store serving the video clips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Prefix joined with each asset's storage path to form its public URL
    pub public_base_url: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            public_base_url: "https://storage.googleapis.com/genasl-video-files".to_string(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub base_url: String,
    pub project_id: String,
    pub location: String,
    pub access_token: Option<String>,
    /// Language every input is translated into before gloss generation
    pub canonical_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translation.googleapis.com".to_string(),
            project_id: "genasl".to_string(),
            location: "global".to_string(),
            access_token: None,
            canonical_language: "en".to_string(),
        }
    }
}

/// Generative text-to-gloss model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            api_key: None,
            temperature: 0.1,
            top_p: 0.8,
            top_k: 20,
            max_output_tokens: 100,
        }
    }
}

/// Resolution pipeline tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fuzzy matches must score strictly above this (0-100)
    pub match_threshold: u8,
    /// Deadline applied to each upstream call
    pub stage_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_threshold: 80,
            stage_timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read TOML failed ({}): {}", path.display(), e))
        })?;
        Self::parse(&content)
    }
}

/// Locates the configuration file following the priority order above
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    explicit: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl ConfigResolver {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            search_paths: default_search_paths(),
        }
    }

    /// Override the implicit search locations
    pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
        self.search_paths = search_paths;
        self
    }

    /// Resolve the config file to read, if any
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }

    /// Load the resolved configuration, degrading to defaults when no implicit file exists
    pub fn load(&self) -> Result<TomlConfig> {
        self.load_with_source().map(|(config, _)| config)
    }

    /// Load the configuration and report where it came from
    ///
    /// Nothing is logged here since this runs before the subscriber exists;
    /// callers log the returned [`ConfigSource`] once tracing is up.
    pub fn load_with_source(&self) -> Result<(TomlConfig, ConfigSource)> {
        if let Some(path) = &self.explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok((TomlConfig::load(path)?, ConfigSource::File(path.clone())));
        }

        match self.resolve() {
            Some(path) => Ok((TomlConfig::load(&path)?, ConfigSource::File(path))),
            None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
        }
    }
}

/// Origin of a loaded configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No config file was found; compiled defaults are in effect
    Defaults,
}

/// Platform config file locations, user first
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("signgloss").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/signgloss/config.toml"));
    }
    paths
}

/// Validate secret value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a secret: the first valid environment variable wins, then the TOML value
pub fn resolve_secret(env_vars: &[&str], toml_value: Option<&str>) -> Option<String> {
    for name in env_vars {
        if let Ok(value) = std::env::var(name) {
            if is_valid_key(&value) {
                info!("{} loaded from environment", name);
                return Some(value.trim().to_string());
            }
        }
    }

    toml_value
        .filter(|value| is_valid_key(value))
        .map(|value| value.trim().to_string())
}
