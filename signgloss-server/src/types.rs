//! Core catalog types
//!
//! A [`GlossKey`] is the identity of one sign in the catalog: an uppercase,
//! alphanumeric-only token. [`GlossAsset`] is the video metadata attached to a
//! key in the video catalog.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::fmt;

/// Normalized gloss token (uppercase, alphanumeric only)
///
/// Deserializing accepts only values that are already normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GlossKey(String);

impl GlossKey {
    /// Normalize a raw token into a key
    ///
    /// Uppercases and strips every non-alphanumeric character. Returns `None`
    /// when nothing survives the cleanup.
    pub fn normalize(token: &str) -> Option<Self> {
        let cleaned = clean_token(token);
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for GlossKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match Self::normalize(&value) {
            Some(key) if key.0 == value => Ok(key),
            _ => Err(format!("'{}' is not a normalized gloss key", value)),
        }
    }
}

impl From<GlossKey> for String {
    fn from(key: GlossKey) -> Self {
        key.0
    }
}

impl fmt::Display for GlossKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for GlossKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Uppercase a token and drop non-alphanumeric characters
pub fn clean_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Video clip metadata for one gloss
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlossAsset {
    pub gloss: GlossKey,
    /// Object path inside the asset bucket
    pub storage_path: String,
    /// Publicly playable URL
    pub public_url: String,
    pub duration_seconds: f64,
    pub metadata: Map<String, Value>,
}
