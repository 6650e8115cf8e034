//! Immutable catalog snapshot

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::types::GlossKey;

/// One fully loaded view of a catalog
///
/// Entries are kept in a `BTreeMap`, so iteration is lexicographic by key.
/// Fuzzy matching relies on that order for deterministic tie-breaking.
#[derive(Debug)]
pub struct CatalogSnapshot<T> {
    entries: BTreeMap<GlossKey, T>,
    loaded_at: DateTime<Utc>,
}

impl<T> CatalogSnapshot<T> {
    pub fn new(entries: BTreeMap<GlossKey, T>, loaded_at: DateTime<Utc>) -> Self {
        Self { entries, loaded_at }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in lexicographic order
    pub fn keys(&self) -> impl Iterator<Item = &GlossKey> {
        self.entries.keys()
    }
}

impl CatalogSnapshot<()> {
    /// Build a presence-only catalog from raw tokens
    pub fn from_keys<I, S>(keys: I, loaded_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = keys
            .into_iter()
            .filter_map(|k| GlossKey::normalize(k.as_ref()))
            .map(|k| (k, ()))
            .collect();
        Self::new(entries, loaded_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_iterate_lexicographically() {
        let snapshot = CatalogSnapshot::from_keys(["you", "HELLO", "thank", "apple"], Utc::now());
        let keys: Vec<&str> = snapshot.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["APPLE", "HELLO", "THANK", "YOU"]);
    }

    #[test]
    fn test_from_keys_dedupes_normalized_tokens() {
        let loaded_at = Utc::now();
        let snapshot = CatalogSnapshot::from_keys(["hello", "HELLO", "he-llo", "!!"], loaded_at);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.loaded_at(), loaded_at);
        assert!(snapshot.contains("HELLO"));
        assert!(!snapshot.contains("hello"));
    }
}
