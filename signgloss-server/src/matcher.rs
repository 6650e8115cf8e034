//! Gloss matching against a catalog snapshot
//!
//! Exact keys short-circuit. Anything else is scored against every catalog key
//! with an indel similarity ratio (0-100) and the best candidate scoring
//! strictly above the threshold wins. Keys are scanned in lexicographic order,
//! so equal scores always resolve to the alphabetically first key.

use rapidfuzz::fuzz;
use tracing::debug;

use crate::cache::CatalogSnapshot;
use crate::types::GlossKey;

pub const DEFAULT_MATCH_THRESHOLD: u8 = 80;

/// How a token was matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlossMatch {
    /// Token is a catalog key verbatim
    Exact(GlossKey),
    /// Closest catalog key and its similarity score
    Fuzzy { key: GlossKey, score: u8 },
}

impl GlossMatch {
    pub fn key(&self) -> &GlossKey {
        match self {
            GlossMatch::Exact(key) => key,
            GlossMatch::Fuzzy { key, .. } => key,
        }
    }

    pub fn into_key(self) -> GlossKey {
        match self {
            GlossMatch::Exact(key) => key,
            GlossMatch::Fuzzy { key, .. } => key,
        }
    }
}

/// Resolves free tokens to catalog keys
#[derive(Debug, Clone, Copy)]
pub struct GlossMatcher {
    threshold: u8,
}

impl Default for GlossMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl GlossMatcher {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Find the catalog key for `token`, if any clears the threshold
    pub fn find<T>(&self, token: &str, snapshot: &CatalogSnapshot<T>) -> Option<GlossMatch> {
        let cleaned = GlossKey::normalize(token)?;

        if snapshot.contains(cleaned.as_str()) {
            return Some(GlossMatch::Exact(cleaned));
        }

        let mut best: Option<(&GlossKey, u8)> = None;
        for key in snapshot.keys() {
            let score = similarity_ratio(cleaned.as_str(), key.as_str());
            if score <= self.threshold {
                continue;
            }
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((key, score));
            }
        }

        match best {
            Some((key, score)) => {
                debug!("Found fuzzy match for '{}': '{}' with ratio {}", cleaned, key, score);
                Some(GlossMatch::Fuzzy {
                    key: key.clone(),
                    score,
                })
            }
            None => {
                debug!("No suitable match found for word: {}", cleaned);
                None
            }
        }
    }
}

/// Case-insensitive indel similarity scaled to 0-100
///
/// `round(100 * (|a| + |b| - indel(a, b)) / (|a| + |b|))`, where `indel` counts
/// the insertions and deletions needed to turn `a` into `b`. An empty side
/// scores 0.
pub fn similarity_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let a = a.to_uppercase();
    let b = b.to_uppercase();
    (fuzz::ratio(a.chars(), b.chars()) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(keys: &[&str]) -> CatalogSnapshot<()> {
        CatalogSnapshot::from_keys(keys.iter().copied(), Utc::now())
    }

    #[test]
    fn test_ratio_reference_values() {
        assert_eq!(similarity_ratio("HELLO", "HELLO"), 100);
        assert_eq!(similarity_ratio("HELO", "HELLO"), 89);
        assert_eq!(similarity_ratio("ABC", "XYZ"), 0);
        assert_eq!(similarity_ratio("THANK", "THINK"), 80);
        assert_eq!(similarity_ratio("", ""), 0);
        assert_eq!(similarity_ratio("HELLO", ""), 0);
    }

    #[test]
    fn test_ratio_is_symmetric_and_case_insensitive() {
        assert_eq!(similarity_ratio("helo", "HELLO"), similarity_ratio("HELLO", "helo"));
        assert_eq!(similarity_ratio("Mother", "MOTHER"), 100);
    }

    #[test]
    fn test_exact_token_short_circuits() {
        let catalog = snapshot(&["HELLO", "HELL", "HELLOS"]);
        let matcher = GlossMatcher::default();

        assert_eq!(
            matcher.find("hello", &catalog),
            Some(GlossMatch::Exact(GlossKey::normalize("HELLO").unwrap()))
        );
        assert_eq!(
            matcher.find("he-llo!", &catalog),
            Some(GlossMatch::Exact(GlossKey::normalize("HELLO").unwrap()))
        );
    }

    #[test]
    fn test_typo_resolves_to_fuzzy_match() {
        let catalog = snapshot(&["HELLO"]);
        let found = GlossMatcher::default().find("HELO", &catalog).unwrap();

        assert_eq!(found.key().as_str(), "HELLO");
        assert!(matches!(found, GlossMatch::Fuzzy { score: 89, .. }));
    }

    #[test]
    fn test_score_at_threshold_is_rejected() {
        // THANK vs THINK scores exactly 80
        let catalog = snapshot(&["THINK"]);
        assert_eq!(GlossMatcher::default().find("THANK", &catalog), None);
        assert!(GlossMatcher::new(79).find("THANK", &catalog).is_some());
    }

    #[test]
    fn test_unrelated_token_has_no_match() {
        let catalog = snapshot(&["HELLO", "THANK", "YOU"]);
        assert_eq!(GlossMatcher::default().find("XYZZY", &catalog), None);
        assert_eq!(GlossMatcher::default().find("!!!", &catalog), None);
    }

    #[test]
    fn test_highest_score_wins() {
        // HOUSES vs HOUSE scores 91, vs HORSES 83
        let catalog = snapshot(&["HORSES", "HOUSE"]);
        let found = GlossMatcher::default().find("HOUSES", &catalog).unwrap();
        assert_eq!(found.into_key().as_str(), "HOUSE");
    }

    #[test]
    fn test_ties_resolve_lexicographically() {
        let catalog = snapshot(&["BATS", "CAT", "BATH"]);
        assert_eq!(similarity_ratio("BAT", "BATS"), 86);
        assert_eq!(similarity_ratio("BAT", "BATH"), 86);

        let found = GlossMatcher::default().find("bat", &catalog).unwrap();
        assert_eq!(found.key().as_str(), "BATH");
    }

    #[test]
    fn test_find_is_idempotent() {
        let catalog = snapshot(&["HELLO", "HELP", "HELMET"]);
        let matcher = GlossMatcher::default();
        let first = matcher.find("HELPP", &catalog);
        for _ in 0..5 {
            assert_eq!(matcher.find("HELPP", &catalog), first);
        }
    }
}
