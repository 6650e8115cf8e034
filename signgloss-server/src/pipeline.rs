//! Text-to-gloss resolution pipeline
//!
//! normalize -> detect/translate -> generate candidates -> resolve each token
//! against the gloss catalog. Every upstream call runs under the configured
//! stage deadline, and the whole request resolves against one catalog snapshot.

use serde::Serialize;
use signgloss_common::config::{PipelineConfig, TranslationConfig};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheError, SelfHealingCache};
use crate::clients::{GlossGenerator, Translator, UpstreamError};
use crate::matcher::{GlossMatch, GlossMatcher, DEFAULT_MATCH_THRESHOLD};
use crate::types::GlossKey;

/// Pipeline step, reported on failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Translation,
    Generation,
    Catalog,
    Resolution,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Translation => "translation",
            Stage::Generation => "generation",
            Stage::Catalog => "catalog",
            Stage::Resolution => "resolution",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Text is empty after normalization")]
    EmptyInput,

    #[error("{stage} failed: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: UpstreamError,
    },

    #[error(transparent)]
    Catalog(#[from] CacheError),

    #[error("No valid ASL glosses found for the input text")]
    NoResolvableGloss { unresolved: Vec<String> },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::EmptyInput => Stage::Input,
            PipelineError::Upstream { stage, .. } => *stage,
            PipelineError::Catalog(_) => Stage::Catalog,
            PipelineError::NoResolvableGloss { .. } => Stage::Resolution,
        }
    }
}

/// Result of one successful resolution, with provenance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionOutcome {
    pub original_text: String,
    pub normalized_text: String,
    pub detected_language: String,
    pub translated_text: String,
    pub resolved_gloss_sequence: Vec<GlossKey>,
    /// Candidate token -> catalog key it was corrected to
    pub substitutions: BTreeMap<String, GlossKey>,
    pub unresolved_tokens: Vec<String>,
}

impl ResolutionOutcome {
    /// Space-joined gloss sequence
    pub fn gloss(&self) -> String {
        self.resolved_gloss_sequence
            .iter()
            .map(GlossKey::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Tunables for [`ResolutionPipeline`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub match_threshold: u8,
    pub stage_timeout: Duration,
    /// Language the generator expects (translation target)
    pub canonical_language: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            stage_timeout: Duration::from_secs(30),
            canonical_language: "en".to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(pipeline: &PipelineConfig, translation: &TranslationConfig) -> Self {
        Self {
            match_threshold: pipeline.match_threshold,
            stage_timeout: pipeline.stage_timeout(),
            canonical_language: translation.canonical_language.clone(),
        }
    }
}

pub struct ResolutionPipeline {
    gloss_cache: Arc<SelfHealingCache<()>>,
    translator: Arc<dyn Translator>,
    generator: Arc<dyn GlossGenerator>,
    matcher: GlossMatcher,
    settings: PipelineSettings,
}

impl ResolutionPipeline {
    pub fn new(
        gloss_cache: Arc<SelfHealingCache<()>>,
        translator: Arc<dyn Translator>,
        generator: Arc<dyn GlossGenerator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            gloss_cache,
            translator,
            generator,
            matcher: GlossMatcher::new(settings.match_threshold),
            settings,
        }
    }

    /// Turn free text into a sequence of catalog glosses
    pub async fn resolve(&self, raw_text: &str) -> Result<ResolutionOutcome, PipelineError> {
        let normalized_text = normalize_text(raw_text);
        if normalized_text.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        info!("Processing text: {}", normalized_text);

        let (detected_language, translated_text) = self.to_canonical(&normalized_text).await?;

        let prompt = gloss_prompt(&translated_text);
        let generated = self
            .with_deadline(Stage::Generation, self.generator.generate(&prompt))
            .await?;
        let candidates: Vec<String> = generated
            .to_uppercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        debug!("Candidate gloss: {:?}", candidates);

        let catalog = self.gloss_cache.all().await?;

        let mut resolved_gloss_sequence = Vec::new();
        let mut substitutions = BTreeMap::new();
        let mut unresolved_tokens = Vec::new();

        for candidate in &candidates {
            let Some(token) = GlossKey::normalize(candidate) else {
                continue;
            };
            match self.matcher.find(token.as_str(), &catalog) {
                Some(GlossMatch::Exact(key)) => resolved_gloss_sequence.push(key),
                Some(GlossMatch::Fuzzy { key, score }) => {
                    info!("Replaced '{}' with '{}' (ratio {})", token, key, score);
                    substitutions.insert(token.into_string(), key.clone());
                    resolved_gloss_sequence.push(key);
                }
                None => {
                    warn!("Skipping word '{}': not in gloss catalog", token);
                    unresolved_tokens.push(token.into_string());
                }
            }
        }

        if resolved_gloss_sequence.is_empty() {
            return Err(PipelineError::NoResolvableGloss {
                unresolved: unresolved_tokens,
            });
        }

        let outcome = ResolutionOutcome {
            original_text: raw_text.to_string(),
            normalized_text,
            detected_language,
            translated_text,
            resolved_gloss_sequence,
            substitutions,
            unresolved_tokens,
        };
        info!("Final gloss: {}", outcome.gloss());
        Ok(outcome)
    }

    /// Detect the language and translate into the canonical language if needed
    async fn to_canonical(&self, text: &str) -> Result<(String, String), PipelineError> {
        let detected = self
            .with_deadline(Stage::Translation, self.translator.detect_language(text))
            .await?;

        if same_language(&detected, &self.settings.canonical_language) {
            return Ok((detected, text.to_string()));
        }

        let translated = self
            .with_deadline(
                Stage::Translation,
                self.translator
                    .translate(text, &detected, &self.settings.canonical_language),
            )
            .await?;
        Ok((detected, translated))
    }

    async fn with_deadline<T, F>(&self, stage: Stage, call: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        let source = match tokio::time::timeout(self.settings.stage_timeout, call).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => UpstreamError::Timeout(self.settings.stage_timeout),
        };
        warn!("{} stage failed: {}", stage, source);
        Err(PipelineError::Upstream { stage, source })
    }
}

/// Collapse whitespace and drop characters outside the input allow-list
pub fn normalize_text(text: &str) -> String {
    let filtered: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|&c| is_allowed(c))
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, ' ' | '.' | ',' | '!' | '?')
        || ('\u{4E00}'..='\u{9FFF}').contains(&c)
        || ('\u{3040}'..='\u{309F}').contains(&c)
        || ('\u{30A0}'..='\u{30FF}').contains(&c)
}

/// Compare primary language subtags ("en-US" == "en")
fn same_language(a: &str, b: &str) -> bool {
    let primary = |tag: &str| tag.split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase();
    primary(a) == primary(b)
}

fn gloss_prompt(english: &str) -> String {
    format!(
        "Convert to ASL gloss notation. Rules:\n\
         1. ALL CAPS\n\
         2. Keep: nouns, verbs, adjectives, AND/OR/BUT\n\
         3. Remove: a/an/the, unnecessary prepositions\n\
         4. Original word order\n\
         5. Space between words\n\
         6. No punctuation\n\
         \n\
         Text: {}\n\
         \n\
         Return ONLY gloss words.",
        english
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CatalogSource, RefreshPolicy};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Catalog(Vec<&'static str>);

    #[async_trait]
    impl CatalogSource<()> for Catalog {
        async fn load(&self) -> Result<BTreeMap<GlossKey, ()>, UpstreamError> {
            Ok(self
                .0
                .iter()
                .filter_map(|k| GlossKey::normalize(k))
                .map(|k| (k, ()))
                .collect())
        }
    }

    /// Reports `language`; translation fails when `fail` is set
    struct StubTranslator {
        language: &'static str,
        fail: bool,
        translated: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Translator for StubTranslator {
        async fn detect_language(&self, _text: &str) -> Result<String, UpstreamError> {
            Ok(self.language.to_string())
        }

        async fn translate(
            &self,
            text: &str,
            _source: &str,
            _target: &str,
        ) -> Result<String, UpstreamError> {
            if self.fail {
                return Err(UpstreamError::Api(503, "unavailable".into()));
            }
            self.translated.lock().unwrap().push(text.to_string());
            Ok("thank you".to_string())
        }
    }

    struct StubGenerator {
        reply: &'static str,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl GlossGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
            assert!(prompt.contains("Return ONLY gloss words."));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.reply.to_string())
        }
    }

    fn translator(language: &'static str) -> Arc<StubTranslator> {
        Arc::new(StubTranslator {
            language,
            fail: false,
            translated: Mutex::new(Vec::new()),
        })
    }

    fn pipeline_with(
        keys: Vec<&'static str>,
        translator: Arc<dyn Translator>,
        generator: StubGenerator,
    ) -> ResolutionPipeline {
        let policy = RefreshPolicy {
            min_items: 1,
            ..RefreshPolicy::default()
        };
        let cache = Arc::new(SelfHealingCache::<()>::new(
            "glosses",
            Arc::new(Catalog(keys)),
            policy,
        ));
        ResolutionPipeline::new(
            cache,
            translator,
            Arc::new(generator),
            PipelineSettings::default(),
        )
    }

    fn replying(reply: &'static str) -> StubGenerator {
        StubGenerator { reply, delay: None }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Hello,\n\tworld!  "), "Hello, world!");
        assert_eq!(normalize_text("I'm #1 @home"), "Im 1 home");
        assert_eq!(normalize_text("謝謝你 ありがとう カタカナ"), "謝謝你 ありがとう カタカナ");
        assert_eq!(normalize_text("café"), "caf");
        assert_eq!(normalize_text("@#$"), "");
    }

    #[test]
    fn test_same_language_uses_primary_subtag() {
        assert!(same_language("en", "en"));
        assert!(same_language("EN-us", "en"));
        assert!(!same_language("zh-TW", "en"));
    }

    #[tokio::test]
    async fn test_exact_tokens_resolve() {
        let pipeline = pipeline_with(
            vec!["HELLO", "THANK", "YOU"],
            translator("en"),
            replying("thank you\n"),
        );

        let outcome = pipeline.resolve("Thank you").await.unwrap();
        assert_eq!(outcome.gloss(), "THANK YOU");
        assert_eq!(outcome.detected_language, "en");
        assert_eq!(outcome.translated_text, "Thank you");
        assert!(outcome.substitutions.is_empty());
        assert!(outcome.unresolved_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_typo_is_substituted() {
        let pipeline = pipeline_with(vec!["HELLO"], translator("en"), replying("HELO"));

        let outcome = pipeline.resolve("helo").await.unwrap();
        assert_eq!(outcome.gloss(), "HELLO");
        assert_eq!(outcome.substitutions.len(), 1);
        assert_eq!(outcome.substitutions["HELO"].as_str(), "HELLO");
    }

    #[tokio::test]
    async fn test_unknown_tokens_are_skipped() {
        let pipeline = pipeline_with(
            vec!["HELLO", "FRIEND"],
            translator("en"),
            replying("HELLO, XYZZY FRIEND!"),
        );

        let outcome = pipeline.resolve("hello xyzzy friend").await.unwrap();
        assert_eq!(outcome.gloss(), "HELLO FRIEND");
        assert_eq!(outcome.unresolved_tokens, vec!["XYZZY".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let pipeline = pipeline_with(vec!["HELLO"], translator("en"), replying("HELLO"));

        for input in ["", " ", "\n\t", "@@@"] {
            let err = pipeline.resolve(input).await.unwrap_err();
            assert!(matches!(err, PipelineError::EmptyInput));
            assert_eq!(err.stage(), Stage::Input);
        }
    }

    #[tokio::test]
    async fn test_non_canonical_language_is_translated() {
        let translator = translator("zh-TW");
        let pipeline = pipeline_with(
            vec!["THANK", "YOU"],
            translator.clone(),
            replying("THANK YOU"),
        );

        let outcome = pipeline.resolve("謝謝你").await.unwrap();
        assert_eq!(outcome.detected_language, "zh-TW");
        assert_eq!(outcome.translated_text, "thank you");
        assert_eq!(outcome.gloss(), "THANK YOU");
        assert_eq!(*translator.translated.lock().unwrap(), vec!["謝謝你".to_string()]);
    }

    #[tokio::test]
    async fn test_translation_failure_names_stage() {
        let translator = Arc::new(StubTranslator {
            language: "fr",
            fail: true,
            translated: Mutex::new(Vec::new()),
        });
        let pipeline = pipeline_with(vec!["HELLO"], translator, replying("HELLO"));

        let err = pipeline.resolve("bonjour").await.unwrap_err();
        assert_eq!(err.stage(), Stage::Translation);
        assert!(matches!(
            err,
            PipelineError::Upstream { source: UpstreamError::Api(503, _), .. }
        ));
    }

    #[tokio::test]
    async fn test_slow_generator_hits_stage_deadline() {
        let mut pipeline = pipeline_with(
            vec!["HELLO"],
            translator("en"),
            StubGenerator {
                reply: "HELLO",
                delay: Some(Duration::from_millis(200)),
            },
        );
        pipeline.settings.stage_timeout = Duration::from_millis(20);

        let err = pipeline.resolve("hello").await.unwrap_err();
        assert_eq!(err.stage(), Stage::Generation);
        assert!(matches!(
            err,
            PipelineError::Upstream { source: UpstreamError::Timeout(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_nothing_resolvable_fails() {
        let pipeline = pipeline_with(vec!["HELLO"], translator("en"), replying("XYZZY QWERTY"));

        let err = pipeline.resolve("xyzzy qwerty").await.unwrap_err();
        assert_eq!(err.stage(), Stage::Resolution);
        match err {
            PipelineError::NoResolvableGloss { unresolved } => {
                assert_eq!(unresolved, vec!["XYZZY".to_string(), "QWERTY".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
