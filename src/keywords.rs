//! Keyword and phrase extraction from review text.
//!
//! Extraction runs two passes over a review:
//!
//! 1. **Concept matching** - the lowercased text is checked against a table of
//!    canonical concepts, each with a list of surface variants. A concept is
//!    emitted once, on its first matching variant.
//! 2. **Lexical scan** - remaining content words (adjectives and nouns, not
//!    stop-words, alphabetic, longer than two characters) are collected.
//!
//! Results are de-duplicated in first-seen order and capped. The concept
//! table and stop-lists are data loaded from JSON (see `config/keywords.json`)
//! so they can be retuned for a different business without code changes.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::tagger::{PosTagger, RuleTagger};

const BUILTIN_CONFIG: &str = include_str!("../config/keywords.json");

/// Texts shorter than this (after trimming) yield no keywords.
const MIN_TEXT_CHARS: usize = 3;

/// Upper bound on keywords per review, whatever the loaded table asks for.
const KEYWORD_CAP: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
    #[serde(default)]
    pub stopwords: Vec<String>,
    #[serde(default)]
    pub domain_stopwords: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    pub variants: Vec<String>,
}

fn default_max_keywords() -> usize {
    KEYWORD_CAP
}

impl KeywordConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: KeywordConfig =
            serde_json::from_str(raw).context("Invalid keyword configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CONFIG)
    }

    /// Reads `path` when given, otherwise the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read keyword config {}", path.display()))?;
                Self::from_json(&raw)?
            }
            None => Self::builtin()?,
        };
        info!(
            concepts = config.concepts.len(),
            stopwords = config.stopwords.len() + config.domain_stopwords.len(),
            source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "builtin".into()),
            "📚 Keyword configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=KEYWORD_CAP).contains(&self.max_keywords) {
            bail!("max_keywords must be between 1 and {}, got {}", KEYWORD_CAP, self.max_keywords);
        }
        let mut seen = HashSet::new();
        for concept in &self.concepts {
            if concept.name.trim().is_empty() {
                bail!("Concept with empty name");
            }
            if !seen.insert(concept.name.as_str()) {
                bail!("Duplicate concept '{}'", concept.name);
            }
            if concept.variants.iter().all(|v| normalize_text(v).is_empty()) {
                bail!("Concept '{}' has no usable variants", concept.name);
            }
        }
        Ok(())
    }
}

struct CompiledConcept {
    name: String,
    /// Variants normalised and padded with spaces for word-boundary matching.
    needles: Vec<String>,
}

pub struct KeywordExtractor {
    max_keywords: usize,
    stopwords: HashSet<String>,
    concepts: Vec<CompiledConcept>,
    tagger: Box<dyn PosTagger>,
}

impl KeywordExtractor {
    pub fn new(config: KeywordConfig) -> Self {
        Self::with_tagger(config, Box::new(RuleTagger))
    }

    pub fn with_tagger(config: KeywordConfig, tagger: Box<dyn PosTagger>) -> Self {
        let stopwords = config
            .stopwords
            .iter()
            .chain(config.domain_stopwords.iter())
            .map(|w| w.trim().to_lowercase())
            .collect();

        let concepts = config
            .concepts
            .into_iter()
            .map(|concept| CompiledConcept {
                name: concept.name,
                needles: concept
                    .variants
                    .iter()
                    .map(|v| normalize_text(v))
                    .filter(|v| !v.is_empty())
                    .map(|v| format!(" {} ", v))
                    .collect(),
            })
            .collect();

        Self {
            max_keywords: config.max_keywords,
            stopwords,
            concepts,
            tagger,
        }
    }

    /// Returns at most `max_keywords` keywords in first-seen order.
    pub fn extract(&self, text: &str) -> Vec<String> {
        if text.trim().chars().count() < MIN_TEXT_CHARS {
            return Vec::new();
        }

        let normalized = normalize_text(text);
        let mut keywords = Vec::new();
        let mut seen = HashSet::new();

        // Concepts are emitted before plain words, so the cap below drops
        // plain words first.
        let haystack = format!(" {} ", normalized);
        for concept in &self.concepts {
            if concept.needles.iter().any(|n| haystack.contains(n.as_str())) {
                push_unique(&mut keywords, &mut seen, &concept.name);
            }
        }

        for word in self.content_words(&normalized) {
            push_unique(&mut keywords, &mut seen, word);
        }

        keywords.truncate(self.max_keywords);
        keywords
    }

    fn content_words<'a>(&self, normalized: &'a str) -> Vec<&'a str> {
        let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
        let tags = self.tagger.tag(&tokens);

        tokens
            .into_iter()
            .zip(tags)
            .filter(|(word, tag)| {
                tag.is_content()
                    && word.chars().count() > 2
                    && word.chars().all(|c| c.is_alphabetic())
                    && !self.stopwords.contains(*word)
            })
            .map(|(word, _)| word)
            .collect()
    }
}

fn push_unique(keywords: &mut Vec<String>, seen: &mut HashSet<String>, keyword: &str) {
    if seen.insert(keyword.to_string()) {
        keywords.push(keyword.to_string());
    }
}

/// Lowercases and collapses everything except letters, digits and
/// apostrophes into single spaces.
fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> KeywordExtractor {
        KeywordExtractor::new(KeywordConfig::builtin().unwrap())
    }

    #[test]
    fn test_builtin_config_is_valid() {
        let config = KeywordConfig::builtin().unwrap();
        assert_eq!(config.max_keywords, 5);
        assert!(config.concepts.iter().any(|c| c.name == "friendly_staff"));
    }

    #[test]
    fn test_empty_and_tiny_text() {
        let extractor = extractor();
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("  ok  ").is_empty());
    }

    #[test]
    fn test_concepts_then_content_words() {
        let keywords = extractor().extract("great coffee, friendly staff");
        assert_eq!(
            keywords,
            vec!["friendly_staff", "great_coffee", "friendly", "great", "staff"]
        );
    }

    #[test]
    fn test_negative_review_keywords() {
        let keywords = extractor().extract("coffee was cold and the staff was rude");
        assert_eq!(keywords, vec!["cold", "rude", "staff"]);
    }

    #[test]
    fn test_concept_emitted_once_for_many_variants() {
        let keywords = extractor().extract("Terrible, awful and horrible");
        assert_eq!(keywords.iter().filter(|k| *k == "bad").count(), 1);
    }

    #[test]
    fn test_variants_match_on_word_boundaries() {
        // "hot" must not match inside "shot"
        let keywords = extractor().extract("an espresso shot");
        assert!(!keywords.contains(&"fresh".to_string()));
        assert!(keywords.contains(&"espresso".to_string()));
    }

    #[test]
    fn test_never_more_than_cap() {
        let text = "Delicious fresh pastries, cozy seating, clean tables, friendly barista, \
                    fast service, cheap prices, noisy music and a long wait";
        let keywords = extractor().extract(text);
        assert_eq!(keywords.len(), 5);
    }

    #[test]
    fn test_stopwords_and_short_words_dropped() {
        let keywords = extractor().extract("The shop is a nice place with art");
        assert!(!keywords.contains(&"shop".to_string()));
        assert!(!keywords.contains(&"place".to_string()));
        assert!(!keywords.contains(&"is".to_string()));
        assert!(keywords.contains(&"friendly".to_string()));
        assert!(keywords.contains(&"nice".to_string()));
    }

    #[test]
    fn test_custom_table_is_used() {
        let config = KeywordConfig::from_json(
            r#"{
                "max_keywords": 2,
                "concepts": [{ "name": "parking", "variants": ["parking lot", "car park"] }]
            }"#,
        )
        .unwrap();
        let keywords = KeywordExtractor::new(config).extract("Huge car park next door, lovely views");
        assert_eq!(keywords, vec!["parking", "huge"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(KeywordConfig::from_json(r#"{ "max_keywords": 0 }"#).is_err());
        assert!(KeywordConfig::from_json(r#"{ "max_keywords": 9 }"#).is_err());
        assert!(KeywordConfig::from_json(r#"{ "max_keywords": 5 }"#).is_ok());
        assert!(KeywordConfig::from_json(
            r#"{ "concepts": [{ "name": "x", "variants": ["  "] }] }"#
        )
        .is_err());
        assert!(KeywordConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Great   COFFEE!! "), "great coffee");
        assert_eq!(normalize_text("Didn’t like it"), "didn't like it");
    }
}
