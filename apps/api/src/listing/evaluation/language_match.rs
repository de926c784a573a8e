//! Language-match scorer: share of tokens found in the run language's lexicon.
//!
//! score = 1 − unknown / total, passes above 0.8. Languages without a word
//! list are unsupported and the aggregator degrades the result.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use crate::listing::evaluation::{
    EvaluationInput, EvaluationResult, EvaluatorError, Finding, SectionEvaluator, Severity,
};
use crate::listing::options::Language;

pub const NAME: &str = "language_match";
pub const PASS_THRESHOLD: f64 = 0.8;

const MAX_REPORTED_WORDS: usize = 10;

/// Word-validity lookup per language.
pub trait Lexicon: Send + Sync {
    fn supports(&self, language: Language) -> bool;

    /// `word` is already lowercased.
    fn contains(&self, language: Language, word: &str) -> bool;
}

/// In-memory word lists, one per language.
#[derive(Debug, Default)]
pub struct WordListLexicon {
    words: HashMap<Language, HashSet<String>>,
}

impl WordListLexicon {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_words<I, S>(mut self, language: Language, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.words.entry(language).or_default();
        entry.extend(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
        self
    }

    /// Loads `<code>.txt` (one word per line) for every supported language
    /// found in `dir`. Missing files are skipped.
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let mut lexicon = Self::empty();
        for language in Language::ALL {
            let path = dir.join(format!("{}.txt", language.code()));
            if !path.exists() {
                continue;
            }
            let contents = std::fs::read_to_string(&path)?;
            lexicon = lexicon.with_words(language, contents.lines());
            info!(
                language = %language,
                words = lexicon.words.get(&language).map(HashSet::len).unwrap_or(0),
                "lexicon loaded"
            );
        }
        Ok(lexicon)
    }
}

impl Lexicon for WordListLexicon {
    fn supports(&self, language: Language) -> bool {
        self.words.get(&language).is_some_and(|w| !w.is_empty())
    }

    fn contains(&self, language: Language, word: &str) -> bool {
        self.words
            .get(&language)
            .is_some_and(|words| words.contains(word))
    }
}

pub struct LanguageMatchScorer {
    lexicon: Arc<dyn Lexicon>,
}

impl LanguageMatchScorer {
    pub fn new(lexicon: Arc<dyn Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn score_text(&self, text: &str, language: Language) -> Result<EvaluationResult, EvaluatorError> {
        if !self.lexicon.supports(language) {
            return Err(EvaluatorError::UnsupportedLanguage(language));
        }

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(EvaluationResult::new(NAME, 1.0, true, Vec::new()));
        }

        let unknown: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !t.chars().all(|c| c.is_numeric()))
            .filter(|t| !self.lexicon.contains(language, t))
            .collect();

        let score = 1.0 - unknown.len() as f64 / tokens.len() as f64;
        let passed = score > PASS_THRESHOLD;

        let mut findings = Vec::new();
        if !passed {
            findings.push(Finding::new(
                format!("Text should be in {}.", language.name()),
                Severity::Error,
            ));
            let sample: BTreeSet<&str> = unknown.iter().copied().collect();
            let sample: Vec<&str> = sample.into_iter().take(MAX_REPORTED_WORDS).collect();
            findings.push(Finding::new(
                format!("Unrecognized words: {}.", sample.join(", ")),
                Severity::Info,
            ));
        }

        Ok(EvaluationResult::new(NAME, score, passed, findings))
    }
}

#[async_trait]
impl SectionEvaluator for LanguageMatchScorer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<EvaluationResult, EvaluatorError> {
        self.score_text(input.text, input.settings.language)
    }
}

/// Lowercased word tokens. Contractions (`don't`, `l'eau`) stay one token.
fn tokenize(text: &str) -> Vec<String> {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| {
        Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}]+)*").expect("valid word regex")
    });
    word.find_iter(text)
        .map(|m| m.as_str().replace('’', "'").to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Arc<dyn Lexicon> {
        Arc::new(
            WordListLexicon::empty()
                .with_words(
                    Language::En,
                    ["a", "bright", "home", "with", "bedrooms", "and", "garden", "don't"],
                )
                .with_words(Language::Es, ["una", "casa", "con", "jardín"]),
        )
    }

    #[test]
    fn test_all_known_words_pass() {
        let scorer = LanguageMatchScorer::new(lexicon());
        let result = scorer
            .score_text("A bright home with 3 bedrooms and garden.", Language::En)
            .unwrap();
        assert_eq!(result.score, 1.0);
        assert!(result.passed);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_wrong_language_fails_with_finding() {
        let scorer = LanguageMatchScorer::new(lexicon());
        let result = scorer
            .score_text("Una casa luminosa con jardín y piscina", Language::En)
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.findings[0].message, "Text should be in English.");
        assert!(result.findings[1].message.contains("piscina"));
    }

    #[test]
    fn test_threshold_is_strict() {
        // 4 of 5 known → 0.8, which does not pass.
        let scorer = LanguageMatchScorer::new(lexicon());
        let result = scorer
            .score_text("bright home with garden xyzzy", Language::En)
            .unwrap();
        assert!((result.score - 0.8).abs() < 1e-9);
        assert!(!result.passed);
    }

    #[test]
    fn test_contractions_and_accents() {
        let scorer = LanguageMatchScorer::new(lexicon());
        assert!(scorer.score_text("Don’t", Language::En).unwrap().passed);
        assert!(scorer.score_text("Casa con JARDÍN", Language::Es).unwrap().passed);
    }

    #[test]
    fn test_unsupported_language_is_an_error() {
        let scorer = LanguageMatchScorer::new(lexicon());
        let err = scorer.score_text("uma casa", Language::Pt).unwrap_err();
        assert!(matches!(err, EvaluatorError::UnsupportedLanguage(Language::Pt)));
    }

    #[test]
    fn test_empty_text_passes() {
        let scorer = LanguageMatchScorer::new(lexicon());
        assert!(scorer.score_text("  ... ", Language::En).unwrap().passed);
    }

    #[test]
    fn test_load_dir_reads_word_lists() {
        let dir = std::env::temp_dir().join(format!("lexicon-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("pt.txt"), "casa\nJardim\n\n").unwrap();

        let lexicon = WordListLexicon::load_dir(&dir).unwrap();
        assert!(lexicon.supports(Language::Pt));
        assert!(lexicon.contains(Language::Pt, "jardim"));
        assert!(!lexicon.supports(Language::En));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
