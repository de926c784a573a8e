//! Readability scorer: reading-ease measure for the run language.
//!
//! - en: Flesch            206.835 − 1.015·(W/S) − 84.6·(Sy/W)
//! - es: Fernández-Huerta  206.84  − 1.02·(W/S)  − 60·(Sy/W)
//! - pt: Flesch (Martins)  248.835 − 1.015·(W/S) − 84.6·(Sy/W)
//!
//! Syllables are estimated from vowel groups. score = ease / 100 clamped to
//! [0, 1]; passes at ease ≥ 60.

use async_trait::async_trait;

use crate::listing::evaluation::{
    EvaluationInput, EvaluationResult, EvaluatorError, Finding, SectionEvaluator, Severity,
};
use crate::listing::options::Language;

pub const NAME: &str = "readability";
pub const PASS_EASE: f64 = 60.0;

pub struct ReadabilityScorer;

#[async_trait]
impl SectionEvaluator for ReadabilityScorer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<EvaluationResult, EvaluatorError> {
        score_readability(input.text, input.settings.language)
    }
}

pub fn score_readability(text: &str, language: Language) -> Result<EvaluationResult, EvaluatorError> {
    let ease = reading_ease(text, language)?;
    let passed = ease >= PASS_EASE;
    let mut findings = Vec::new();
    if !passed {
        findings.push(Finding::new(
            format!(
                "Reading ease is {ease:.1} (target {PASS_EASE:.0}+); use shorter sentences and simpler words in the description and neighborhood."
            ),
            Severity::Warning,
        ));
    }
    Ok(EvaluationResult::new(NAME, ease / 100.0, passed, findings))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStats {
    pub sentences: usize,
    pub words: usize,
    pub syllables: usize,
}

pub fn reading_ease(text: &str, language: Language) -> Result<f64, EvaluatorError> {
    let stats = text_stats(text, language);
    if stats.words == 0 {
        return Err(EvaluatorError::Unmeasurable("no words".to_string()));
    }
    let words_per_sentence = stats.words as f64 / stats.sentences as f64;
    let syllables_per_word = stats.syllables as f64 / stats.words as f64;

    let ease = match language {
        Language::En => 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word,
        Language::Es => 206.84 - 1.02 * words_per_sentence - 60.0 * syllables_per_word,
        Language::Pt => 248.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word,
    };
    Ok(ease)
}

pub fn text_stats(text: &str, language: Language) -> TextStats {
    let mut sentences = 0;
    let mut words = 0;
    let mut syllables = 0;

    for sentence in text.split(['.', '!', '?', ';', '…']) {
        let mut sentence_words = 0;
        for word in sentence.split_whitespace() {
            let word: String = word.chars().filter(|c| c.is_alphabetic()).collect();
            if word.is_empty() {
                continue;
            }
            sentence_words += 1;
            syllables += count_syllables(&word, language);
        }
        if sentence_words > 0 {
            sentences += 1;
            words += sentence_words;
        }
    }

    TextStats {
        sentences: sentences.max(1),
        words,
        syllables,
    }
}

/// Vowel-group count, at least one per word. English drops a silent final `e`.
pub fn count_syllables(word: &str, language: Language) -> usize {
    let lower = word.to_lowercase();
    let mut groups = 0;
    let mut in_group = false;
    for c in lower.chars() {
        if is_vowel(c) {
            if !in_group {
                groups += 1;
            }
            in_group = true;
        } else {
            in_group = false;
        }
    }

    if language == Language::En
        && groups > 1
        && lower.ends_with('e')
        && !lower.ends_with("le")
        && !lower.ends_with("ee")
    {
        groups -= 1;
    }
    groups.max(1)
}

fn is_vowel(c: char) -> bool {
    matches!(
        c,
        'a' | 'e' | 'i' | 'o' | 'u' | 'y'
            | 'á' | 'à' | 'â' | 'ã'
            | 'é' | 'ê'
            | 'í'
            | 'ó' | 'ô' | 'õ'
            | 'ú' | 'ü'
    )
}
