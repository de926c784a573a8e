//! Structural (SEO) scorer: a weighted rule set over the parsed page.
//!
//! Rules and weights:
//! - `<title>` present, 30–60 chars            0.20
//! - meta description present, 70–155 chars   0.20
//! - exactly one non-empty `<h1>`             0.20
//! - no skipped heading levels                0.15
//! - body has at least `MIN_BODY_WORDS` words 0.15
//! - `<html lang>` matches the run language   0.10
//!
//! score = 1 − Σ weights of failed rules. Passes at ≥ 0.7.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::listing::evaluation::{
    EvaluationInput, EvaluationResult, EvaluatorError, Finding, SectionEvaluator, Severity,
};
use crate::listing::options::Language;

pub const NAME: &str = "structural";
pub const PASS_THRESHOLD: f64 = 0.7;

const TITLE_RANGE: (usize, usize) = (30, 60);
const META_RANGE: (usize, usize) = (70, 155);
const MIN_BODY_WORDS: usize = 80;

const W_TITLE: f64 = 0.20;
const W_META: f64 = 0.20;
const W_H1: f64 = 0.20;
const W_HIERARCHY: f64 = 0.15;
const W_BODY: f64 = 0.15;
const W_LANG: f64 = 0.10;

pub struct StructuralScorer;

#[async_trait]
impl SectionEvaluator for StructuralScorer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<EvaluationResult, EvaluatorError> {
        score_structure(input.html, input.settings.language)
    }
}

/// Synchronous core: parses `html` and applies every rule.
pub fn score_structure(html: &str, language: Language) -> Result<EvaluationResult, EvaluatorError> {
    let document = Html::parse_document(html);
    let mut failed_weight = 0.0;
    let mut findings = Vec::new();

    // Title
    let titles = texts(&document, "title")?;
    match titles.first() {
        None => {
            failed_weight += W_TITLE;
            findings.push(Finding::new("Title tag is missing.", Severity::Error));
        }
        Some(title) => {
            let len = title.chars().count();
            if title.is_empty() {
                failed_weight += W_TITLE;
                findings.push(Finding::new("Title is empty.", Severity::Error));
            } else if len < TITLE_RANGE.0 || len > TITLE_RANGE.1 {
                failed_weight += W_TITLE;
                findings.push(Finding::new(
                    format!(
                        "Title is {len} characters long; it should be between {} and {} characters.",
                        TITLE_RANGE.0, TITLE_RANGE.1
                    ),
                    Severity::Warning,
                ));
            }
        }
    }

    // Meta description
    let meta_selector = selector(r#"meta[name="description"]"#)?;
    let meta = document
        .select(&meta_selector)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::trim);
    match meta {
        None | Some("") => {
            failed_weight += W_META;
            findings.push(Finding::new("Meta description is missing or empty.", Severity::Error));
        }
        Some(content) => {
            let len = content.chars().count();
            if len < META_RANGE.0 || len > META_RANGE.1 {
                failed_weight += W_META;
                findings.push(Finding::new(
                    format!(
                        "Meta description is {len} characters long; it should be between {} and {} characters.",
                        META_RANGE.0, META_RANGE.1
                    ),
                    Severity::Warning,
                ));
            }
        }
    }

    // H1
    let h1s = texts(&document, "h1")?;
    let non_empty_h1 = h1s.iter().filter(|t| !t.is_empty()).count();
    if h1s.len() != 1 || non_empty_h1 != 1 {
        failed_weight += W_H1;
        findings.push(Finding::new(
            format!("Page should have exactly one non-empty H1 heading, found {non_empty_h1}."),
            Severity::Error,
        ));
    }

    // Heading hierarchy
    if let Some(message) = hierarchy_violation(&document)? {
        failed_weight += W_HIERARCHY;
        findings.push(Finding::new(message, Severity::Warning));
    }

    // Body length
    let body_words = texts(&document, "body")?
        .first()
        .map(|b| b.split_whitespace().count())
        .unwrap_or(0);
    if body_words < MIN_BODY_WORDS {
        failed_weight += W_BODY;
        findings.push(Finding::new(
            format!(
                "Content is thin: {body_words} words; the description and neighborhood should add detail (at least {MIN_BODY_WORDS} words)."
            ),
            Severity::Warning,
        ));
    }

    // Document language
    let html_selector = selector("html")?;
    let lang = document
        .select(&html_selector)
        .next()
        .and_then(|h| h.value().attr("lang"));
    if lang != Some(language.code()) {
        failed_weight += W_LANG;
        findings.push(Finding::new(
            format!("Document language attribute should be \"{}\".", language.code()),
            Severity::Info,
        ));
    }

    let score = 1.0 - failed_weight;
    Ok(EvaluationResult::new(
        NAME,
        score,
        score >= PASS_THRESHOLD - 1e-9,
        findings,
    ))
}

fn selector(css: &str) -> Result<Selector, EvaluatorError> {
    Selector::parse(css).map_err(|e| EvaluatorError::Unmeasurable(format!("bad selector {css}: {e:?}")))
}

/// Trimmed, whitespace-collapsed text of every element matching `css`.
fn texts(document: &Html, css: &str) -> Result<Vec<String>, EvaluatorError> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .map(|e| e.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" "))
        .collect())
}

/// First skipped heading level, if any. The first heading must be an H1.
fn hierarchy_violation(document: &Html) -> Result<Option<String>, EvaluatorError> {
    let selector = selector("h1, h2, h3, h4, h5, h6")?;
    let mut previous = 0usize;
    for heading in document.select(&selector) {
        let level = heading.value().name()[1..].parse::<usize>().unwrap_or(1);
        if level > previous + 1 {
            return Ok(Some(format!(
                "Heading hierarchy skips a level: H{level} follows {}.",
                if previous == 0 { "no H1".to_string() } else { format!("H{previous}") }
            )));
        }
        previous = level;
    }
    Ok(None)
}
