//! Evaluation: independent scorers over an assembled listing page and the
//! aggregator that merges them into one report.
//!
//! Every scorer implements `SectionEvaluator`. The aggregator runs them
//! concurrently; a scorer that errors is degraded to a neutral passing result
//! so one scorer can never abort the evaluation pass.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::listing::assembler::flatten_text;
use crate::listing::options::{Language, ModelChoice, RunSettings};
use crate::listing::oracle::{ContentOracle, OracleError};
use crate::listing::property::PropertyRecord;

pub mod fact_check;
pub mod judge;
pub mod language_match;
pub mod readability;
pub mod structural;
pub mod tone_match;

pub use fact_check::FactCheckScorer;
pub use language_match::{LanguageMatchScorer, Lexicon, WordListLexicon};
pub use readability::ReadabilityScorer;
pub use structural::StructuralScorer;
pub use tone_match::ToneMatchScorer;

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("language not supported by this scorer: {0}")]
    UnsupportedLanguage(Language),

    #[error("judge call failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("text cannot be measured: {0}")]
    Unmeasurable(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Result types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub message: String,
    pub severity: Severity,
}

impl Finding {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// One scorer's verdict. `score` is always within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub evaluator: String,
    pub score: f64,
    pub passed: bool,
    pub findings: Vec<Finding>,
    /// True when the scorer failed and this is the neutral stand-in.
    pub degraded: bool,
}

impl EvaluationResult {
    pub fn new(evaluator: &str, score: f64, passed: bool, findings: Vec<Finding>) -> Self {
        Self {
            evaluator: evaluator.to_string(),
            score: clamp_unit(score),
            passed,
            findings,
            degraded: false,
        }
    }

    /// Neutral passing result used in place of a failed scorer.
    pub fn neutral(evaluator: &str) -> Self {
        Self {
            evaluator: evaluator.to_string(),
            score: 1.0,
            passed: true,
            findings: Vec::new(),
            degraded: true,
        }
    }
}

/// Merged verdict of all scorers for one page. Built fresh every iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub results: Vec<EvaluationResult>,
    pub needs_improvement: bool,
    pub all_findings: Vec<Finding>,
    /// Mean of the scores. Informational only; the pass gate is `needs_improvement`.
    pub overall_score: f64,
}

impl EvaluationReport {
    pub fn from_results(results: Vec<EvaluationResult>) -> Self {
        let needs_improvement = !results.iter().all(|r| r.passed);
        let all_findings = results
            .iter()
            .flat_map(|r| r.findings.iter().cloned())
            .collect();
        let overall_score = if results.is_empty() {
            1.0
        } else {
            results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
        };
        Self {
            results,
            needs_improvement,
            all_findings,
            overall_score,
        }
    }

    pub fn result(&self, evaluator: &str) -> Option<&EvaluationResult> {
        self.results.iter().find(|r| r.evaluator == evaluator)
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Read-only view of one assembled page handed to every scorer.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub html: &'a str,
    /// Tags stripped, entities decoded, whitespace collapsed.
    pub text: &'a str,
    pub settings: &'a RunSettings,
    pub property: &'a PropertyRecord,
}

#[async_trait]
pub trait SectionEvaluator: Send + Sync {
    /// Stable name, used as the key in reports and logs.
    fn name(&self) -> &'static str;

    async fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<EvaluationResult, EvaluatorError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregator
// ────────────────────────────────────────────────────────────────────────────

/// Runs every scorer over a page. Scorer order fixes the order of
/// `all_findings`: language, tone, readability, structural, then fact check.
#[derive(Clone)]
pub struct EvaluatorAggregator {
    evaluators: Vec<Arc<dyn SectionEvaluator>>,
}

impl EvaluatorAggregator {
    pub fn new(evaluators: Vec<Arc<dyn SectionEvaluator>>) -> Self {
        Self { evaluators }
    }

    /// The standard scorer set. The fact checker is appended only when enabled.
    pub fn standard(
        oracle: ContentOracle,
        lexicon: Arc<dyn Lexicon>,
        judge_model: ModelChoice,
        fact_check: bool,
    ) -> Self {
        let mut evaluators: Vec<Arc<dyn SectionEvaluator>> = vec![
            Arc::new(LanguageMatchScorer::new(lexicon)),
            Arc::new(ToneMatchScorer::new(oracle.clone(), judge_model)),
            Arc::new(ReadabilityScorer),
            Arc::new(StructuralScorer),
        ];
        if fact_check {
            evaluators.push(Arc::new(FactCheckScorer::new(oracle, judge_model)));
        }
        Self { evaluators }
    }

    pub fn evaluator_names(&self) -> Vec<&'static str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// Scores `html`. Never fails: scorer errors degrade to neutral results.
    pub async fn evaluate(
        &self,
        html: &str,
        property: &PropertyRecord,
        settings: &RunSettings,
    ) -> EvaluationReport {
        let text = flatten_text(html);
        let input = EvaluationInput {
            html,
            text: &text,
            settings,
            property,
        };

        let futures = self.evaluators.iter().map(|evaluator| {
            let input = &input;
            async move {
                match evaluator.evaluate(input).await {
                    Ok(result) => {
                        debug!(
                            evaluator = evaluator.name(),
                            score = result.score,
                            passed = result.passed,
                            "scorer finished"
                        );
                        result
                    }
                    Err(e) => {
                        warn!(evaluator = evaluator.name(), error = %e, "scorer degraded to neutral result");
                        EvaluationResult::neutral(evaluator.name())
                    }
                }
            }
        });

        EvaluationReport::from_results(join_all(futures).await)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    use crate::listing::oracle::tests::settings;

    /// Scorer with a fixed verdict, or a fixed failure when `fails` is set.
    pub(crate) struct FixedScorer {
        pub name: &'static str,
        pub passed: bool,
        pub findings: Vec<&'static str>,
        pub fails: bool,
    }

    impl FixedScorer {
        pub(crate) fn passing(name: &'static str) -> Arc<dyn SectionEvaluator> {
            Arc::new(Self {
                name,
                passed: true,
                findings: Vec::new(),
                fails: false,
            })
        }

        pub(crate) fn failing(
            name: &'static str,
            findings: Vec<&'static str>,
        ) -> Arc<dyn SectionEvaluator> {
            Arc::new(Self {
                name,
                passed: false,
                findings,
                fails: false,
            })
        }
    }

    #[async_trait]
    impl SectionEvaluator for FixedScorer {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn evaluate(
            &self,
            _input: &EvaluationInput<'_>,
        ) -> Result<EvaluationResult, EvaluatorError> {
            if self.fails {
                return Err(EvaluatorError::UnsupportedLanguage(Language::Pt));
            }
            let findings = self
                .findings
                .iter()
                .map(|m| Finding::new(*m, Severity::Warning))
                .collect();
            let score = if self.passed { 0.9 } else { 0.4 };
            Ok(EvaluationResult::new(self.name, score, self.passed, findings))
        }
    }

    fn property() -> PropertyRecord {
        PropertyRecord::from_value(json!({"price": 1})).unwrap()
    }

    #[tokio::test]
    async fn test_all_passing_needs_no_improvement() {
        let aggregator = EvaluatorAggregator::new(vec![
            FixedScorer::passing("language_match"),
            FixedScorer::passing("tone_match"),
        ]);
        let report = aggregator.evaluate("<p>ok</p>", &property(), &settings()).await;
        assert!(!report.needs_improvement);
        assert!(report.all_findings.is_empty());
        assert!((report.overall_score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_one_failure_flags_improvement() {
        let aggregator = EvaluatorAggregator::new(vec![
            FixedScorer::passing("language_match"),
            FixedScorer::failing("readability", vec!["Sentences are too long."]),
        ]);
        let report = aggregator.evaluate("<p>ok</p>", &property(), &settings()).await;
        assert!(report.needs_improvement);
        assert_eq!(report.all_findings.len(), 1);
    }

    #[tokio::test]
    async fn test_findings_follow_scorer_order() {
        let aggregator = EvaluatorAggregator::new(vec![
            FixedScorer::failing("language_match", vec!["lang"]),
            FixedScorer::failing("tone_match", vec!["tone"]),
            FixedScorer::failing("readability", vec!["read"]),
            FixedScorer::failing("structural", vec!["seo-1", "seo-2"]),
        ]);
        let report = aggregator.evaluate("<p>ok</p>", &property(), &settings()).await;
        let messages: Vec<&str> = report.all_findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["lang", "tone", "read", "seo-1", "seo-2"]);
    }

    #[tokio::test]
    async fn test_scorer_error_degrades_to_neutral_pass() {
        let broken: Arc<dyn SectionEvaluator> = Arc::new(FixedScorer {
            name: "language_match",
            passed: false,
            findings: vec!["never surfaced"],
            fails: true,
        });
        let aggregator = EvaluatorAggregator::new(vec![broken, FixedScorer::passing("structural")]);
        let report = aggregator.evaluate("<p>ok</p>", &property(), &settings()).await;

        let degraded = report.result("language_match").unwrap();
        assert!(degraded.passed);
        assert!(degraded.degraded);
        assert_eq!(degraded.score, 1.0);
        assert!(degraded.findings.is_empty());
        assert!(!report.needs_improvement);
    }

    #[test]
    fn test_scores_are_clamped() {
        assert_eq!(EvaluationResult::new("x", 1.7, true, Vec::new()).score, 1.0);
        assert_eq!(EvaluationResult::new("x", -0.2, false, Vec::new()).score, 0.0);
        assert_eq!(EvaluationResult::new("x", f64::NAN, false, Vec::new()).score, 0.0);
    }
}
