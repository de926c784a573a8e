//! ContentOracle: section writer and judge adapter over the completion backend.
//!
//! One generic writer parameterized by `SectionKind`: the persona comes from the
//! kind table, the prompt from the `PromptCatalog`, and the property context
//! from the record view the kind needs. Every call is bounded by a timeout; a
//! timed-out call is an ordinary `OracleError`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::listing::options::{ModelChoice, RunSettings};
use crate::listing::prompts::{PromptCatalog, PromptStage, PromptVars};
use crate::listing::property::PropertyRecord;
use crate::listing::sections::SectionKind;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, PLAIN_TEXT_ONLY};
use crate::llm_client::{strip_json_fences, CompletionBackend, LlmError};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("completion backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle returned no usable text")]
    EmptyOutput,
}

#[derive(Clone)]
pub struct ContentOracle {
    backend: Arc<dyn CompletionBackend>,
    catalog: Arc<PromptCatalog>,
    timeout: Duration,
}

impl ContentOracle {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        catalog: Arc<PromptCatalog>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            catalog,
            timeout,
        }
    }

    /// First draft for one section.
    pub async fn generate_initial(
        &self,
        kind: SectionKind,
        property: &PropertyRecord,
        settings: &RunSettings,
    ) -> Result<String, OracleError> {
        let context = property_context(kind, property);
        let prompt = self.catalog.render(
            settings.language,
            kind,
            PromptStage::Initial,
            &PromptVars {
                language_name: settings.language.name(),
                tone: settings.tone.name(),
                tone_description: settings.tone.description(),
                property_data: &context,
                ..Default::default()
            },
        );
        self.write(kind, settings.model, &prompt).await
    }

    /// Revised draft honoring `instruction`.
    pub async fn refine(
        &self,
        kind: SectionKind,
        property: &PropertyRecord,
        current_text: &str,
        instruction: &str,
        settings: &RunSettings,
    ) -> Result<String, OracleError> {
        let context = property_context(kind, property);
        let prompt = self.catalog.render(
            settings.language,
            kind,
            PromptStage::Refinement,
            &PromptVars {
                language_name: settings.language.name(),
                tone: settings.tone.name(),
                tone_description: settings.tone.description(),
                property_data: &context,
                current_content: current_text,
                instruction,
            },
        );
        self.write(kind, settings.model, &prompt).await
    }

    /// Raw judge call: the caller owns the persona, the prompt and the reply parsing.
    pub async fn judge(
        &self,
        model: ModelChoice,
        system: &str,
        prompt: &str,
    ) -> Result<String, OracleError> {
        self.complete(model, system, prompt).await
    }

    async fn write(
        &self,
        kind: SectionKind,
        model: ModelChoice,
        prompt: &str,
    ) -> Result<String, OracleError> {
        let system = format!("{} {PLAIN_TEXT_ONLY} {GROUNDING_INSTRUCTION}", kind.persona());
        let raw = self.complete(model, &system, prompt).await?;
        let text = clean_output(kind, &raw);
        if text.is_empty() {
            return Err(OracleError::EmptyOutput);
        }
        debug!(section = %kind, chars = text.chars().count(), "section text received");
        Ok(text)
    }

    async fn complete(
        &self,
        model: ModelChoice,
        system: &str,
        prompt: &str,
    ) -> Result<String, OracleError> {
        match tokio::time::timeout(self.timeout, self.backend.complete(model.id(), system, prompt))
            .await
        {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(OracleError::Timeout(self.timeout)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// The record view each kind is allowed to see.
pub(crate) fn property_context(kind: SectionKind, property: &PropertyRecord) -> String {
    match kind {
        SectionKind::Neighborhood => property.neighborhood_prompt_json(),
        SectionKind::KeyFeatures => {
            let features = property.listed_features();
            if features.is_empty() {
                "Listed features: none".to_string()
            } else {
                let lines: Vec<String> = features.iter().map(|f| format!("- {f}")).collect();
                format!("Listed features (the ONLY ones you may use):\n{}", lines.join("\n"))
            }
        }
        _ => property.to_prompt_json(),
    }
}

/// Normalizes a writer reply: strips code fences, a leading `Label:` and
/// wrapping quotes. Single-line kinds keep only their first non-empty line.
pub(crate) fn clean_output(kind: SectionKind, raw: &str) -> String {
    let text = strip_json_fences(raw).trim();

    let text = match kind {
        SectionKind::Title
        | SectionKind::MetaDescription
        | SectionKind::H1
        | SectionKind::CallToAction => text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or(""),
        _ => text,
    };

    let text = strip_label(text);
    strip_wrapping_quotes(text).trim().to_string()
}

fn strip_label(text: &str) -> &str {
    if let Some((label, rest)) = text.split_once(':') {
        if label.len() <= 40 && SectionKind::from_synonym(label).is_some() {
            return rest.trim_start();
        }
    }
    text
}

/// Removes one pair of quotes enclosing the whole reply. Quotes that are also
/// used inside the text belong to the content and are kept.
fn strip_wrapping_quotes(text: &str) -> &str {
    const PAIRS: &[(char, char)] = &[('"', '"'), ('“', '”'), ('«', '»'), ('\'', '\'')];
    let trimmed = text.trim();
    for (open, close) in PAIRS {
        if trimmed.chars().count() >= 2 && trimmed.starts_with(*open) && trimmed.ends_with(*close) {
            let inner = &trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()];
            if inner.contains(*open) || inner.contains(*close) {
                return trimmed;
            }
            return inner;
        }
    }
    trimmed
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::listing::options::{Language, Tone};

    type Responder = dyn Fn(&str, &str) -> Result<String, LlmError> + Send + Sync;

    /// In-memory backend: answers every call with a closure over (system, prompt)
    /// and records what it was asked.
    pub(crate) struct ScriptedBackend {
        responder: Box<Responder>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedBackend {
        pub(crate) fn new(
            responder: impl Fn(&str, &str) -> Result<String, LlmError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                responder: Box::new(responder),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            _model: &str,
            system: &str,
            prompt: &str,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), prompt.to_string()));
            (self.responder)(system, prompt)
        }
    }

    pub(crate) fn settings() -> RunSettings {
        RunSettings {
            language: Language::En,
            tone: Tone::Professional,
            model: ModelChoice::Gemma3nE2b,
            max_iterations: 1,
        }
    }

    pub(crate) fn oracle_with(backend: Arc<dyn CompletionBackend>) -> ContentOracle {
        ContentOracle::new(
            backend,
            Arc::new(PromptCatalog::builtin()),
            Duration::from_secs(5),
        )
    }

    fn property() -> PropertyRecord {
        PropertyRecord::from_value(json!({
            "location": {"city": "Lisbon"},
            "features": {"bedrooms": 3, "balcony": false},
            "price": 650000
        }))
        .unwrap()
    }

    #[test]
    fn test_clean_output_strips_label_and_quotes() {
        assert_eq!(
            clean_output(SectionKind::Title, "Title: \"Sunny T3 in Lisbon\""),
            "Sunny T3 in Lisbon"
        );
    }

    #[test]
    fn test_clean_output_keeps_quotes_that_are_not_one_pair() {
        let raw = "\"Spacious\" flat with a \"view\"";
        assert_eq!(clean_output(SectionKind::Description, raw), raw);
        assert_eq!(
            clean_output(SectionKind::Title, "“Sunny “T3” flat”"),
            "“Sunny “T3” flat”"
        );
        assert_eq!(clean_output(SectionKind::H1, "«Casa luminosa»"), "Casa luminosa");
    }

    #[test]
    fn test_clean_output_single_line_kind_keeps_first_line() {
        assert_eq!(
            clean_output(SectionKind::H1, "\n\nBright Family Home\nAlternative: Cozy Home"),
            "Bright Family Home"
        );
    }

    #[test]
    fn test_clean_output_keeps_feature_lines() {
        let cleaned = clean_output(SectionKind::KeyFeatures, "```\n- 3 bedrooms\n- 2 bathrooms\n```");
        assert_eq!(cleaned, "- 3 bedrooms\n- 2 bathrooms");
    }

    #[test]
    fn test_clean_output_leaves_unlabeled_colons() {
        assert_eq!(
            clean_output(SectionKind::Description, "Price: 650,000 EUR for a bright flat"),
            "Price: 650,000 EUR for a bright flat"
        );
    }

    #[test]
    fn test_property_context_per_kind() {
        let record = property();
        let neighborhood = property_context(SectionKind::Neighborhood, &record);
        assert!(neighborhood.contains("Lisbon"));
        assert!(!neighborhood.contains("650000"));

        let features = property_context(SectionKind::KeyFeatures, &record);
        assert!(features.contains("- bedrooms: 3"));
        assert!(!features.contains("balcony"));

        let full = property_context(SectionKind::Description, &record);
        assert!(full.contains("650000"));
    }

    #[tokio::test]
    async fn test_generate_initial_uses_kind_persona() {
        let backend = ScriptedBackend::new(|_, _| Ok("  \"A Bright Home\"  ".to_string()));
        let oracle = oracle_with(backend.clone());
        let text = oracle
            .generate_initial(SectionKind::Title, &property(), &settings())
            .await
            .unwrap();
        assert_eq!(text, "A Bright Home");
        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("page title"));
        assert!(prompts[0].1.contains("English"));
    }

    #[tokio::test]
    async fn test_refine_passes_instruction() {
        let backend = ScriptedBackend::new(|_, _| Ok("Shorter title".to_string()));
        let oracle = oracle_with(backend.clone());
        oracle
            .refine(
                SectionKind::Title,
                &property(),
                "A very long title",
                "Problem: too long; Fix: shorten",
                &settings(),
            )
            .await
            .unwrap();
        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].1.contains("A very long title"));
        assert!(prompts[0].1.contains("Fix: shorten"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_error() {
        let backend = ScriptedBackend::new(|_, _| Ok("   \"\"  ".to_string()));
        let oracle = oracle_with(backend);
        let err = oracle
            .generate_initial(SectionKind::H1, &property(), &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = ScriptedBackend::new(|_, _| Err(LlmError::EmptyContent));
        let oracle = oracle_with(backend);
        let err = oracle
            .generate_initial(SectionKind::H1, &property(), &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Backend(LlmError::EmptyContent)));
    }

    struct StuckBackend;

    #[async_trait]
    impl CompletionBackend for StuckBackend {
        async fn complete(&self, _: &str, _: &str, _: &str) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_call_times_out() {
        let oracle = ContentOracle::new(
            Arc::new(StuckBackend),
            Arc::new(PromptCatalog::builtin()),
            Duration::from_secs(2),
        );
        let err = oracle
            .generate_initial(SectionKind::Title, &property(), &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Timeout(_)));
    }
}
