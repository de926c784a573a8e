//! Tone-match scorer: the judge model rates how well the page text fits the
//! requested tone profile. Passes at ≥ 0.7.

use async_trait::async_trait;
use tracing::debug;

use crate::listing::evaluation::judge::{parse_judge_verdict, VerdictSource};
use crate::listing::evaluation::{
    EvaluationInput, EvaluationResult, EvaluatorError, Finding, SectionEvaluator, Severity,
};
use crate::listing::options::ModelChoice;
use crate::listing::oracle::ContentOracle;
use crate::llm_client::prompts::{fill_placeholders, JSON_ONLY_SYSTEM};

pub const NAME: &str = "tone_match";
pub const PASS_THRESHOLD: f64 = 0.7;

const TONE_JUDGE_PERSONA: &str =
    "You are an expert in real estate marketing copy. You judge whether a text matches a requested tone.";

const TONE_JUDGE_PROMPT: &str = "\
Rate how well the following property listing text matches the requested tone.

Requested tone: {tone}
Tone description: {tone_description}
Language of the text: {language_name}

Text:
\"\"\"
{text}
\"\"\"

Reply with a JSON object: {\"score\": <number between 0 and 1>, \"feedback\": \"<one or two sentences on what to change>\"}";

pub struct ToneMatchScorer {
    oracle: ContentOracle,
    model: ModelChoice,
}

impl ToneMatchScorer {
    pub fn new(oracle: ContentOracle, model: ModelChoice) -> Self {
        Self { oracle, model }
    }
}

#[async_trait]
impl SectionEvaluator for ToneMatchScorer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<EvaluationResult, EvaluatorError> {
        let tone = input.settings.tone;
        let prompt = fill_placeholders(
            TONE_JUDGE_PROMPT,
            &[
                ("tone", tone.name()),
                ("tone_description", tone.description()),
                ("language_name", input.settings.language.name()),
                ("text", input.text),
            ],
        );
        let system = format!("{TONE_JUDGE_PERSONA} {JSON_ONLY_SYSTEM}");

        let reply = self.oracle.judge(self.model, &system, &prompt).await?;
        let verdict = parse_judge_verdict(&reply);
        if verdict.source != VerdictSource::Structured {
            debug!(source = ?verdict.source, "tone judge reply was not strict JSON");
        }

        let passed = verdict.score >= PASS_THRESHOLD;
        let mut findings = Vec::new();
        if !passed {
            let message = if verdict.feedback.is_empty() {
                format!("Text does not match the {} tone.", tone.name())
            } else {
                format!("Tone ({}): {}", tone.name(), verdict.feedback)
            };
            findings.push(Finding::new(message, Severity::Warning));
        }

        Ok(EvaluationResult::new(NAME, verdict.score, passed, findings))
    }
}
