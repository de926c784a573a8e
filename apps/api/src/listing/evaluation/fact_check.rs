//! Optional fact checker: the judge compares the page text with the property
//! data and flags claims the data does not support. Passes at ≥ 0.7.
//! Only wired in when `ENABLE_FACT_CHECK` is set.

use async_trait::async_trait;

use crate::listing::evaluation::judge::parse_judge_verdict;
use crate::listing::evaluation::{
    EvaluationInput, EvaluationResult, EvaluatorError, Finding, SectionEvaluator, Severity,
};
use crate::listing::options::ModelChoice;
use crate::listing::oracle::ContentOracle;
use crate::llm_client::prompts::{fill_placeholders, JSON_ONLY_SYSTEM};

pub const NAME: &str = "fact_check";
pub const PASS_THRESHOLD: f64 = 0.7;

const FACT_JUDGE_PERSONA: &str =
    "You are a meticulous fact checker for real estate listings.";

const FACT_JUDGE_PROMPT: &str = "\
Compare the listing text with the property data. Every number, room, amenity and \
location claim in the text must be supported by the data.

Property data:
{property_data}

Listing text:
\"\"\"
{text}
\"\"\"

Reply with a JSON object: {\"score\": <1 if fully accurate, lower for each unsupported claim, 0 to 1>, \"feedback\": \"<list the unsupported claims>\"}";

pub struct FactCheckScorer {
    oracle: ContentOracle,
    model: ModelChoice,
}

impl FactCheckScorer {
    pub fn new(oracle: ContentOracle, model: ModelChoice) -> Self {
        Self { oracle, model }
    }
}

#[async_trait]
impl SectionEvaluator for FactCheckScorer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<EvaluationResult, EvaluatorError> {
        let property_data = input.property.to_prompt_json();
        let prompt = fill_placeholders(
            FACT_JUDGE_PROMPT,
            &[("property_data", property_data.as_str()), ("text", input.text)],
        );
        let system = format!("{FACT_JUDGE_PERSONA} {JSON_ONLY_SYSTEM}");

        let reply = self.oracle.judge(self.model, &system, &prompt).await?;
        let verdict = parse_judge_verdict(&reply);

        let passed = verdict.score >= PASS_THRESHOLD;
        let mut findings = Vec::new();
        if !passed {
            let detail = if verdict.feedback.is_empty() {
                "some claims are not supported by the property data".to_string()
            } else {
                verdict.feedback
            };
            findings.push(Finding::new(
                format!("Factual accuracy: {detail}"),
                Severity::Error,
            ));
        }

        Ok(EvaluationResult::new(NAME, verdict.score, passed, findings))
    }
}
