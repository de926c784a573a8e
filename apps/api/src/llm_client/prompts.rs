// Shared prompt fragments used by every caller of the completion backend.
// Each module that needs LLM calls defines its own prompts alongside it;
// this file only holds the cross-cutting pieces.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Appended to every section-writer persona.
pub const PLAIN_TEXT_ONLY: &str = "Only output the requested text. \
    Do NOT add explanations, questions, alternatives, labels, quotes or markdown.";

/// Appended to every judge persona.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Grounding rule shared by writers and the fix-instruction judge.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Only state facts present in the property data. \
    Do NOT invent rooms, amenities, distances or prices that are not listed.";

/// Fills `{name}` placeholders in one pass over `template`. Inserted values
/// are never rescanned, so model text containing `{property_data}` stays
/// literal. Unknown placeholders are left untouched.
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let placeholder = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder regex"));

    placeholder
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
