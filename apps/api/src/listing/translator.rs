//! Issue → instruction translation.
//!
//! The judge model attributes every evaluator finding to one section and
//! phrases a `Problem: ...; Fix: ...` instruction for it. Replies are parsed
//! in tiers and the tier is returned explicitly:
//!
//! 1. `Structured`: a JSON object keyed by section name
//! 2. `Fallback`: a `SECTION: / Problem: / Fix:` transcript, any supported language
//! 3. `Failed`: nothing usable; the caller treats this as "no instructions"

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::listing::evaluation::EvaluationReport;
use crate::listing::options::{ModelChoice, RunSettings};
use crate::listing::oracle::ContentOracle;
use crate::listing::property::PropertyRecord;
use crate::listing::sections::{SectionContent, SectionKind};
use crate::llm_client::prompts::{fill_placeholders, GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::strip_json_fences;

const TRANSLATOR_PERSONA: &str = "You are a senior real estate copy editor. \
    You turn quality-check findings into precise edit instructions for individual sections of a listing page.";

const TRANSLATOR_PROMPT: &str = "\
A property listing page written in {language_name} with a {tone} tone failed some quality checks.

Findings:
{findings}

Current sections:
{sections}

Property data:
{property_data}

Attribute every finding to exactly ONE section. For each section write either \"none\" \
or one instruction in the form \"Problem: <what is wrong>; Fix: <what to change>\".

Reply with a JSON object with exactly these keys: {keys}";

// ────────────────────────────────────────────────────────────────────────────
// Instruction types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    /// Sentinel: leave the section as it is.
    None,
    Fix(String),
}

impl Instruction {
    /// Maps "none"-style replies (in any supported language) to the sentinel.
    pub fn from_reply(raw: &str) -> Self {
        let text = raw.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '`').trim();
        let key = text
            .trim_end_matches(['.', '!'])
            .trim()
            .to_lowercase();
        const NONE_WORDS: &[&str] = &[
            "",
            "none",
            "no",
            "n/a",
            "na",
            "null",
            "ok",
            "no changes",
            "no change",
            "no fix needed",
            "no changes needed",
            "nothing",
            "ninguno",
            "ninguna",
            "nada",
            "sin cambios",
            "nenhum",
            "nenhuma",
            "sem alterações",
            "sem alteracoes",
        ];
        if NONE_WORDS.contains(&key.as_str()) {
            Instruction::None
        } else {
            Instruction::Fix(text.to_string())
        }
    }

    pub fn as_fix(&self) -> Option<&str> {
        match self {
            Instruction::None => None,
            Instruction::Fix(text) => Some(text),
        }
    }
}

/// Per-section instructions for one iteration. Sections without an entry are
/// treated as `Instruction::None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FixInstructions {
    entries: BTreeMap<SectionKind, Instruction>,
}

impl FixInstructions {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: SectionKind) -> &Instruction {
        self.entries.get(&kind).unwrap_or(&Instruction::None)
    }

    pub fn insert(&mut self, kind: SectionKind, instruction: Instruction) {
        self.entries.insert(kind, instruction);
    }

    /// Sections with a real fix, in document order.
    pub fn actionable(&self) -> impl Iterator<Item = (SectionKind, &str)> + '_ {
        self.entries
            .iter()
            .filter_map(|(kind, instruction)| instruction.as_fix().map(|fix| (*kind, fix)))
    }

    pub fn is_actionable(&self) -> bool {
        self.actionable().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tiered reply parsing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Structured(FixInstructions),
    Fallback(FixInstructions),
    Failed,
}

impl ParseOutcome {
    /// Instructions to act on. `Failed` yields the empty set.
    pub fn into_instructions(self) -> FixInstructions {
        match self {
            ParseOutcome::Structured(i) | ParseOutcome::Fallback(i) => i,
            ParseOutcome::Failed => FixInstructions::empty(),
        }
    }
}

pub fn parse_instructions(reply: &str) -> ParseOutcome {
    let text = strip_json_fences(reply);
    if let Some(instructions) = parse_json_tier(text) {
        return ParseOutcome::Structured(instructions);
    }
    if let Some(instructions) = parse_transcript_tier(text) {
        return ParseOutcome::Fallback(instructions);
    }
    ParseOutcome::Failed
}

fn parse_json_tier(text: &str) -> Option<FixInstructions> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let object: Map<String, Value> = serde_json::from_str(&text[start..=end]).ok()?;

    let mut instructions = FixInstructions::empty();
    for (key, value) in &object {
        let Some(kind) = SectionKind::from_synonym(key) else {
            debug!(key = %key, "ignoring unknown section key in judge reply");
            continue;
        };
        let instruction = match value {
            Value::String(s) => Instruction::from_reply(s),
            Value::Null => Instruction::None,
            Value::Object(fields) => {
                let field = |names: &[&str]| {
                    fields
                        .iter()
                        .find(|(k, _)| names.contains(&k.to_lowercase().as_str()))
                        .and_then(|(_, v)| v.as_str())
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                };
                compose(
                    field(&["problem", "problema"]),
                    field(&["fix", "solution", "solución", "solucion", "correção", "correcao"]),
                )
            }
            _ => continue,
        };
        instructions.insert(kind, instruction);
    }

    if instructions.is_empty() {
        None
    } else {
        Some(instructions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Problem,
    Fix,
}

#[derive(Default)]
struct Block {
    kind: Option<SectionKind>,
    problem: String,
    fix: String,
}

fn parse_transcript_tier(text: &str) -> Option<FixInstructions> {
    let mut instructions = FixInstructions::empty();
    let mut block = Block::default();
    let mut field: Option<Field> = None;

    let mut flush = |block: &mut Block| {
        if let Some(kind) = block.kind.take() {
            let problem = Some(block.problem.trim()).filter(|s| !s.is_empty());
            let fix = Some(block.fix.trim()).filter(|s| !s.is_empty());
            instructions.insert(kind, compose(problem, fix));
        }
        block.problem.clear();
        block.fix.clear();
    };

    for line in text.lines() {
        let line = line
            .trim()
            .trim_start_matches(|c: char| c == '-' || c == '*' || c == '#' || c == '•')
            .trim();
        if line.is_empty() {
            continue;
        }

        let labeled = line.split_once(':').and_then(|(label, rest)| {
            transcript_label(label).map(|l| (l, rest.trim().trim_start_matches('*').trim()))
        });

        match labeled {
            Some((Label::Section, value)) => {
                flush(&mut block);
                field = None;
                block.kind = SectionKind::from_synonym(value);
            }
            Some((Label::Field(f), value)) => {
                field = Some(f);
                push_text(&mut block, f, value);
            }
            None => {
                if let Some(f) = field {
                    push_text(&mut block, f, line);
                }
            }
        }
    }
    flush(&mut block);

    if instructions.is_empty() {
        None
    } else {
        Some(instructions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Label {
    Section,
    Field(Field),
}

fn transcript_label(raw: &str) -> Option<Label> {
    let label = raw.trim().trim_matches('*').trim().to_lowercase();
    match label.as_str() {
        "section" | "sección" | "seccion" | "seção" | "secao" | "secção" => Some(Label::Section),
        "problem" | "problema" | "issue" => Some(Label::Field(Field::Problem)),
        "fix" | "solution" | "solución" | "solucion" | "corrección" | "correccion" | "correção"
        | "correcao" | "solução" | "solucao" => Some(Label::Field(Field::Fix)),
        _ => None,
    }
}

fn push_text(block: &mut Block, field: Field, text: &str) {
    let target = match field {
        Field::Problem => &mut block.problem,
        Field::Fix => &mut block.fix,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn compose(problem: Option<&str>, fix: Option<&str>) -> Instruction {
    let is_none = |s: Option<&str>| s.map_or(true, |s| Instruction::from_reply(s) == Instruction::None);
    if is_none(problem) && is_none(fix) {
        return Instruction::None;
    }
    match (problem, fix) {
        (Some(p), Some(f)) => Instruction::Fix(format!("Problem: {p}; Fix: {f}")),
        (Some(p), None) => Instruction::Fix(format!("Problem: {p}")),
        (None, Some(f)) => Instruction::Fix(format!("Fix: {f}")),
        (None, None) => Instruction::None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Translator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct IssueToInstructionTranslator {
    oracle: ContentOracle,
    model: ModelChoice,
}

impl IssueToInstructionTranslator {
    pub fn new(oracle: ContentOracle, model: ModelChoice) -> Self {
        Self { oracle, model }
    }

    /// Never fails: an oracle error or an unparseable reply yields the empty set.
    pub async fn translate(
        &self,
        content: &SectionContent,
        report: &EvaluationReport,
        property: &PropertyRecord,
        settings: &RunSettings,
    ) -> FixInstructions {
        if report.all_findings.is_empty() {
            debug!("no findings to translate");
            return FixInstructions::empty();
        }

        let prompt = build_prompt(content, report, property, settings);
        let system = format!("{TRANSLATOR_PERSONA} {GROUNDING_INSTRUCTION} {JSON_ONLY_SYSTEM}");

        let reply = match self.oracle.judge(self.model, &system, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "instruction judge failed; no instructions this iteration");
                return FixInstructions::empty();
            }
        };

        match parse_instructions(&reply) {
            ParseOutcome::Structured(instructions) => instructions,
            ParseOutcome::Fallback(instructions) => {
                debug!("instruction reply parsed from transcript format");
                instructions
            }
            ParseOutcome::Failed => {
                warn!(reply_chars = reply.chars().count(), "instruction reply could not be parsed");
                FixInstructions::empty()
            }
        }
    }
}

fn build_prompt(
    content: &SectionContent,
    report: &EvaluationReport,
    property: &PropertyRecord,
    settings: &RunSettings,
) -> String {
    let findings: Vec<String> = report
        .all_findings
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. [{:?}] {}", i + 1, f.severity, f.message))
        .collect();
    let sections: Vec<String> = SectionKind::ALL
        .iter()
        .map(|kind| format!("{}: {}", kind.key(), content.text_or_default(*kind)))
        .collect();
    let keys: Vec<String> = SectionKind::ALL
        .iter()
        .map(|kind| format!("\"{}\"", kind.key()))
        .collect();

    let property_data = property.to_prompt_json();
    let keys = keys.join(", ");
    let findings = findings.join("\n");
    let sections = sections.join("\n");
    fill_placeholders(
        TRANSLATOR_PROMPT,
        &[
            ("language_name", settings.language.name()),
            ("tone", settings.tone.name()),
            ("property_data", property_data.as_str()),
            ("keys", keys.as_str()),
            ("findings", findings.as_str()),
            ("sections", sections.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::listing::evaluation::{EvaluationResult, Finding, Severity};
    use crate::listing::oracle::tests::{oracle_with, settings, ScriptedBackend};
    use crate::llm_client::LlmError;

    fn failing_report() -> EvaluationReport {
        EvaluationReport::from_results(vec![EvaluationResult::new(
            "structural",
            0.6,
            false,
            vec![
                Finding::new("Title is 12 characters long.", Severity::Warning),
                Finding::new("Meta description is missing or empty.", Severity::Error),
            ],
        )])
    }

    fn content() -> SectionContent {
        [(SectionKind::Title, "Short".to_string())].into_iter().collect()
    }

    fn property() -> PropertyRecord {
        PropertyRecord::from_value(json!({"price": 320000})).unwrap()
    }

    #[test]
    fn test_none_sentinel_variants() {
        for raw in ["none", "None.", "\"NONE\"", "n/a", "ninguno", "Nenhuma", "  "] {
            assert_eq!(Instruction::from_reply(raw), Instruction::None, "{raw:?}");
        }
        assert!(matches!(
            Instruction::from_reply("Problem: too short; Fix: add the city"),
            Instruction::Fix(_)
        ));
    }

    #[test]
    fn test_structured_reply() {
        let reply = r#"{"title": "Problem: too short; Fix: mention Lisbon", "meta_description": "none", "footer": "x"}"#;
        let ParseOutcome::Structured(instructions) = parse_instructions(reply) else {
            panic!("expected structured outcome");
        };
        assert_eq!(
            instructions.get(SectionKind::Title),
            &Instruction::Fix("Problem: too short; Fix: mention Lisbon".to_string())
        );
        assert_eq!(instructions.get(SectionKind::MetaDescription), &Instruction::None);
        assert_eq!(instructions.get(SectionKind::H1), &Instruction::None);
        assert_eq!(instructions.actionable().count(), 1);
    }

    #[test]
    fn test_structured_reply_with_synonym_keys_and_nested_fields() {
        let reply = "```json\n{\"Meta Descripción\": {\"problema\": \"vacía\", \"solución\": \"escribir 120 caracteres\"}}\n```";
        let ParseOutcome::Structured(instructions) = parse_instructions(reply) else {
            panic!("expected structured outcome");
        };
        assert_eq!(
            instructions.get(SectionKind::MetaDescription),
            &Instruction::Fix("Problem: vacía; Fix: escribir 120 caracteres".to_string())
        );
    }

    #[test]
    fn test_all_none_reply_is_not_actionable() {
        let reply = r#"{"title": "none", "h1": "none", "description": "None"}"#;
        let instructions = parse_instructions(reply).into_instructions();
        assert!(!instructions.is_empty());
        assert!(!instructions.is_actionable());
    }

    #[test]
    fn test_transcript_fallback_in_portuguese() {
        let reply = "\
**SEÇÃO:** Título
Problema: muito curto
Correção: incluir o bairro
  e a cidade

SEÇÃO: Chamada para Ação
Problema: nenhum
Correção: nenhuma";
        let ParseOutcome::Fallback(instructions) = parse_instructions(reply) else {
            panic!("expected fallback outcome");
        };
        assert_eq!(
            instructions.get(SectionKind::Title),
            &Instruction::Fix("Problem: muito curto; Fix: incluir o bairro e a cidade".to_string())
        );
        assert_eq!(instructions.get(SectionKind::CallToAction), &Instruction::None);
    }

    #[test]
    fn test_transcript_unknown_section_is_dropped() {
        let reply = "SECTION: sidebar\nProblem: x\nFix: y\nSECTION: h1\nFix: use the city name";
        let instructions = parse_instructions(reply).into_instructions();
        assert_eq!(instructions.len(), 1);
        assert_eq!(
            instructions.get(SectionKind::H1),
            &Instruction::Fix("Fix: use the city name".to_string())
        );
    }

    #[test]
    fn test_garbage_reply_fails() {
        assert_eq!(parse_instructions("I think it is fine overall."), ParseOutcome::Failed);
        assert_eq!(parse_instructions("{not json"), ParseOutcome::Failed);
        assert!(parse_instructions("").into_instructions().is_empty());
    }

    #[tokio::test]
    async fn test_translate_routes_by_key() {
        let backend = ScriptedBackend::new(|_, _| {
            Ok(r#"{"title": "Problem: 12 chars; Fix: expand to 40", "meta_description": "Problem: empty; Fix: write one", "h1": "none"}"#.to_string())
        });
        let translator = IssueToInstructionTranslator::new(oracle_with(backend.clone()), ModelChoice::Gemma3OneBitQat);
        let instructions = translator
            .translate(&content(), &failing_report(), &property(), &settings())
            .await;

        let kinds: Vec<SectionKind> = instructions.actionable().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![SectionKind::Title, SectionKind::MetaDescription]);

        let prompts = backend.prompts.lock().unwrap();
        let prompt = &prompts[0].1;
        assert!(prompt.contains("1. [Warning] Title is 12 characters long."));
        assert!(prompt.contains("title: Short"));
        assert!(prompt.contains("call_to_action: Contact us for more information"));
        assert!(prompt.contains("\"key_features\""));
    }

    #[test]
    fn test_prompt_keeps_placeholder_text_from_sections_literal() {
        let content: SectionContent = [(SectionKind::Title, "Offer {property_data} {findings}".to_string())]
            .into_iter()
            .collect();
        let prompt = build_prompt(&content, &failing_report(), &property(), &settings());
        assert!(prompt.contains("title: Offer {property_data} {findings}"), "{prompt}");
        assert_eq!(prompt.matches("320000").count(), 1);
    }

    #[tokio::test]
    async fn test_translate_without_findings_skips_judge() {
        let backend = ScriptedBackend::new(|_, _| Ok("{}".to_string()));
        let translator = IssueToInstructionTranslator::new(oracle_with(backend.clone()), ModelChoice::Gemma3OneBitQat);
        let report = EvaluationReport::from_results(vec![EvaluationResult::new("x", 0.2, false, Vec::new())]);
        let instructions = translator
            .translate(&content(), &report, &property(), &settings())
            .await;
        assert!(instructions.is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translate_judge_failure_yields_empty_set() {
        let backend = ScriptedBackend::new(|_, _| Err(LlmError::EmptyContent));
        let translator = IssueToInstructionTranslator::new(oracle_with(backend), ModelChoice::Gemma3OneBitQat);
        let instructions = translator
            .translate(&content(), &failing_report(), &property(), &settings())
            .await;
        assert!(!instructions.is_actionable());
    }
}
