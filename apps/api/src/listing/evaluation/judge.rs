//! Parsing of `{score, feedback}` judge replies, shared by the tone and
//! fact-check scorers.
//!
//! Tiers: strict JSON object → free-text score extraction → neutral 0.5.
//! The tier is kept on the verdict so callers and logs can tell them apart.
//!
//! Scores live in [0, 1]. A bare number outside that range (`8`, `75`) has no
//! known scale and falls through to the free-text tier; only an explicit
//! percentage string (`"75%"`) is rescaled.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::llm_client::strip_json_fences;

pub const NEUTRAL_SCORE: f64 = 0.5;
const MAX_FEEDBACK_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Structured,
    Fallback,
    Neutral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub score: f64,
    pub feedback: String,
    pub source: VerdictSource,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    score: Value,
    #[serde(default)]
    feedback: Option<String>,
}

pub fn parse_judge_verdict(reply: &str) -> JudgeVerdict {
    let cleaned = strip_json_fences(reply).trim();

    if let Some(verdict) = parse_structured(cleaned) {
        return verdict;
    }

    let feedback = truncate(cleaned, MAX_FEEDBACK_CHARS);
    match extract_score(cleaned) {
        Some(score) => JudgeVerdict {
            score,
            feedback,
            source: VerdictSource::Fallback,
        },
        None => JudgeVerdict {
            score: NEUTRAL_SCORE,
            feedback,
            source: VerdictSource::Neutral,
        },
    }
}

fn parse_structured(text: &str) -> Option<JudgeVerdict> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let raw: RawVerdict = serde_json::from_str(&text[start..=end]).ok()?;
    let score = match raw.score {
        Value::Number(n) => unit_score(n.as_f64()?)?,
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(percent) => percent_score(percent.trim().parse::<f64>().ok()?)?,
                None => unit_score(s.parse::<f64>().ok()?)?,
            }
        }
        _ => return None,
    };
    Some(JudgeVerdict {
        score,
        feedback: raw.feedback.unwrap_or_default().trim().to_string(),
        source: VerdictSource::Structured,
    })
}

/// A decimal in [0, 1] (`0.85`) first, then a percentage (`85%`).
fn extract_score(text: &str) -> Option<f64> {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    let percent = PERCENT.get_or_init(|| {
        Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").expect("valid percent regex")
    });
    let decimal = DECIMAL.get_or_init(|| {
        Regex::new(r"(?:^|[^\d.])((?:0|1)?\.\d+|[01]\.0+)(?:[^\d]|$)").expect("valid decimal regex")
    });

    if let Some(value) = decimal
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .find_map(unit_score)
    {
        return Some(value);
    }

    percent
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .find_map(percent_score)
}

fn unit_score(score: f64) -> Option<f64> {
    (0.0..=1.0).contains(&score).then_some(score)
}

fn percent_score(percent: f64) -> Option<f64> {
    (0.0..=100.0).contains(&percent).then_some(percent / 100.0)
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
