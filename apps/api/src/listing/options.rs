//! Closed option sets for a generation run: language, tone, model and the
//! iteration bound. Everything a caller sends is validated into `RunSettings`
//! before any generation starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound accepted for `max_iterations`.
pub const MAX_ITERATIONS_LIMIT: u32 = 10;
pub const DEFAULT_MAX_ITERATIONS: u32 = 1;

/// Request-level failures. These are the only errors a caller ever sees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Unsupported tone: {0}")]
    UnsupportedTone(String),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("max_iterations must be between 0 and {MAX_ITERATIONS_LIMIT}, got {0}")]
    IterationLimit(u32),

    #[error("property_data must be a JSON object")]
    PropertyNotObject,
}

// ────────────────────────────────────────────────────────────────────────────
// Language
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Pt,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Es, Language::Pt];

    pub fn parse(code: &str) -> Result<Self, ConfigurationError> {
        match code.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            "pt" => Ok(Language::Pt),
            other => Err(ConfigurationError::UnsupportedLanguage(other.to_string())),
        }
    }

    /// ISO code, also used for `<html lang>` and lexicon file names.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Pt => "pt",
        }
    }

    /// Native display name, as written into prompts.
    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Español",
            Language::Pt => "Português",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tone
// ────────────────────────────────────────────────────────────────────────────

/// Named tone profiles. The description is what writers and the tone judge see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    Professional,
    Luxury,
    InvestorFocused,
    FamilyOriented,
    Modern,
    Classic,
    Youthful,
}

impl Tone {
    pub const ALL: [Tone; 7] = [
        Tone::Professional,
        Tone::Luxury,
        Tone::InvestorFocused,
        Tone::FamilyOriented,
        Tone::Modern,
        Tone::Classic,
        Tone::Youthful,
    ];

    pub fn parse(key: &str) -> Result<Self, ConfigurationError> {
        let key = key.trim().to_lowercase();
        Tone::ALL
            .into_iter()
            .find(|t| t.key() == key)
            .ok_or(ConfigurationError::UnsupportedTone(key))
    }

    pub fn key(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Luxury => "luxury",
            Tone::InvestorFocused => "investor-focused",
            Tone::FamilyOriented => "family-oriented",
            Tone::Modern => "modern",
            Tone::Classic => "classic",
            Tone::Youthful => "youthful",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Luxury => "Luxury",
            Tone::InvestorFocused => "Investor-Focused",
            Tone::FamilyOriented => "Family-Oriented",
            Tone::Modern => "Modern",
            Tone::Classic => "Classic",
            Tone::Youthful => "Youthful",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tone::Professional => {
                "Polished, trustworthy, and informative. Present facts clearly without hype."
            }
            Tone::Luxury => {
                "Sophisticated, exclusive, and premium. Highlight high-end finishes, amenities, and prestige."
            }
            Tone::InvestorFocused => {
                "Data-driven, analytical, and ROI-oriented. Emphasize investment potential, rental yield, and market growth."
            }
            Tone::FamilyOriented => {
                "Welcoming, safe, and community-focused. Highlight schools, parks, and family-friendly features."
            }
            Tone::Modern => {
                "Contemporary, trendy, and innovative. Emphasize new technology, design, and urban lifestyle."
            }
            Tone::Classic => {
                "Timeless, elegant, and traditional. Highlight architectural details, heritage, and enduring value."
            }
            Tone::Youthful => {
                "Joyful, vibrant, and affordable. Highlight fun activities, social life, and low price for young buyers."
            }
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Model allow-list
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelChoice {
    #[serde(rename = "gemma3n:e2b")]
    Gemma3nE2b,
    #[serde(rename = "gemma3:1b-it-qat")]
    Gemma3OneBitQat,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 2] = [ModelChoice::Gemma3nE2b, ModelChoice::Gemma3OneBitQat];

    pub fn parse(id: &str) -> Result<Self, ConfigurationError> {
        let id = id.trim();
        ModelChoice::ALL
            .into_iter()
            .find(|m| m.id() == id)
            .ok_or_else(|| ConfigurationError::UnsupportedModel(id.to_string()))
    }

    /// Identifier sent to the model server.
    pub fn id(self) -> &'static str {
        match self {
            ModelChoice::Gemma3nE2b => "gemma3n:e2b",
            ModelChoice::Gemma3OneBitQat => "gemma3:1b-it-qat",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModelChoice::Gemma3nE2b => "Recommended high-performance model with optimized efficiency",
            ModelChoice::Gemma3OneBitQat => "Lightweight quantized model for faster inference",
        }
    }
}

impl std::fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run settings
// ────────────────────────────────────────────────────────────────────────────

/// Validated per-run configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSettings {
    pub language: Language,
    pub tone: Tone,
    pub model: ModelChoice,
    pub max_iterations: u32,
}

impl RunSettings {
    /// Validates raw caller input. Missing `model` / `max_iterations` fall back
    /// to the service defaults.
    pub fn validate(
        language: &str,
        tone: &str,
        model: Option<&str>,
        max_iterations: Option<u32>,
        default_model: ModelChoice,
        default_max_iterations: u32,
    ) -> Result<Self, ConfigurationError> {
        let language = Language::parse(language)?;
        let tone = Tone::parse(tone)?;
        let model = match model {
            Some(id) => ModelChoice::parse(id)?,
            None => default_model,
        };
        let max_iterations = max_iterations.unwrap_or(default_max_iterations);
        if max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigurationError::IterationLimit(max_iterations));
        }
        Ok(Self {
            language,
            tone,
            model,
            max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse_is_case_insensitive() {
        assert_eq!(Language::parse("ES").unwrap(), Language::Es);
        assert_eq!(Language::parse(" pt ").unwrap(), Language::Pt);
    }

    #[test]
    fn test_unknown_language_rejected() {
        assert_eq!(
            Language::parse("fr"),
            Err(ConfigurationError::UnsupportedLanguage("fr".to_string()))
        );
    }

    #[test]
    fn test_every_tone_round_trips_through_key() {
        for tone in Tone::ALL {
            assert_eq!(Tone::parse(tone.key()).unwrap(), tone);
            assert!(!tone.description().is_empty());
        }
    }

    #[test]
    fn test_tone_serde_uses_kebab_case() {
        let tone: Tone = serde_json::from_str(r#""family-oriented""#).unwrap();
        assert_eq!(tone, Tone::FamilyOriented);
    }

    #[test]
    fn test_model_allow_list() {
        assert_eq!(
            ModelChoice::parse("gemma3:1b-it-qat").unwrap(),
            ModelChoice::Gemma3OneBitQat
        );
        assert!(matches!(
            ModelChoice::parse("gpt-4o"),
            Err(ConfigurationError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_run_settings_applies_defaults() {
        let settings =
            RunSettings::validate("en", "professional", None, None, ModelChoice::Gemma3nE2b, 2)
                .unwrap();
        assert_eq!(settings.model, ModelChoice::Gemma3nE2b);
        assert_eq!(settings.max_iterations, 2);
    }

    #[test]
    fn test_run_settings_accepts_zero_iterations() {
        let settings = RunSettings::validate(
            "en",
            "luxury",
            Some("gemma3n:e2b"),
            Some(0),
            ModelChoice::Gemma3nE2b,
            1,
        )
        .unwrap();
        assert_eq!(settings.max_iterations, 0);
    }

    #[test]
    fn test_run_settings_rejects_iteration_overflow() {
        let err = RunSettings::validate(
            "en",
            "luxury",
            None,
            Some(MAX_ITERATIONS_LIMIT + 1),
            ModelChoice::Gemma3nE2b,
            1,
        )
        .unwrap_err();
        assert_eq!(err, ConfigurationError::IterationLimit(MAX_ITERATIONS_LIMIT + 1));
    }

    #[test]
    fn test_run_settings_rejects_bad_tone_before_model() {
        let err = RunSettings::validate(
            "en",
            "sarcastic",
            Some("not-a-model"),
            None,
            ModelChoice::Gemma3nE2b,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedTone(_)));
    }
}
