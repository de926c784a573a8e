use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::listing::options::{ModelChoice, DEFAULT_MAX_ITERATIONS, MAX_ITERATIONS_LIMIT};

/// Application configuration loaded from environment variables.
/// Every variable has a default; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_url: String,
    pub default_model: ModelChoice,
    /// Model behind the tone / fact judges and the instruction translator.
    pub judge_model: ModelChoice,
    pub default_max_iterations: u32,
    pub oracle_timeout: Duration,
    /// Directory with `<code>.txt` word lists for the language-match scorer.
    pub lexicon_dir: Option<PathBuf>,
    pub enable_fact_check: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let default_model = ModelChoice::parse(&var("DEFAULT_MODEL", "gemma3n:e2b"))
            .context("DEFAULT_MODEL must be a supported model")?;
        let judge_model = ModelChoice::parse(&var("JUDGE_MODEL", "gemma3:1b-it-qat"))
            .context("JUDGE_MODEL must be a supported model")?;

        let default_max_iterations = var("DEFAULT_MAX_ITERATIONS", &DEFAULT_MAX_ITERATIONS.to_string())
            .parse::<u32>()
            .context("DEFAULT_MAX_ITERATIONS must be a non-negative integer")?;
        if default_max_iterations > MAX_ITERATIONS_LIMIT {
            bail!("DEFAULT_MAX_ITERATIONS must be at most {MAX_ITERATIONS_LIMIT}");
        }

        let timeout_secs = var("ORACLE_TIMEOUT_SECS", "120")
            .parse::<u64>()
            .context("ORACLE_TIMEOUT_SECS must be a whole number of seconds")?;
        if timeout_secs == 0 {
            bail!("ORACLE_TIMEOUT_SECS must be greater than zero");
        }

        let enable_fact_check = parse_flag(&var("ENABLE_FACT_CHECK", "false"))
            .context("ENABLE_FACT_CHECK must be true or false")?;

        Ok(Config {
            ollama_url: var("OLLAMA_URL", "http://localhost:11434"),
            default_model,
            judge_model,
            default_max_iterations,
            oracle_timeout: Duration::from_secs(timeout_secs),
            lexicon_dir: lookup("LEXICON_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            enable_fact_check,
            port: var("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG", "info"),
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("unrecognized flag value '{other}'"),
    }
}
