//! Axum route handlers for the Listing API.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::listing::evaluation::EvaluationReport;
use crate::listing::options::{Language, ModelChoice, RunSettings, Tone, MAX_ITERATIONS_LIMIT};
use crate::listing::property::PropertyRecord;
use crate::listing::refinement::StopReason;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub property_data: Value,
    pub language: String,
    pub tone: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub run_id: Uuid,
    pub html: String,
    pub iterations: u32,
    pub refine_batches: u32,
    pub stop_reason: StopReason,
    pub evaluation: EvaluationReport,
}

#[derive(Debug, Serialize)]
pub struct LanguageOption {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ToneOption {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelOption {
    pub id: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IterationBounds {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub languages: Vec<LanguageOption>,
    pub tones: Vec<ToneOption>,
    pub models: Vec<ModelOption>,
    pub default_model: &'static str,
    pub max_iterations: IterationBounds,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/listings/options
///
/// Supported languages, tones, models and the iteration bounds.
pub async fn handle_options(State(state): State<AppState>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        languages: Language::ALL
            .iter()
            .map(|l| LanguageOption {
                code: l.code(),
                name: l.name(),
            })
            .collect(),
        tones: Tone::ALL
            .iter()
            .map(|t| ToneOption {
                key: t.key(),
                name: t.name(),
                description: t.description(),
            })
            .collect(),
        models: ModelChoice::ALL
            .iter()
            .map(|m| ModelOption {
                id: m.id(),
                description: m.description(),
            })
            .collect(),
        default_model: state.config.default_model.id(),
        max_iterations: IterationBounds {
            min: 0,
            max: MAX_ITERATIONS_LIMIT,
            default: state.config.default_max_iterations,
        },
    })
}

/// POST /api/v1/listings/generate
///
/// Validates the run settings, then runs the generate → evaluate → refine
/// loop. Only invalid input is an error; the page is always returned otherwise.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let settings = RunSettings::validate(
        &request.language,
        &request.tone,
        request.model.as_deref(),
        request.max_iterations,
        state.config.default_model,
        state.config.default_max_iterations,
    )?;
    let property = PropertyRecord::from_value(request.property_data)?;

    let run_id = Uuid::new_v4();
    let span = info_span!(
        "generation",
        %run_id,
        language = %settings.language,
        tone = %settings.tone,
        model = %settings.model,
        max_iterations = settings.max_iterations,
    );

    let outcome = async {
        info!("generation started");
        state.refinement.run(&property, &settings).await
    }
    .instrument(span)
    .await;

    Ok(Json(GenerateResponse {
        run_id,
        html: outcome.html,
        iterations: outcome.iterations,
        refine_batches: outcome.refine_batches,
        stop_reason: outcome.stop_reason,
        evaluation: outcome.evaluation,
    }))
}
