mod config;
mod errors;
mod listing;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::listing::evaluation::{EvaluatorAggregator, Lexicon, WordListLexicon};
use crate::listing::oracle::ContentOracle;
use crate::listing::prompts::PromptCatalog;
use crate::listing::refinement::RefinementLoop;
use crate::listing::translator::IssueToInstructionTranslator;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid env values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Listing API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client (the per-call timeout is enforced by the oracle;
    // the HTTP timeout is a backstop slightly above it)
    let llm = LlmClient::new(
        config.ollama_url.clone(),
        config.oracle_timeout + std::time::Duration::from_secs(5),
    )
    .context("failed to build HTTP client for the model server")?;
    info!(
        "LLM client initialized (url: {}, default model: {}, judge model: {})",
        config.ollama_url, config.default_model, config.judge_model
    );

    let oracle = ContentOracle::new(
        Arc::new(llm),
        Arc::new(PromptCatalog::builtin()),
        config.oracle_timeout,
    );

    // Lexicons for the language-match scorer
    let lexicon = match &config.lexicon_dir {
        Some(dir) => WordListLexicon::load_dir(dir)
            .with_context(|| format!("failed to load lexicons from {}", dir.display()))?,
        None => {
            warn!("LEXICON_DIR not set; language-match scoring will degrade to neutral");
            WordListLexicon::empty()
        }
    };
    let lexicon: Arc<dyn Lexicon> = Arc::new(lexicon);

    let aggregator = EvaluatorAggregator::standard(
        oracle.clone(),
        lexicon,
        config.judge_model,
        config.enable_fact_check,
    );
    info!("Scorers: {:?}", aggregator.evaluator_names());

    let translator = IssueToInstructionTranslator::new(oracle.clone(), config.judge_model);
    let refinement = RefinementLoop::new(oracle, aggregator, translator);

    // Build app state
    let state = AppState {
        config: config.clone(),
        refinement,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
