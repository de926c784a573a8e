use crate::config::Config;
use crate::listing::refinement::RefinementLoop;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Fully wired generation pipeline: oracle, scorers and translator.
    pub refinement: RefinementLoop,
}
