pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::listing::handlers;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Listing API
        .route("/api/v1/listings/options", get(handlers::handle_options))
        .route("/api/v1/listings/generate", post(handlers::handle_generate))
        .fallback(not_found)
        .with_state(state)
}
