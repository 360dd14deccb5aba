use axum::{extract::DefaultBodyLimit, Router};

use crate::paste::routes as paste_routes;
use crate::state::AppState;

/// Room left in the request body for form boundaries and the small text
/// fields that ride along with a file.
const FORM_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_file_bytes.saturating_add(FORM_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    // Static paths must be registered alongside /{key}; matchit prefers them
    let paste_routes = Router::new()
        .route(
            "/",
            axum::routing::get(paste_routes::index).post(paste_routes::create_paste),
        )
        .route("/robots.txt", axum::routing::get(paste_routes::robots))
        .route("/{key}", axum::routing::get(paste_routes::resolve_key))
        .layer(DefaultBodyLimit::max(body_limit));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(health)
        .merge(paste_routes)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
