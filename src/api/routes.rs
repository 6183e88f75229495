//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers;
use super::handlers::AppState;

/// JSON endpoints, mounted under `/api`
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Conversation
        .route("/chat", post(handlers::chat))
        .route("/conversation", get(handlers::conversation))
        .route("/reset", post(handlers::reset))
        // Export
        .route("/download", post(handlers::download))
        .route("/email", post(handlers::email))
        .with_state(state)
}

/// Page plus API, without transport middleware
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .nest("/api", api_routes(state))
}
