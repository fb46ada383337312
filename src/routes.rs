use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

/// Largest form body accepted. Lead and review forms are a few hundred bytes.
pub const MAX_FORM_BYTES: usize = 64 * 1024;

/// Form submission routes. The binary puts a rate limiter in front of these.
pub fn submission_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lead", post(handlers::lead_create))
        .route("/:lang/lead", post(handlers::lead_create_localized))
        .route("/reviews", post(handlers::review_create))
        .route("/:lang/reviews", post(handlers::review_create_localized))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
}

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/services", get(handlers::list_services))
        .route("/api/v1/contacts", get(handlers::contacts))
}

/// Attaches state and the cross-cutting layers.
pub fn finish(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    routes
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Full application without rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    finish(public_routes().merge(submission_routes()), state)
}
