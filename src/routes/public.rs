use crate::{AppState, guards, handlers};
use axum::{Router, middleware, routing::get};

/// Public Router Module
///
/// Endpoints accessible to any client, anonymous or logged-in. The
/// `allow_anonymous` policy never rejects; the identity context is still
/// established for every request, so a handler here may resolve the
/// principal itself when it wants to personalize a response.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /profile
        // Reports the caller's identity: `authenticated: false` for anonymous
        // requests, the resolved user otherwise.
        .route("/profile", get(handlers::get_profile))
        .route_layer(middleware::from_fn(guards::allow_anonymous))
}
