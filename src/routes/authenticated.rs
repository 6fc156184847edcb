use crate::{AppState, guards, handlers};
use axum::{Router, middleware, routing::get};

/// Authenticated Router Module
///
/// Routes accessible to any user with a resolvable principal. The
/// `require_auth` layer rejects with 401 before any handler here executes,
/// and leaves the resolved principal in the request's identity cache for the
/// `CurrentUser` extractor.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /users/me
        // Retrieves the currently authenticated user's profile.
        .route("/users/me", get(handlers::get_me))
        .route_layer(middleware::from_fn(guards::require_auth))
}
