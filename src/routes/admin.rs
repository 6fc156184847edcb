use crate::{AppState, guards, handlers};
use axum::{Router, middleware, routing::get};

/// Admin Router Module
///
/// Routes exclusively accessible to users with the 'admin' role. The
/// `require_admin` layer authenticates and then checks the role, rejecting
/// with 403 ("Admin access required") before any handler here executes.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Lists all user accounts for administrative oversight.
        .route("/users", get(handlers::list_users))
        // GET /admin/users/{id}
        // Retrieves a single account; 404 when the id is unknown.
        .route("/users/{id}", get(handlers::get_user))
        .route_layer(middleware::from_fn(guards::require_admin))
}
