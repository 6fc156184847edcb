use std::sync::Arc;

use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
};

// --- Module Structure ---

// Core request-scoped identity and access-control machinery.
pub mod auth;
pub mod context;
pub mod guards;

// Observability: redaction engine and the request logging pipeline it feeds.
pub mod logging;
pub mod redact;

// Application glue: configuration, errors, persistence, handlers.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod store;

// Routing segregation by access policy (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point.
pub use auth::TokenVerifier;
pub use config::AppConfig;
pub use redact::FilterPolicy;
pub use store::{PostgresUserStore, UserStoreState};

/// AppState
///
/// The single, thread-safe, immutable container holding all shared services.
/// The verifier and redaction policy are compiled once from the configuration
/// at startup; per-request state lives in `RequestIdentity`, never here.
#[derive(Clone)]
pub struct AppState {
    /// Persistence collaborator: principal lookup behind a trait object.
    pub store: UserStoreState,
    /// Token verifier holding the immutable decoding key and validation rules.
    pub verifier: Arc<TokenVerifier>,
    /// Compiled sensitive-field redaction policy shared by the log pipeline.
    pub policy: Arc<FilterPolicy>,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Builds the shared state, compiling the verifier and redaction policy
    /// from the loaded configuration.
    pub fn new(store: UserStoreState, config: AppConfig) -> Self {
        let verifier = Arc::new(TokenVerifier::new(
            &config.secret_key,
            config.jwt_algorithm,
        ));
        let policy = Arc::new(FilterPolicy::new(&config.filter_params));

        Self {
            store,
            verifier,
            policy,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// These allow handlers and middleware to selectively pull components from the
// shared AppState.

impl FromRef<AppState> for UserStoreState {
    fn from_ref(app_state: &AppState) -> UserStoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's routing structure, applies global and scoped
/// middleware, and registers the application state.
///
/// Middleware order (outermost first):
/// 1. Request ID generation + propagation - correlation for every log line.
/// 2. `establish_identity` - verifies any bearer token once and attaches the
///    per-request identity context. Mandatory infrastructure for all routes.
/// 3. `request_logging` - sits inside the identity layer so it can read the
///    established context's subject id for correlation.
/// 4. Route tables, each wrapped by its guard policy (`allow_anonymous`,
///    `require_auth`, `require_admin`).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/admin", admin::admin_routes())
        // Inner layers first: logging runs inside identity establishment.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            logging::request_logging,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::establish_identity,
        ))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}
