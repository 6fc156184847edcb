use axum::{extract::Request, middleware::Next, response::Response};
use std::sync::Arc;

use crate::{context::RequestIdentity, error::ApiError};

/// Guard Policies
///
/// Three composable wrappers applied to route tables via `route_layer`, each
/// implementing the uniform `(request, next) -> response` middleware contract.
/// Guards only *enforce* identity; establishing it is the job of the entry
/// middleware, which runs for every route regardless of policy.
///
/// A rejection is fatal to the request: it short-circuits to a structured
/// error response and the wrapped handler body never executes.

fn identity_of(request: &Request) -> Result<Arc<RequestIdentity>, ApiError> {
    request
        .extensions()
        .get::<Arc<RequestIdentity>>()
        .cloned()
        // Missing context means the entry middleware was not applied;
        // fail closed.
        .ok_or_else(ApiError::not_authorized)
}

/// require_auth
///
/// Forces principal resolution before the handler runs. An anonymous request,
/// an invalid token, or a subject id with no matching user all reject with
/// 401 "Authentication Failed". On success the resolved principal sits in the
/// request's identity cache, so handlers extracting `CurrentUser` pay no
/// second store fetch.
pub async fn require_auth(request: Request, next: Next) -> Result<Response, ApiError> {
    let identity = identity_of(&request)?;

    match identity.resolve_principal().await? {
        Some(_) => Ok(next.run(request).await),
        None => Err(ApiError::not_authorized()),
    }
}

/// require_admin
///
/// Same resolution as `require_auth` plus a role check. A resolved principal
/// whose role is not `admin` rejects with 403 "Admin access required". The
/// check is a pure gate - the handler never observes a partially authorized
/// request.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let identity = identity_of(&request)?;

    match identity.resolve_principal().await? {
        Some(user) if user.role == "admin" => Ok(next.run(request).await),
        Some(_) => Err(ApiError::admin_required()),
        None => Err(ApiError::not_authorized()),
    }
}

/// allow_anonymous
///
/// Never rejects and does not force resolution. Handlers under this policy
/// that need the principal call `resolve_principal()` themselves and handle
/// the absent case. Kept as an explicit no-op layer so every route table
/// names its access policy.
pub async fn allow_anonymous(request: Request, next: Next) -> Response {
    next.run(request).await
}
