use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde_json::json;

use crate::{
    AppState,
    context::{CurrentUser, RequestIdentity},
    error::{ApiError, json_response},
    models::User,
};

/// get_me
///
/// [Authenticated Route] Returns the requesting user's profile. The identity
/// is resolved securely via the `CurrentUser` extractor; the guard layer has
/// already populated the request's principal cache, so this costs no extra
/// store fetch.
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// get_profile
///
/// [Public Route] Works for both anonymous and authenticated callers. This
/// handler runs under `allow_anonymous`, so it resolves the principal itself
/// and reports whichever identity it finds.
pub async fn get_profile(
    Extension(identity): Extension<Arc<RequestIdentity>>,
) -> Result<Response, ApiError> {
    match identity.resolve_principal().await? {
        Some(user) => Ok(json_response(
            json!({ "authenticated": true, "user": user }),
            StatusCode::OK,
        )),
        None => Ok(json_response(json!({ "authenticated": false }), StatusCode::OK)),
    }
}

/// list_users
///
/// [Admin Route] Lists every user account. The `require_admin` layer has
/// already rejected non-admin callers before this body runs.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

/// get_user
///
/// [Admin Route] Fetches a single user account by id, 404 when absent.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    match state.store.find_user(user_id).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::NotFound("User not found.".to_string())),
    }
}
