use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Value, json};
use thiserror::Error;

use crate::store::StoreError;

/// ApiError
///
/// The request-terminating error taxonomy. Every variant maps to a structured
/// JSON body of the shape `{"errors": {"message": ...}, "timestamp": ...}` so
/// clients see a uniform envelope regardless of where the failure originated.
///
/// Guard rejections (`NotAuthorized`, `Forbidden`) are deterministic and never
/// retried; a store failure surfaces as a generic 500 without leaking the cause.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 - missing or unverifiable identity.
    #[error("{0}")]
    NotAuthorized(String),

    /// 403 - authenticated but lacking the required role.
    #[error("{0}")]
    Forbidden(String),

    /// 404 - a referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// 500 - the user store could not be reached. The underlying cause is
    /// logged server-side; the client only sees a generic message.
    #[error("Internal server error")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// The default 401 rejection used by `require_auth` and the identity extractor.
    pub fn not_authorized() -> Self {
        ApiError::NotAuthorized("Authentication Failed".to_string())
    }

    /// The 403 rejection used by `require_admin` when the role check fails.
    pub fn admin_required() -> Self {
        ApiError::Forbidden("Admin access required".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store(ref cause) = self {
            tracing::error!("user store failure: {:?}", cause);
        }

        let status = self.status();
        json_response(json!({ "errors": { "message": self.to_string() } }), status)
    }
}

/// json_response
///
/// Builds a JSON response with the given status, appending a UTC ISO-8601
/// `timestamp` field to the top-level object. All error envelopes (and any
/// handler that opts in) go through this helper so response shape stays uniform.
pub fn json_response(data: Value, status: StatusCode) -> Response {
    let mut body = data;
    if let Some(map) = body.as_object_mut() {
        map.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
    }
    (status, Json(body)).into_response()
}
