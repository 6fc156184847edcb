use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppState, context::RequestIdentity};

/// Claims
///
/// The payload structure expected inside a JSON Web Token. These claims are
/// signed with the server's secret and verified on every inbound request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (sub): the user's primary key, used later for principal lookup.
    pub sub: i64,
    /// Role claim carried for reference; authorization decisions use the
    /// role stored on the resolved principal, not the token copy.
    pub role: String,
    /// Expiration time (exp): timestamp after which the token is rejected.
    pub exp: usize,
}

/// VerificationError
///
/// The two outcomes of a failed verification. `NoToken` is not really an
/// error - the request simply carried no credentials and proceeds as
/// anonymous. `InvalidToken` deliberately collapses every failure mode
/// (expired, malformed, bad signature): the only action ever taken is
/// "treat as unauthenticated", so callers have nothing to distinguish.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("no bearer token present")]
    NoToken,
    #[error("token verification failed")]
    InvalidToken,
}

/// TokenVerifier
///
/// Validates a signed bearer token's integrity and expiry and extracts its
/// claims. Built once at startup from the configured secret and algorithm;
/// both are immutable afterwards, so `verify` is a pure function of its input
/// and safe to call concurrently without synchronization.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, algorithm: jsonwebtoken::Algorithm) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        // Validation::new enforces `exp` by default; keep it explicit.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;

        Self {
            decoding_key,
            validation,
        }
    }

    /// verify
    ///
    /// Checks an `Authorization` header value. Anything other than
    /// `"Bearer <token>"` yields `NoToken`; a token that fails decoding,
    /// signature, or expiry checks yields `InvalidToken`. No side effects.
    pub fn verify(&self, raw_header: Option<&str>) -> Result<Claims, VerificationError> {
        let header_value = raw_header.ok_or(VerificationError::NoToken)?;
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(VerificationError::NoToken)?;

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| VerificationError::InvalidToken)
    }
}

/// establish_identity
///
/// The entry middleware applied to every route. It runs the token verifier
/// exactly once per request - before any guard decision - and stores the
/// resulting subject id (or none) in a fresh `RequestIdentity` attached to
/// the request's extensions. No storage access happens here; the principal
/// is fetched lazily on first use.
pub async fn establish_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let raw_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    // Both failure modes mean the same thing downstream: anonymous.
    let subject_id = state.verifier.verify(raw_header).map(|c| c.sub).ok();

    let identity = RequestIdentity::establish(subject_id, state.store.clone());
    request.extensions_mut().insert(identity);

    next.run(request).await
}
