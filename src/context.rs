use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::ApiError,
    models::User,
    store::{StoreError, UserStoreState},
};

/// PrincipalCache
///
/// Tri-state cache for the resolved principal. `NotFetched` means the lookup
/// has not been attempted yet; `Absent` means it was attempted and found
/// nothing. Collapsing the two into a bare `Option` would force a redundant
/// store fetch on every guard check within the same request, so the
/// distinction is kept as a proper enum.
#[derive(Debug, Clone)]
pub enum PrincipalCache {
    NotFetched,
    Absent,
    Present(User),
}

/// RequestIdentity
///
/// Per-request identity state. Created by the entry middleware before any
/// guard or handler runs, attached to the request's extensions, and dropped
/// when the request completes. Concurrent requests each get an independent
/// instance - there is no cross-request sharing or caching.
///
/// The cache transitions `NotFetched → {Absent | Present}` exactly once per
/// request and never reverts. A store *failure* is the one exception: the
/// lookup did not complete, so the cache stays `NotFetched` and the error
/// propagates to the caller.
pub struct RequestIdentity {
    /// Set once from the verified token's `sub` claim; immutable afterwards.
    subject_id: Option<i64>,
    store: UserStoreState,
    cache: Mutex<PrincipalCache>,
}

impl RequestIdentity {
    /// establish
    ///
    /// Called exactly once per request by the entry middleware. Stores the
    /// subject id (or none for anonymous requests) and initializes the
    /// principal cache to `NotFetched`.
    pub fn establish(subject_id: Option<i64>, store: UserStoreState) -> Arc<Self> {
        Arc::new(Self {
            subject_id,
            store,
            cache: Mutex::new(PrincipalCache::NotFetched),
        })
    }

    /// The unauthenticated claim set by the middleware. Used by the logging
    /// pipeline for correlation; reading it never triggers a store fetch.
    pub fn subject_id(&self) -> Option<i64> {
        self.subject_id
    }

    /// resolve_principal
    ///
    /// Returns the authenticated user, fetching it from the store on first
    /// call and answering from the cache on every later call in the same
    /// request. Requests with no subject id short-circuit to `Absent`
    /// without ever touching the store.
    ///
    /// The store checkout is scoped to the single query inside `find_user`;
    /// no connection is held across the request.
    pub async fn resolve_principal(&self) -> Result<Option<User>, StoreError> {
        let mut cache = self.cache.lock().await;

        match &*cache {
            PrincipalCache::Present(user) => return Ok(Some(user.clone())),
            PrincipalCache::Absent => return Ok(None),
            PrincipalCache::NotFetched => {}
        }

        let Some(id) = self.subject_id else {
            *cache = PrincipalCache::Absent;
            return Ok(None);
        };

        // The `?` leaves the cache untouched on failure: only a completed
        // lookup is allowed to transition it.
        let fetched = self.store.find_user(id).await?;

        match fetched {
            Some(user) => {
                *cache = PrincipalCache::Present(user.clone());
                Ok(Some(user))
            }
            None => {
                *cache = PrincipalCache::Absent;
                Ok(None)
            }
        }
    }
}

/// CurrentUser Extractor
///
/// Handler-facing access to the resolved principal. Usable as a function
/// argument in any handler running under `require_auth` (or any handler that
/// wants to force resolution itself). Because resolution is cached on the
/// request's `RequestIdentity`, extracting `CurrentUser` after a guard has
/// already resolved costs no additional store fetch.
///
/// Rejection: 401 when no principal can be resolved, 500 when the store is
/// unreachable.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<Arc<RequestIdentity>>()
            .cloned()
            // Reaching a handler without the entry middleware is a wiring
            // bug; treat the request as unauthenticated rather than panic.
            .ok_or_else(ApiError::not_authorized)?;

        match identity.resolve_principal().await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(ApiError::not_authorized()),
        }
    }
}
