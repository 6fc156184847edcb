use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use todo_api::{
    AppState,
    auth::Claims,
    config::AppConfig,
    create_router,
    models::User,
    store::{StoreError, UserStore, UserStoreState},
};
use tower::ServiceExt;

// --- Mock Store ---

#[derive(Default)]
struct MockStore {
    users: Vec<User>,
    fail: bool,
}

#[async_trait]
impl UserStore for MockStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(self.users.clone())
    }
}

// --- Helpers ---

fn test_user(id: i64, role: &str) -> User {
    User {
        id,
        email: format!("user{}@example.com", id),
        username: format!("user{}", id),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role: role.to_string(),
        is_active: true,
    }
}

fn app_state(users: Vec<User>) -> AppState {
    let store = Arc::new(MockStore {
        users,
        fail: false,
    }) as UserStoreState;
    AppState::new(store, AppConfig::default())
}

fn failing_app_state() -> AppState {
    let store = Arc::new(MockStore {
        users: vec![],
        fail: true,
    }) as UserStoreState;
    AppState::new(store, AppConfig::default())
}

fn create_token(state: &AppState, sub: i64, role: &str, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let claims = Claims {
        sub,
        role: role.to_string(),
        exp: (now + exp_offset) as usize,
    };
    let key = EncodingKey::from_secret(state.config.secret_key.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Public routes ---

#[tokio::test]
async fn health_check_is_open_to_anonymous_clients() {
    let app = create_router(app_state(vec![]));
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn profile_reports_anonymous_without_token() {
    let app = create_router(app_state(vec![test_user(1, "user")]));
    let response = app.oneshot(get("/profile", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["authenticated"], Value::Bool(false));
}

#[tokio::test]
async fn profile_reports_resolved_user_with_valid_token() {
    let state = app_state(vec![test_user(1, "user")]);
    let token = create_token(&state, 1, "user", 3600);
    let app = create_router(state);

    let response = app.oneshot(get("/profile", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["authenticated"], Value::Bool(true));
    assert_eq!(body["user"]["username"], Value::String("user1".to_string()));
}

#[tokio::test]
async fn expired_token_is_treated_as_anonymous_on_optional_routes() {
    let state = app_state(vec![test_user(1, "user")]);
    let token = create_token(&state, 1, "user", -3600);
    let app = create_router(state);

    let response = app.oneshot(get("/profile", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["authenticated"], Value::Bool(false));
}

// --- require_auth ---

#[tokio::test]
async fn users_me_rejects_missing_token_with_401_envelope() {
    let app = create_router(app_state(vec![test_user(1, "user")]));
    let response = app.oneshot(get("/users/me", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(
        body["errors"]["message"],
        Value::String("Authentication Failed".to_string())
    );
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn users_me_rejects_garbage_token() {
    let app = create_router(app_state(vec![test_user(1, "user")]));
    let response = app
        .oneshot(get("/users/me", Some("not-a-real-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_me_rejects_token_for_deleted_user() {
    // Valid signature but the subject no longer exists in the store.
    let state = app_state(vec![]);
    let token = create_token(&state, 1, "user", 3600);
    let app = create_router(state);

    let response = app.oneshot(get("/users/me", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_me_returns_resolved_profile() {
    let state = app_state(vec![test_user(1, "user")]);
    let token = create_token(&state, 1, "user", 3600);
    let app = create_router(state);

    let response = app.oneshot(get("/users/me", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], Value::from(1));
    assert_eq!(body["username"], Value::String("user1".to_string()));
}

#[tokio::test]
async fn store_failure_surfaces_as_generic_500() {
    let state = failing_app_state();
    let token = create_token(&state, 1, "user", 3600);
    let app = create_router(state);

    let response = app.oneshot(get("/users/me", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(
        body["errors"]["message"],
        Value::String("Internal server error".to_string())
    );
}

// --- require_admin ---

#[tokio::test]
async fn admin_route_rejects_plain_user_with_403() {
    let state = app_state(vec![test_user(1, "user")]);
    let token = create_token(&state, 1, "user", 3600);
    let app = create_router(state);

    let response = app.oneshot(get("/admin/users", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(
        body["errors"]["message"],
        Value::String("Admin access required".to_string())
    );
}

#[tokio::test]
async fn admin_route_rejects_anonymous_with_401() {
    let app = create_router(app_state(vec![test_user(1, "admin")]));
    let response = app.oneshot(get("/admin/users", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_route_accepts_admin_role() {
    let state = app_state(vec![test_user(1, "admin"), test_user(2, "user")]);
    let token = create_token(&state, 1, "admin", 3600);
    let app = create_router(state);

    let response = app.oneshot(get("/admin/users", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_user_lookup_returns_404_envelope_for_unknown_id() {
    let state = app_state(vec![test_user(1, "admin")]);
    let token = create_token(&state, 1, "admin", 3600);
    let app = create_router(state);

    let response = app
        .oneshot(get("/admin/users/999", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(
        body["errors"]["message"],
        Value::String("User not found.".to_string())
    );
    assert!(body["timestamp"].is_string());
}
