#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use coterie::auth::TokenGenerator;
use coterie::mail::MailLog;
use coterie::server::{AppState, create_router};
use coterie::store::{SqliteStore, Store};
use coterie::types::{SessionToken, User};

pub fn test_store() -> Arc<SqliteStore> {
    let store = SqliteStore::new(":memory:").expect("open store");
    store.initialize().expect("initialize store");
    Arc::new(store)
}

pub fn test_state() -> (Arc<AppState>, Arc<SqliteStore>) {
    let store = test_store();
    let state = Arc::new(AppState::new(store.clone(), Arc::new(MailLog), None));
    (state, store)
}

pub fn test_router() -> (Router, Arc<SqliteStore>) {
    let (state, store) = test_state();
    (create_router(state), store)
}

/// An already-activated account with the given password.
pub fn create_activated_user(store: &dyn Store, name: &str, email: &str, password: &str) -> User {
    let generator = TokenGenerator::new();
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: generator.hash(password).expect("hash password"),
        picture: None,
        activation_code: None,
        reset_code: None,
        reset_code_expires_at: None,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user).expect("create user");
    user
}

/// Issues a session token for the user directly against the store,
/// bypassing the login endpoint.
pub fn issue_session(store: &dyn Store, user: &User) -> String {
    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator.generate().expect("generate token");
    let token = SessionToken {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id: user.id.clone(),
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    store.create_session(&token).expect("create session");
    raw_token
}

/// Drives one request through the router and parses the JSON envelope.
pub async fn request(
    router: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = router.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Row count helper for invariant checks.
pub fn count_rows(store: &SqliteStore, sql: &str) -> i64 {
    store
        .connection()
        .query_row(sql, [], |row| row.get(0))
        .expect("count rows")
}
