//! Router-level helpers for handler tests.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    app::build_app,
    state::AppState,
    users::{
        repo_types::UserChanges,
        services::{self, AccountInput},
    },
};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::fake();
        Self {
            router: build_app(state.clone()),
            state,
        }
    }
}

async fn dispatch(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();
    dispatch(app, req).await
}

pub async fn send_raw(app: &TestApp, uri: &str, raw: &'static str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(raw))
        .unwrap();
    dispatch(app, req).await
}

/// Creates an account and returns its token.
pub async fn seed_user(app: &TestApp, email: &str, password: &str) -> String {
    let store = app.state.store.as_ref();
    services::create_account(
        store,
        app.state.config.password_min_length,
        AccountInput {
            email: Some(email.into()),
            password: Some(password.into()),
            name: None,
            is_staff: false,
        },
        false,
    )
    .await
    .unwrap();
    services::obtain_token(store, Some(email), Some(password))
        .await
        .unwrap()
}

pub async fn seed_staff(app: &TestApp, email: &str, password: &str) -> String {
    let token = seed_user(app, email, password).await;
    let store = app.state.store.as_ref();
    let user = store.find_user_by_email(email).await.unwrap().unwrap();
    store
        .update_user(
            user.id,
            UserChanges {
                is_staff: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    token
}
