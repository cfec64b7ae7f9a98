// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use chrono::Utc;
use freshtrack::config::Config;
use freshtrack::db::MemoryDb;
use freshtrack::models::User;
use freshtrack::routes::create_router;
use freshtrack::services::identity::{issue_token, IdentityClaims};
use freshtrack::services::{PayoutError, RewardPayout};
use freshtrack::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A valid-looking Aptos account address.
#[allow(dead_code)]
pub const WALLET: &str = "0x00000000000000000000000000000000000000000000000000000000000000a1";

/// Payout double that always returns the same result.
pub struct FakePayout {
    result: Result<String, PayoutError>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakePayout {
    pub fn succeeding(hash: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(hash.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(PayoutError::PayoutFailed("insufficient balance".to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RewardPayout for FakePayout {
    async fn send_reward(&self, _address: &str, _amount_apt: f64) -> Result<String, PayoutError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Create a test app over an in-memory store with a failing payout.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_payout(FakePayout::failing())
}

#[allow(dead_code)]
pub fn create_test_app_with_payout(payout: Arc<FakePayout>) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default(), payout)
}

#[allow(dead_code)]
pub fn create_test_app_with_config(
    config: Config,
    payout: Arc<FakePayout>,
) -> (axum::Router, Arc<AppState>) {
    let db = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::new(config, db, payout).expect("failed to build app state"));
    (create_router(state.clone()), state)
}

/// Sign an identity token for `subject` with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(subject: &str, config: &Config) -> String {
    let claims = IdentityClaims {
        sub: Some(subject.to_string()),
        name: Some("Test User".to_string()),
        email: Some("test@example.com".to_string()),
        picture: None,
        exp: Some(Utc::now().timestamp() as usize + 3600),
    };
    let key = config
        .identity_jwt_secret
        .as_deref()
        .expect("test config has an identity key");
    issue_token(&claims, key).expect("failed to sign test token")
}

/// Insert a user record directly into the store.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, subject: &str) -> User {
    let user = User::from_claims(subject, Some("Test User"), None, None, Utc::now());
    state
        .db
        .create_user_if_absent(user)
        .await
        .expect("failed to seed user")
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
