#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use rand_core::OsRng;
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use common_auth::{key_pair_from_private_pem, Authenticator, Claims, ROLE_ADMIN, ROLE_USER};
use common_middleware::Metrics;
use dashboard_service::app::{build_app, AppState};
use dashboard_service::store::{hash_password, MemoryUserStore, User, UserStore};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const USER_EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "hunter2";

pub struct TestApp {
    pub router: Router,
    pub authenticator: Authenticator,
    pub shutdown_rx: mpsc::Receiver<()>,
}

/// Builds the full service router over a generated keypair and a seeded
/// in-memory store.
pub fn test_app() -> Result<TestApp> {
    let authenticator = test_authenticator("1")?;

    let store = MemoryUserStore::new();
    seed_user(&store, ADMIN_EMAIL, &[ROLE_ADMIN, ROLE_USER])?;
    seed_user(&store, USER_EMAIL, &[ROLE_USER])?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let state = AppState {
        store: Arc::new(store),
        authenticator: authenticator.clone(),
        metrics: Metrics::new()?,
        token_ttl: Duration::hours(1),
    };
    let router = build_app(state, shutdown_tx)?;

    Ok(TestApp {
        router,
        authenticator,
        shutdown_rx,
    })
}

/// Fresh RS256 authenticator that recognizes only `key_id`.
pub fn test_authenticator(key_id: &str) -> Result<Authenticator> {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048)?;
    let private_pem = private_key
        .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)?
        .to_string();
    let (encoding_key, decoding_key) = key_pair_from_private_pem(&private_pem)?;
    Ok(Authenticator::with_single_key(
        key_id,
        encoding_key,
        decoding_key,
    ))
}

fn seed_user(store: &MemoryUserStore, email: &str, roles: &[&str]) -> Result<()> {
    let now = Utc::now();
    store.insert(User {
        id: Uuid::new_v4(),
        name: email.to_string(),
        email: email.to_string(),
        roles: roles.iter().map(|role| (*role).to_string()).collect(),
        password_hash: hash_password(PASSWORD)?,
        created_at: now,
        updated_at: now,
    })?;
    Ok(())
}

pub fn bearer_for(authenticator: &Authenticator, roles: &[&str]) -> Result<String> {
    let claims = Claims::new(
        Uuid::new_v4().to_string(),
        roles.iter().map(|role| (*role).to_string()).collect(),
        Duration::hours(1),
    );
    let token = authenticator.generate_token(&claims)?;
    Ok(format!("Bearer {token}"))
}

pub fn basic_auth(email: &str, password: &str) -> String {
    format!(
        "Basic {}",
        BASE64_STANDARD.encode(format!("{email}:{password}"))
    )
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("request")
}

pub fn get_with_auth(path: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .expect("request")
}

pub async fn body_json(response: Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}
