use std::sync::RwLock;

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Stored account. The password hash never serializes.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),
}

impl From<StoreError> for common_web::Error {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::DuplicateEmail(_) => {
                common_web::Error::request(StatusCode::CONFLICT, err.to_string())
            }
        }
    }
}

/// Persistence seam for accounts. The service only ever needs lookup by
/// email, insertion, and a listing.
pub trait UserStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Option<User>;
    fn insert(&self, user: User) -> Result<(), StoreError>;
    fn list(&self) -> Vec<User>;
}

/// In-process store backing the service.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .expect("rwlock poisoned")
            .iter()
            .find(|user| user.email == email)
            .cloned()
    }

    fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().expect("rwlock poisoned");
        if users.iter().any(|existing| existing.email == user.email) {
            return Err(StoreError::DuplicateEmail(user.email));
        }
        users.push(user);
        Ok(())
    }

    fn list(&self) -> Vec<User> {
        self.users.read().expect("rwlock poisoned").clone()
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("Failed to hash password: {err}"))
}

pub fn verify_password(password_hash: &str, password: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}
