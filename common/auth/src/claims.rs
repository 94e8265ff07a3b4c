use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Verified identity and authorization payload carried inside a signed token.
///
/// Serializes to the wire shape `{"sub", "roles", "iat", "exp"}` with unix
/// second timestamps. Values are never mutated after construction; every
/// authenticated request gets a fresh decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub")]
    pub subject: String,
    pub roles: Vec<String>,
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Builds claims for `subject` expiring `ttl` from now.
    ///
    /// Timestamps are truncated to whole seconds so a decoded token compares
    /// equal to the claims it was issued from.
    pub fn new(subject: impl Into<String>, roles: Vec<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        let issued_at = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()));
        Self {
            subject: subject.into(),
            roles,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    /// Convenience helper for role checks.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|held| held == role)
    }
}
