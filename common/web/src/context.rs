use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use uuid::Uuid;

use common_auth::Claims;

/// Per-request bookkeeping threaded through the middleware chain.
///
/// One instance exists per inbound request. It is never shared across
/// requests and never retained after the response is written.
pub struct Values {
    pub trace_id: Uuid,
    pub start: Instant,
    status: AtomicU16,
}

impl Values {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            start: Instant::now(),
            status: AtomicU16::new(0),
        }
    }

    /// Records the wire status once a response is produced.
    pub fn set_status(&self, status: StatusCode) {
        self.status.store(status.as_u16(), Ordering::Relaxed);
    }

    pub fn status(&self) -> u16 {
        self.status.load(Ordering::Relaxed)
    }
}

impl Default for Values {
    fn default() -> Self {
        Self::new()
    }
}

/// Request-scoped carrier handed to every handler and middleware layer.
///
/// Cloning is cheap and shares the same [`Values`]. Claims are only present
/// once an authentication gate has verified the caller's token.
#[derive(Clone)]
pub struct Context {
    values: Arc<Values>,
    claims: Option<Arc<Claims>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Values::new()),
            claims: None,
        }
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn trace_id(&self) -> Uuid {
        self.values.trace_id
    }

    /// Returns a copy of this context enriched with verified claims for the
    /// layers below.
    pub fn with_claims(&self, claims: Claims) -> Self {
        Self {
            values: self.values.clone(),
            claims: Some(Arc::new(claims)),
        }
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_deref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn with_claims_shares_request_values() {
        let ctx = Context::new();
        assert!(ctx.claims().is_none());

        let claims = Claims::new("user-1", vec!["USER".to_string()], Duration::hours(1));
        let enriched = ctx.with_claims(claims.clone());

        assert_eq!(enriched.trace_id(), ctx.trace_id());
        assert_eq!(enriched.claims(), Some(&claims));

        enriched.values().set_status(StatusCode::OK);
        assert_eq!(ctx.values().status(), 200);
    }

    #[test]
    fn fresh_contexts_do_not_share_state() {
        let first = Context::new();
        let second = Context::new();

        assert_ne!(first.trace_id(), second.trace_id());

        first.values().set_status(StatusCode::NOT_FOUND);
        assert_eq!(second.values().status(), 0);
    }
}
