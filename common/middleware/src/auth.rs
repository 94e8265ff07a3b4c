use std::sync::Arc;

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, Request, StatusCode};
use tracing::debug;

use common_auth::Authenticator;
use common_web::{ArcHandler, Context, Error, Middleware};

/// Gate that establishes caller identity.
///
/// Requires a well-formed bearer header and a token that verifies against
/// the process key material, then threads the decoded claims into the
/// context for the layers below it. It does not authorize any action.
pub fn authenticate(authenticator: Authenticator) -> Middleware {
    Box::new(move |next: ArcHandler| -> ArcHandler {
        let authenticator = authenticator.clone();
        Arc::new(move |ctx: Context, req: Request<Body>| {
            let authenticator = authenticator.clone();
            let next = next.clone();
            async move {
                let token = bearer_token(req.headers().get(AUTHORIZATION))?;

                let claims = match authenticator.parse_claims(&token) {
                    Ok(claims) => claims,
                    Err(err) => {
                        debug!(error = %err, "token verification failed");
                        return Err(Error::request(
                            StatusCode::UNAUTHORIZED,
                            "authentication failed",
                        ));
                    }
                };

                next.call(ctx.with_claims(claims), req).await
            }
        })
    })
}

/// Gate that requires the authenticated caller to hold at least one of
/// `roles`.
///
/// Must sit inside [`authenticate`] in the chain. Absent claims are a wiring
/// defect, answered as an internal error rather than a forbidden.
pub fn has_role(roles: &[&str]) -> Middleware {
    let required: Vec<String> = roles.iter().map(|role| (*role).to_string()).collect();
    Box::new(move |next: ArcHandler| -> ArcHandler {
        let required = required.clone();
        Arc::new(move |ctx: Context, req: Request<Body>| {
            let required = required.clone();
            let next = next.clone();
            async move {
                let claims = match ctx.claims() {
                    Some(claims) => claims,
                    None => {
                        return Err(Error::internal(
                            "claims missing from context: HasRole called without/before Authenticate",
                        ));
                    }
                };

                if !required.iter().any(|role| claims.has_role(role)) {
                    return Err(Error::request(
                        StatusCode::FORBIDDEN,
                        "you are NOT authorized for that action",
                    ));
                }

                next.call(ctx, req).await
            }
        })
    })
}

/// Parses the `Authorization` header value.
///
/// Expected shape is exactly `Bearer <token>` with a case-insensitive
/// scheme; any other shape is answered with a 401.
fn bearer_token(header: Option<&HeaderValue>) -> Result<String, Error> {
    let raw = header.and_then(|value| value.to_str().ok()).unwrap_or("");

    let parts: Vec<&str> = raw.split(' ').collect();
    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("bearer") {
        return Err(Error::request(
            StatusCode::UNAUTHORIZED,
            "expected authorization header format: Bearer <token>",
        ));
    }

    Ok(parts[1].to_string())
}
