use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use common_auth::Claims;
use common_web::{respond, Context, Error, WebResult};

use crate::app::AppState;
use crate::store::{hash_password, verify_password, User};

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

/// Exchanges HTTP Basic credentials for a signed bearer token.
pub async fn token(state: AppState, ctx: Context, req: Request<Body>) -> WebResult<Response> {
    let (email, password) = basic_credentials(req.headers().get(header::AUTHORIZATION))?;

    let user = state
        .store
        .find_by_email(&email)
        .filter(|user| verify_password(&user.password_hash, &password))
        .ok_or_else(|| {
            debug!(trace_id = %ctx.trace_id(), email, "credential check failed");
            Error::request(StatusCode::UNAUTHORIZED, "Authentication Failed")
        })?;

    issue_token(&state, &ctx, &user, StatusCode::OK)
}

/// Creates an account and logs it straight in, answering with a token
/// the way the login route does.
pub async fn create_user(state: AppState, ctx: Context, req: Request<Body>) -> WebResult<Response> {
    let bytes = to_bytes(req.into_body(), usize::MAX).await.map_err(|err| {
        Error::request(
            StatusCode::BAD_REQUEST,
            format!("reading request body: {err}"),
        )
    })?;
    let new_user: NewUser = serde_json::from_slice(&bytes)
        .map_err(|err| Error::request(StatusCode::BAD_REQUEST, err.to_string()))?;
    validate_new_user(&new_user)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: new_user.name,
        email: new_user.email,
        roles: new_user.roles,
        password_hash: hash_password(&new_user.password)?,
        created_at: now,
        updated_at: now,
    };
    state.store.insert(user.clone())?;
    info!(trace_id = %ctx.trace_id(), user_id = %user.id, "created user");

    issue_token(&state, &ctx, &user, StatusCode::CREATED)
}

pub async fn list_users(state: AppState, ctx: Context, _req: Request<Body>) -> WebResult<Response> {
    let users = state.store.list();
    respond(&ctx, StatusCode::OK, &users)
}

fn issue_token(
    state: &AppState,
    ctx: &Context,
    user: &User,
    status: StatusCode,
) -> WebResult<Response> {
    let claims = Claims::new(user.id.to_string(), user.roles.clone(), state.token_ttl);
    let token = state.authenticator.generate_token(&claims)?;
    respond(ctx, status, &TokenResponse { token })
}

fn validate_new_user(new_user: &NewUser) -> Result<(), Error> {
    if new_user.name.trim().is_empty()
        || new_user.email.trim().is_empty()
        || new_user.roles.is_empty()
        || new_user.password.is_empty()
    {
        return Err(Error::request(
            StatusCode::BAD_REQUEST,
            "name, email, roles, and password are required",
        ));
    }
    if new_user.password != new_user.password_confirm {
        return Err(Error::request(
            StatusCode::BAD_REQUEST,
            "password and password_confirm do not match",
        ));
    }
    Ok(())
}

/// Pulls the email and password out of an HTTP Basic `Authorization` header.
fn basic_credentials(header: Option<&HeaderValue>) -> Result<(String, String), Error> {
    let malformed = || {
        Error::request(
            StatusCode::UNAUTHORIZED,
            "must provide email and password in BasicAuth",
        )
    };

    let raw = header
        .and_then(|value| value.to_str().ok())
        .ok_or_else(malformed)?;
    let parts: Vec<&str> = raw.split(' ').collect();
    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("basic") {
        return Err(malformed());
    }

    let decoded = BASE64_STANDARD.decode(parts[1]).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (email, password) = decoded.split_once(':').ok_or_else(malformed)?;
    Ok((email.to_string(), password.to_string()))
}
