use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method, Request, StatusCode,
};
use axum::response::Response;
use axum::Router;
use chrono::Duration;
use serde::Serialize;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use common_auth::{Authenticator, ROLE_ADMIN};
use common_middleware::{authenticate, collect_metrics, has_role, logger, recover_panics, Metrics};
use common_web::{respond, App, ArcHandler, Context, WebResult};

use crate::store::UserStore;
use crate::user_handlers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub authenticator: Authenticator,
    pub metrics: Metrics,
    pub token_ttl: Duration,
}

/// Adapts a state-taking handler to the plain handler contract.
fn with_state<F, Fut>(state: &AppState, handler: F) -> ArcHandler
where
    F: Fn(AppState, Context, Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WebResult<Response>> + Send + 'static,
{
    let state = state.clone();
    Arc::new(move |ctx: Context, req: Request<Body>| handler(state.clone(), ctx, req))
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

async fn health(ctx: Context, _req: Request<Body>) -> WebResult<Response> {
    respond(&ctx, StatusCode::OK, &HealthStatus { status: "OK" })
}

async fn render_metrics(state: AppState, ctx: Context, _req: Request<Body>) -> WebResult<Response> {
    let response = state.metrics.render()?;
    ctx.values().set_status(response.status());
    Ok(response)
}

/// Wires every route through the shared middleware stack.
///
/// The app-wide list reads inside-out: panic recovery nearest the handler,
/// then metrics, then the logger outermost. Admin routes add the identity
/// and role gates nearest the handler.
pub fn build_app(state: AppState, shutdown: mpsc::Sender<()>) -> WebResult<Router> {
    let general = vec![
        recover_panics(state.metrics.clone()),
        collect_metrics(state.metrics.clone()),
        logger(),
    ];

    let admin = || {
        vec![
            has_role(&[ROLE_ADMIN]),
            authenticate(state.authenticator.clone()),
        ]
    };

    let app = App::new(shutdown, general)
        .handle(Method::GET, "/v1/health", Arc::new(health), Vec::new())?
        .handle(
            Method::GET,
            "/metrics",
            with_state(&state, render_metrics),
            Vec::new(),
        )?
        .handle(
            Method::GET,
            "/v1/users/token",
            with_state(&state, user_handlers::token),
            Vec::new(),
        )?
        .handle(
            Method::POST,
            "/v1/users",
            with_state(&state, user_handlers::create_user),
            admin(),
        )?
        .handle(
            Method::GET,
            "/v1/users",
            with_state(&state, user_handlers::list_users),
            admin(),
        )?;

    Ok(app.into_router().layer(cors_layer()))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:3001"),
            HeaderValue::from_static("http://localhost:5173"),
        ]))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static("authorization")])
}
