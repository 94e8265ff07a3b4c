use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::routing::{on, MethodFilter};
use axum::Router;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::context::Context;
use crate::error::{Error, WebResult};
use crate::handler::{wrap, ArcHandler, Middleware};
use crate::response::respond_error;

/// Owns the routing table and the app-wide middleware list.
///
/// The shutdown sender and the middleware list are constructed once at
/// startup and injected here, so tests build isolated instances per case.
pub struct App {
    router: Router,
    shutdown: mpsc::Sender<()>,
    middleware: Vec<Middleware>,
}

impl App {
    /// `shutdown` is signaled when a handler reports an integrity failure.
    /// `middleware` wraps every registered route; the last entry forms the
    /// outermost layer.
    pub fn new(shutdown: mpsc::Sender<()>, middleware: Vec<Middleware>) -> Self {
        Self {
            router: Router::new(),
            shutdown,
            middleware,
        }
    }

    /// Registers `handler` under `method` and `path`.
    ///
    /// The chain is composed once here, not per request: route middleware
    /// nearest the handler, then the app-wide middleware outside it.
    pub fn handle(
        mut self,
        method: Method,
        path: &str,
        handler: ArcHandler,
        route_mw: Vec<Middleware>,
    ) -> WebResult<Self> {
        let composed = wrap(&self.middleware, wrap(&route_mw, handler));
        let shutdown = self.shutdown.clone();

        let endpoint = move |req: Request<Body>| {
            let handler = composed.clone();
            let shutdown = shutdown.clone();
            async move { dispatch(handler, shutdown, req).await }
        };

        let filter = MethodFilter::try_from(method).map_err(anyhow::Error::from)?;
        self.router = self.router.route(path, on(filter, endpoint));
        Ok(self)
    }

    /// Requests process termination outside the dispatch path.
    pub fn signal_shutdown(&self) {
        signal_shutdown(&self.shutdown);
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Runs one request through a composed handler chain.
///
/// A fresh [`Context`] is created per request, which is what prevents state
/// leaking across requests. A returned error is logged with the trace id and
/// translated into the client response; an integrity failure additionally
/// signals `shutdown` so the process stops serving.
pub async fn dispatch(
    handler: ArcHandler,
    shutdown: mpsc::Sender<()>,
    req: Request<Body>,
) -> Response {
    let ctx = Context::new();

    match handler.call(ctx.clone(), req).await {
        Ok(response) => response,
        Err(err) => {
            error!(trace_id = %ctx.trace_id(), error = %err, "request failed");
            match &err {
                Error::Shutdown(_) => signal_shutdown(&shutdown),
                Error::Request { .. } | Error::Internal(_) => {}
            }
            respond_error(&ctx, &err)
        }
    }
}

/// Sends the termination signal without blocking the request worker.
///
/// The channel is buffered, so a signal raised while one is already pending
/// is dropped rather than waited on.
pub fn signal_shutdown(shutdown: &mpsc::Sender<()>) {
    warn!("shutdown signal requested");
    if let Err(err) = shutdown.try_send(()) {
        debug!(error = %err, "shutdown already signaled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::response::respond;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn ok_handler() -> ArcHandler {
        Arc::new(|ctx: Context, _req: Request<Body>| async move {
            respond(&ctx, StatusCode::OK, &json!({"status": "OK"}))
        })
    }

    fn failing_handler(err: fn() -> Error) -> ArcHandler {
        Arc::new(move |_ctx: Context, _req: Request<Body>| async move {
            let result: WebResult<Response> = Err(err());
            result
        })
    }

    fn request() -> Request<Body> {
        Request::builder().body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn successful_responses_pass_through_untouched() {
        let (tx, _rx) = mpsc::channel(1);
        let response = dispatch(ok_handler(), tx, request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "OK"}));
    }

    #[tokio::test]
    async fn request_errors_become_error_bodies() {
        let (tx, mut rx) = mpsc::channel(1);
        let handler =
            failing_handler(|| Error::request(StatusCode::UNAUTHORIZED, "authentication failed"));
        let response = dispatch(handler, tx, request()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"error": "authentication failed"})
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn internal_errors_never_leak_detail() {
        let (tx, mut rx) = mpsc::channel(1);
        let handler = failing_handler(|| Error::internal("pg pool exhausted"));
        let response = dispatch(handler, tx, request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Internal Server Error"})
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn integrity_errors_signal_shutdown_exactly_once() {
        let (tx, mut rx) = mpsc::channel(1);
        let handler = failing_handler(|| Error::shutdown("request values missing"));

        let first = dispatch(handler.clone(), tx.clone(), request()).await;
        let second = dispatch(handler, tx, request()).await;

        assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
