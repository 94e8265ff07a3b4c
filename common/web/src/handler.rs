use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::context::Context;
use crate::error::WebResult;

/// Contract every endpoint and wrapped layer satisfies.
///
/// A handler receives the request-scoped context and the inbound request and
/// either produces the response itself or returns an error for the
/// dispatcher to translate.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Context, req: Request<Body>) -> BoxFuture<'static, WebResult<Response>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Context, Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WebResult<Response>> + Send + 'static,
{
    fn call(&self, ctx: Context, req: Request<Body>) -> BoxFuture<'static, WebResult<Response>> {
        Box::pin((self)(ctx, req))
    }
}

pub type ArcHandler = Arc<dyn Handler>;

/// A function that wraps a handler with cross-cutting behavior while
/// preserving its contract.
pub type Middleware = Box<dyn Fn(ArcHandler) -> ArcHandler + Send + Sync>;

/// Composes `middleware` around `handler`.
///
/// The first entry sits closest to the handler; the last entry becomes the
/// outermost wrapper and is therefore the first to run on the way in. Route
/// middleware is composed before app-wide middleware so cross-cutting
/// layers always observe the outcome of authorization.
pub fn wrap(middleware: &[Middleware], handler: ArcHandler) -> ArcHandler {
    let mut wrapped = handler;
    for mw in middleware {
        wrapped = mw(wrapped);
    }
    wrapped
}
