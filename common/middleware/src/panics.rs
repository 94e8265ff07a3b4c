use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use futures_util::FutureExt;
use tracing::error;

use crate::metrics::Metrics;
use common_web::{ArcHandler, Context, Error, Middleware};

/// Recovers panics from the layers inside it so a single request's fault
/// never crashes the listener.
///
/// The panic is logged with the trace id, counted, and converted into an
/// internal error for the dispatcher to translate into a 500. Recovery is
/// independent of the integrity-shutdown path, which is always an explicit
/// signal, never a crash.
pub fn recover_panics(metrics: Metrics) -> Middleware {
    Box::new(move |next: ArcHandler| -> ArcHandler {
        let metrics = metrics.clone();
        Arc::new(move |ctx: Context, req: Request<Body>| {
            let metrics = metrics.clone();
            let next = next.clone();
            async move {
                match AssertUnwindSafe(next.call(ctx.clone(), req))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(panic) => {
                        metrics.record_panic();
                        let message = panic_message(panic.as_ref());
                        error!(trace_id = %ctx.trace_id(), panic = %message, "recovered from panic");
                        Err(Error::internal(format!("panic: {message}")))
                    }
                }
            }
        })
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use axum::response::Response;

    use common_web::{respond, wrap, WebResult};

    fn trigger_panic() -> WebResult<Response> {
        panic!("boom")
    }

    fn panicking_handler() -> ArcHandler {
        Arc::new(|_ctx: Context, _req: Request<Body>| async move { trigger_panic() })
    }

    fn request() -> Request<Body> {
        Request::builder().body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn converts_panics_into_internal_errors() {
        let metrics = Metrics::new().expect("metrics");
        let chain = wrap(&[recover_panics(metrics.clone())], panicking_handler());

        let err = chain
            .call(Context::new(), request())
            .await
            .expect_err("panic becomes error");

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn chain_keeps_serving_after_a_panic() {
        let metrics = Metrics::new().expect("metrics");
        let panicking = wrap(&[recover_panics(metrics.clone())], panicking_handler());
        let healthy: ArcHandler = Arc::new(|ctx: Context, _req: Request<Body>| async move {
            respond(&ctx, StatusCode::OK, &serde_json::json!({"ok": true}))
        });
        let healthy = wrap(&[recover_panics(metrics.clone())], healthy);

        panicking
            .call(Context::new(), request())
            .await
            .expect_err("panic becomes error");
        let response = healthy
            .call(Context::new(), request())
            .await
            .expect("request succeeds");

        assert_eq!(response.status(), StatusCode::OK);

        let rendered = metrics.render().expect("render");
        let bytes = axum::body::to_bytes(rendered.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8 body");
        assert!(text.contains("web_request_panics_total 1"));
    }
}
