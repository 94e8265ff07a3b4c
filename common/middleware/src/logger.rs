use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use tracing::info;

use common_web::{ArcHandler, Context, Middleware};

/// Logs one line per request with the trace id, method, path, outcome
/// status, and elapsed time.
///
/// Sits outermost in the app-wide chain so the logged status reflects
/// whatever the inner layers, authorization gates included, decided.
pub fn logger() -> Middleware {
    Box::new(|next: ArcHandler| -> ArcHandler {
        Arc::new(move |ctx: Context, req: Request<Body>| {
            let next = next.clone();
            async move {
                let method = req.method().clone();
                let path = req.uri().path().to_string();

                let result = next.call(ctx.clone(), req).await;

                let status = match &result {
                    Ok(response) => response.status().as_u16(),
                    Err(err) => err.status_code().as_u16(),
                };
                info!(
                    trace_id = %ctx.trace_id(),
                    status,
                    method = %method,
                    path,
                    elapsed_ms = ctx.values().start.elapsed().as_millis() as u64,
                    "request completed"
                );

                result
            }
        })
    })
}
