use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::context::Context;
use crate::error::{Error, WebResult};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Serializes `data` as a JSON response with `status` and records the status
/// in the request values so outer layers observe the outcome.
///
/// A no-content status writes the status line only.
pub fn respond<T: Serialize>(ctx: &Context, status: StatusCode, data: &T) -> WebResult<Response> {
    ctx.values().set_status(status);

    if status == StatusCode::NO_CONTENT {
        let response = Response::builder()
            .status(status)
            .body(Body::empty())
            .map_err(anyhow::Error::from)?;
        return Ok(response);
    }

    let body = serde_json::to_vec(data).map_err(anyhow::Error::from)?;
    let response = Response::builder()
        .status(status)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        )
        .body(Body::from(body))
        .map_err(anyhow::Error::from)?;
    Ok(response)
}

/// Translates `err` into its client-visible response.
///
/// Typed request errors keep their status and message. Everything else
/// becomes `{"error": "Internal Server Error"}` with a 500.
pub fn respond_error(ctx: &Context, err: &Error) -> Response {
    let message = match err {
        Error::Request { message, .. } => message.clone(),
        Error::Shutdown(_) | Error::Internal(_) => "Internal Server Error".to_string(),
    };

    let body = ErrorBody { error: message };
    match respond(ctx, err.status_code(), &body) {
        Ok(response) => response,
        Err(err) => {
            error!(trace_id = %ctx.trace_id(), error = %err, "failed to write error response");
            ctx.values().set_status(StatusCode::INTERNAL_SERVER_ERROR);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
