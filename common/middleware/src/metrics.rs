use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use common_web::{ArcHandler, Context, Middleware};

/// Request counters owned by the process and shared across workers.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    errors: IntCounter,
    panics: IntCounter,
    latency: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new(
                "web_requests_total",
                "Count of handled requests grouped by method and status",
            ),
            &["method", "status"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        let errors = IntCounter::new(
            "web_request_errors_total",
            "Count of requests answered through the error translation path",
        )?;
        registry.register(Box::new(errors.clone()))?;

        let panics = IntCounter::new(
            "web_request_panics_total",
            "Count of handler panics recovered into 500 responses",
        )?;
        registry.register(Box::new(panics.clone()))?;

        let latency = Histogram::with_opts(HistogramOpts::new(
            "web_request_duration_seconds",
            "Latency of handled requests in seconds",
        ))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            requests,
            errors,
            panics,
            latency,
        })
    }

    pub fn record_request(&self, method: &Method, status: StatusCode) {
        self.requests
            .with_label_values(&[method.as_str(), status.as_str()])
            .inc();
    }

    pub fn record_error(&self) {
        self.errors.inc();
    }

    pub fn record_panic(&self) {
        self.panics.inc();
    }

    pub fn record_latency(&self, seconds: f64) {
        self.latency.observe(seconds);
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}

/// Counts every request by method and outcome status, plus the errors
/// traveling up the chain.
pub fn collect_metrics(metrics: Metrics) -> Middleware {
    Box::new(move |next: ArcHandler| -> ArcHandler {
        let metrics = metrics.clone();
        Arc::new(move |ctx: Context, req: Request<Body>| {
            let metrics = metrics.clone();
            let next = next.clone();
            async move {
                let method = req.method().clone();
                let start = ctx.values().start;

                let result = next.call(ctx, req).await;

                let status = match &result {
                    Ok(response) => response.status(),
                    Err(err) => err.status_code(),
                };
                metrics.record_request(&method, status);
                metrics.record_latency(start.elapsed().as_secs_f64());
                if result.is_err() {
                    metrics.record_error();
                }

                result
            }
        })
    })
}
