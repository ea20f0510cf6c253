//! HTTP request metrics middleware
//!
//! Records `http_requests_total` and `http_request_duration_seconds`, labelled
//! by the matched route so `/clear-spot/{spot_id}` is one series rather than
//! one per spot.

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};

pub async fn http_metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let Some(path) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
    else {
        // Unrouted requests are not recorded.
        return next.run(request).await;
    };
    let method = request.method().to_string();

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    let status = response.status().as_u16().to_string();
    metrics::counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method, "path" => path)
        .record(elapsed);

    response
}
