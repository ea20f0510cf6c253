//! Health check handler

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::SharedConnectionRegistry;
use crate::domain::ports::SharedEntityStore;

/// Upper bound on the broker probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct HealthState {
    pub store: SharedEntityStore,
    pub registry: SharedConnectionRegistry,
    pub started_at: Arc<Instant>,
}

/// Service health response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub broker: ComponentHealth,
    pub connected_machines: usize,
}

/// Component health status
#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Entity store unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let probe_start = Instant::now();
    let broker = match tokio::time::timeout(PROBE_TIMEOUT, state.store.ping()).await {
        Ok(Ok(())) => ComponentHealth {
            status: "ok".to_string(),
            latency_ms: Some(probe_start.elapsed().as_millis() as u64),
            error: None,
        },
        Ok(Err(e)) => ComponentHealth {
            status: "error".to_string(),
            latency_ms: None,
            error: Some(e.to_string()),
        },
        Err(_) => ComponentHealth {
            status: "error".to_string(),
            latency_ms: None,
            error: Some("probe timed out".to_string()),
        },
    };

    let (http_status, overall) = if broker.status == "ok" {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        http_status,
        Json(HealthResponse {
            status: overall.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            broker,
            connected_machines: state.registry.count(),
        }),
    )
}
