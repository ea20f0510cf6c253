//! Router with Swagger UI

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::matching::BookingRequest;
use crate::application::session::MachineSummary;
use crate::config::MachinesConfig;
use crate::application::{
    AllocationService, BookingCoordinator, GarageLifecycleManager, SharedConnectionRegistry,
};
use crate::domain::ports::SharedEntityStore;
use crate::interfaces::http::common::ErrorBody;
use crate::interfaces::http::modules::garages::{self, GarageDeletionResponse, GarageState};
use crate::interfaces::http::modules::health::{self, ComponentHealth, HealthResponse, HealthState};
use crate::interfaces::http::modules::metrics::{
    http_metrics_middleware, prometheus_metrics, MetricsState,
};
use crate::interfaces::http::modules::parking::{
    self, BookSpotRequest, BookSpotResponse, FindSpotResponse, ParkingState, ReleaseAllResponse,
    SpotAssignment, StatusMessage,
};
use crate::interfaces::http::modules::request_id::request_id_middleware;
use crate::interfaces::ws::{machine_socket_handler, MachineSocketState};
use crate::shared::shutdown::ShutdownSignal;

/// Everything the routes need. Handlers take their own slice through
/// `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedEntityStore,
    pub registry: SharedConnectionRegistry,
    pub allocation: Arc<AllocationService>,
    pub bookings: Arc<BookingCoordinator>,
    pub garages: Arc<GarageLifecycleManager>,
    pub metrics: PrometheusHandle,
    pub shutdown: ShutdownSignal,
    pub started_at: Arc<Instant>,
    /// Keepalive ping period for machine sockets
    pub ping_interval: Duration,
}

impl AppState {
    /// Wire the use-cases around one store and one registry.
    pub fn new(
        store: SharedEntityStore,
        registry: SharedConnectionRegistry,
        metrics: PrometheusHandle,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            allocation: Arc::new(AllocationService::new(store.clone())),
            bookings: Arc::new(BookingCoordinator::new(store.clone(), registry.clone())),
            garages: Arc::new(GarageLifecycleManager::new(store.clone())),
            store,
            registry,
            metrics,
            shutdown,
            started_at: Arc::new(Instant::now()),
            ping_interval: MachinesConfig::default().ping_interval(),
        }
    }

    pub fn with_ping_interval(mut self, ping_interval: Duration) -> Self {
        self.ping_interval = ping_interval;
        self
    }
}

impl FromRef<AppState> for ParkingState {
    fn from_ref(s: &AppState) -> Self {
        ParkingState {
            allocation: Arc::clone(&s.allocation),
            bookings: Arc::clone(&s.bookings),
            registry: s.registry.clone(),
        }
    }
}

impl FromRef<AppState> for GarageState {
    fn from_ref(s: &AppState) -> Self {
        GarageState {
            garages: Arc::clone(&s.garages),
        }
    }
}

impl FromRef<AppState> for HealthState {
    fn from_ref(s: &AppState) -> Self {
        HealthState {
            store: s.store.clone(),
            registry: s.registry.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(s: &AppState) -> Self {
        MetricsState {
            handle: s.metrics.clone(),
        }
    }
}

impl FromRef<AppState> for MachineSocketState {
    fn from_ref(s: &AppState) -> Self {
        MachineSocketState {
            registry: s.registry.clone(),
            shutdown: s.shutdown.clone(),
            ping_interval: s.ping_interval,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        parking::find_spot,
        parking::book_spot,
        parking::clear_spot,
        parking::clear_all_spots,
        parking::list_machines,
        garages::register_garage,
        garages::delete_garage,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            ComponentHealth,
            BookingRequest,
            FindSpotResponse,
            SpotAssignment,
            StatusMessage,
            BookSpotRequest,
            BookSpotResponse,
            ReleaseAllResponse,
            MachineSummary,
            GarageDeletionResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service and broker health"),
        (name = "Parking", description = "Spot allocation, booking and release"),
        (name = "Garages", description = "Garage registration and cascading removal"),
        (name = "Machines", description = "Retrieval machines connected over `/ws/machine`"),
    ),
    info(
        title = "Parking Dispatch API",
        version = "0.1.0",
        description = "Allocates parking spots, locks them in the NGSI-LD context broker and dispatches retrieval machines",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    let api_routes = Router::new()
        .route("/find-spot", post(parking::find_spot))
        .route("/book-spot", post(parking::book_spot))
        .route("/clear-spot/{spot_id}", post(parking::clear_spot))
        .route("/clear-all-spots", post(parking::clear_all_spots))
        .route("/parking-garage", post(garages::register_garage))
        .route("/delete-garage/{*garage_id}", delete(garages::delete_garage))
        .route("/machines", get(parking::list_machines))
        .route("/health", get(health::health_check))
        .route_layer(middleware::from_fn(http_metrics_middleware));

    Router::new()
        .merge(swagger_routes)
        .merge(api_routes)
        .route("/metrics", get(prometheus_metrics))
        .route("/ws/machine", get(machine_socket_handler))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::*;
    use crate::application::ConnectionRegistry;
    use crate::domain::ports::EntityStoreClient;
    use crate::domain::spot::{Spot, SpotCategory, SpotStatus};
    use crate::infrastructure::broker::memory::garage_entity;
    use crate::testing::FailingStore;

    fn state_with(store: Arc<FailingStore>) -> AppState {
        AppState::new(
            store,
            ConnectionRegistry::shared(),
            PrometheusBuilder::new().build_recorder().handle(),
            ShutdownSignal::new(),
        )
    }

    fn sample_store() -> Arc<FailingStore> {
        Arc::new(FailingStore::new(&[
            Spot::new("A").with_coordinates(1.0, 2.0),
            Spot::new("B").with_categories(&[SpotCategory::Disabled]),
        ]))
    }

    async fn call(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn find_spot_returns_general_spot_for_generic_request() {
        let state = state_with(sample_store());
        let (status, body) = call(&state, "POST", "/find-spot", Some(json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["assigned_spot_id"], "A");
        assert_eq!(body["coordinates"], json!([1.0, 2.0]));
        assert_eq!(body["message"], "Spot reserved successfully.");
    }

    #[tokio::test]
    async fn find_spot_honours_disabled_flag() {
        let state = state_with(sample_store());
        let (_, body) = call(&state, "POST", "/find-spot", Some(json!({"requires_disabled": true}))).await;
        assert_eq!(body["assigned_spot_id"], "B");
    }

    #[tokio::test]
    async fn no_availability_is_a_200_failure() {
        let store = Arc::new(FailingStore::new(&[Spot::new("A").with_status(SpotStatus::Occupied)]));
        let (status, body) = call(&state_with(store), "POST", "/find-spot", Some(json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "failure", "message": "No suitable spots available."}));
    }

    #[tokio::test]
    async fn find_spot_with_store_down_is_503() {
        let (status, body) = call(
            &state_with(Arc::new(FailingStore::unreachable())),
            "POST",
            "/find-spot",
            Some(json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "upstream_unavailable");
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn malformed_find_spot_body_is_400() {
        let state = state_with(sample_store());
        let (status, body) =
            call(&state, "POST", "/find-spot", Some(json!({"requires_ev": "yes"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn book_spot_locks_and_notifies() {
        let store = sample_store();
        let state = state_with(store.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.registry.register(Some("robot-1"), tx);

        let (status, body) = call(&state, "POST", "/book-spot", Some(json!({"spot_id": "A"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["spot_id"], "A");
        assert_eq!(body["machines_notified"], 1);

        let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["spot_id"], "A");
        assert_eq!(
            store.get_spot("A").await.unwrap().status,
            Some(SpotStatus::Occupied)
        );

        let (status, body) = call(&state, "POST", "/book-spot", Some(json!({"spot_id": "A"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "conflict_or_rejected");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn book_unknown_spot_is_404_and_empty_id_is_422() {
        let state = state_with(sample_store());
        let (status, _) = call(&state, "POST", "/book-spot", Some(json!({"spot_id": "Z"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&state, "POST", "/book-spot", Some(json!({"spot_id": ""}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn clear_spot_and_clear_all() {
        let store = Arc::new(FailingStore::new(&[
            Spot::new("A").with_status(SpotStatus::Occupied),
            Spot::new("B").with_status(SpotStatus::Occupied),
            Spot::new("C"),
        ]));
        let state = state_with(store.clone());

        let (status, body) = call(&state, "POST", "/clear-spot/A", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Spot A is now free and available for new bookings.");

        let (status, body) = call(&state, "POST", "/clear-all-spots", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_spots"], 3);
        assert_eq!(body["released"], 1);
        assert_eq!(body["message"], "3 Spots are now free.");

        let (status, _) = call(&state, "POST", "/clear-spot/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn garage_registration_and_deletion() {
        let store = Arc::new(FailingStore::new(&[
            Spot::new("urn:ngsi-ld:ParkingSpot:S1").with_garage("urn:ngsi-ld:ParkingGarage:G1"),
            Spot::new("urn:ngsi-ld:ParkingSpot:S2").with_garage("urn:ngsi-ld:ParkingGarage:G1"),
        ]));
        let state = state_with(store.clone());

        let (status, body) = call(
            &state,
            "POST",
            "/parking-garage",
            Some(garage_entity("urn:ngsi-ld:ParkingGarage:G1", "North")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Parking Garage registered successfully.");

        let (status, _) = call(
            &state,
            "POST",
            "/parking-garage",
            Some(garage_entity("urn:ngsi-ld:ParkingGarage:G1", "North")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        store.fail_delete("urn:ngsi-ld:ParkingSpot:S2");
        let (status, body) = call(
            &state,
            "DELETE",
            "/delete-garage/urn:ngsi-ld:ParkingGarage:G1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["garageId"], "urn:ngsi-ld:ParkingGarage:G1");
        assert_eq!(body["deletedSpots"], json!(["urn:ngsi-ld:ParkingSpot:S1"]));
        assert_eq!(body["spotsDeletedCount"], 1);
    }

    #[tokio::test]
    async fn garage_without_id_is_422() {
        let state = state_with(sample_store());
        let (status, body) =
            call(&state, "POST", "/parking-garage", Some(json!({"type": "ParkingGarage"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn partial_garage_deletion_is_502() {
        let store = Arc::new(FailingStore::new(&[Spot::new("S1").with_garage("G1")]));
        store.create_entity(garage_entity("G1", "North")).await.unwrap();
        store.fail_delete("G1");

        let (status, body) = call(&state_with(store), "DELETE", "/delete-garage/G1", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "partial_failure");
        assert_eq!(body["deleted_spots"], json!(["S1"]));
    }

    #[tokio::test]
    async fn health_reports_machines_and_broker() {
        let state = state_with(sample_store());
        let (tx, _rx) = mpsc::unbounded_channel();
        state.registry.register(Some("robot-1"), tx);

        let (status, body) = call(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["broker"]["status"], "ok");
        assert_eq!(body["connected_machines"], 1);

        let (status, body) = call(&state, "GET", "/machines", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["machine_id"], "robot-1");
    }

    #[tokio::test]
    async fn health_degrades_when_broker_is_down() {
        let state = state_with(Arc::new(FailingStore::unreachable()));
        let (status, body) = call(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["broker"]["status"], "error");
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_openapi_lists_routes() {
        let state = state_with(sample_store());
        let response = create_router(state)
            .oneshot(Request::builder().uri("/api-doc/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        for path in ["/find-spot", "/book-spot", "/clear-all-spots", "/delete-garage/{garage_id}"] {
            assert!(doc["paths"].get(path).is_some(), "{path} missing from OpenAPI");
        }
    }
}
