//! Server runtime
//!
//! [`ServerHandle`] owns the full lifecycle: entity store client, connection
//! registry, machine watchdog, the HTTP/WebSocket listener, metrics and
//! graceful shutdown. The binary and the integration tests both start the
//! service through it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::session::{ConnectionRegistry, MachineWatchdog, SharedConnectionRegistry};
use crate::config::{AppConfig, LogFormat};
use crate::domain::ports::SharedEntityStore;
use crate::infrastructure::broker::{InMemoryStore, NgsiLdStoreClient};
use crate::interfaces::http::{create_router, AppState};
use crate::shared::errors::DispatchError;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("Broker client: {0}")]
    Broker(#[from] DispatchError),

    #[error("Failed to load seed file {path}: {reason}")]
    Seed { path: PathBuf, reason: String },
}

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the dispatch service.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    pub config: AppConfig,
    /// Serve from an in-process store instead of the context broker.
    pub in_memory: bool,
    /// JSON array of NGSI-LD entities preloaded into the in-memory store.
    /// Implies `in_memory`.
    pub seed: Option<PathBuf>,
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running dispatch service.
///
/// ```rust,no_run
/// use parking_dispatch::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub store: SharedEntityStore,
    pub registry: SharedConnectionRegistry,
    pub config: AppConfig,
    /// Address actually bound (differs from the config when port 0 was asked)
    pub local_addr: SocketAddr,

    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    watchdog_task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, ServerError> {
        let config = opts.config.clone();
        info!(version = env!("CARGO_PKG_VERSION"), "Starting parking dispatch service");

        let metrics = prometheus_handle();
        let store = build_store(&opts)?;
        let registry = ConnectionRegistry::shared();

        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let watchdog_task =
            MachineWatchdog::new(registry.clone(), &config.machines).start(shutdown_signal.clone());

        let state = AppState::new(store.clone(), registry.clone(), metrics, shutdown_signal.clone())
            .with_ping_interval(config.machines.ping_interval());
        let router = create_router(state);

        let address = config.server.address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
        info!(%local_addr, "Listening for HTTP and machine WebSocket connections");
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("HTTP server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!(error = %e, "HTTP server error");
            }
        });

        Ok(Self {
            store,
            registry,
            config,
            local_addr,
            shutdown,
            api_task,
            watchdog_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Block until shutdown is triggered, then drain within the configured
    /// deadline.
    pub async fn wait(self) {
        let Self {
            registry,
            shutdown,
            api_task,
            watchdog_task,
            ..
        } = self;

        let drained = shutdown
            .shutdown_with_cleanup(|| async move {
                let closed = registry.clear();
                info!(closed, "Machine connections closed");

                if let Some(task) = watchdog_task {
                    let _ = task.await;
                }
                match api_task.await {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => error!(error = %e, "HTTP server task panicked"),
                }
            })
            .await;

        if !drained {
            warn!("Some connections were still open at the shutdown deadline");
        }
        info!("Parking dispatch service stopped");
    }

    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can be installed only once per process; later starts
/// (tests, restarts) reuse it.
pub fn prometheus_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                handle
            }
            Err(e) => {
                warn!(error = %e, "Prometheus recorder unavailable, /metrics will stay empty");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

fn build_store(opts: &ServerOptions) -> Result<SharedEntityStore, ServerError> {
    let broker = &opts.config.broker;

    if let Some(path) = &opts.seed {
        let entities = load_seed(path)?;
        info!(path = %path.display(), entities = entities.len(), "Serving from seeded in-memory store");
        return Ok(Arc::new(InMemoryStore::with_entities(
            broker.spot_type.clone(),
            entities,
        )));
    }

    if opts.in_memory {
        info!("Serving from empty in-memory store");
        return Ok(Arc::new(InMemoryStore::new(broker.spot_type.clone())));
    }

    info!(base_url = %broker.base_url, "Using NGSI-LD context broker");
    Ok(Arc::new(NgsiLdStoreClient::new(broker)?))
}

fn load_seed(path: &Path) -> Result<Vec<Value>, ServerError> {
    let seed_error = |reason: String| ServerError::Seed {
        path: path.to_path_buf(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| seed_error(e.to_string()))
}

/// Initialize tracing from the application config. `RUST_LOG` overrides the
/// configured level.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
