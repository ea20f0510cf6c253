//! Parking dispatch service
//!
//! ```sh
//! # Run with default config (~/.config/parking-dispatch/config.toml)
//! parking-dispatch
//!
//! # Custom config and broker
//! parking-dispatch --config /etc/parking-dispatch/config.toml \
//!     --broker-url http://orion:1026/ngsi-ld/v1
//!
//! # Local demo without a broker
//! parking-dispatch --seed fixtures/garage.json
//!
//! # Validate config without starting
//! parking-dispatch --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use parking_dispatch::config::{default_config_path, AppConfig};
use parking_dispatch::server::{init_tracing, ServerHandle, ServerOptions};

/// Allocates parking spots and dispatches retrieval machines.
#[derive(Parser, Debug)]
#[command(
    name = "parking-dispatch",
    version,
    about = "Spot allocation and machine dispatch for smart indoor parking",
    long_about = "REST + WebSocket service that matches drivers to parking spots, \
                  locks them in an NGSI-LD context broker and dispatches retrieval machines.\n\n\
                  Default config: ~/.config/parking-dispatch/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "PARKING_DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the NGSI-LD broker base URL.
    #[arg(long)]
    broker_url: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Serve from an in-memory store instead of the broker.
    #[arg(long)]
    in_memory: bool,

    /// Preload the in-memory store from a JSON array of entities.
    #[arg(long, value_name = "FILE")]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.broker_url {
        config.broker.base_url = url;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    if cli.check {
        if let Some(e) = load_error {
            eprintln!("Configuration is invalid: {e}");
            std::process::exit(1);
        }
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Listen      : {}", config.server.address());
        println!("   Broker      : {}", config.broker.base_url);
        println!("   Spot type   : {}", config.broker.spot_type);
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    init_tracing(&config);
    match load_error {
        None => info!(path = %config_path.display(), "Configuration loaded"),
        Some(e) => error!(path = %config_path.display(), error = %e, "Failed to load config, using defaults"),
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        in_memory: cli.in_memory,
        seed: cli.seed,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shut down gracefully");

    handle.wait().await;
    Ok(())
}
