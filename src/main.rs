//! Round-robin proxy fleet.
//!
//! ```text
//!                    ┌──────────────────────────────────────────┐
//!   Client ─────────▶│ round-robin front door   /route, /health │
//!                    └──────┬─────────────┬─────────────┬───────┘
//!                           ▼             ▼             ▼
//!                     backend:8081  backend:8082  backend:8083
//!                     /mirror       /mirror       /mirror
//!                     /health       /health       /health
//!
//!   health monitor ── probes every unit on a fixed interval
//!   orchestrator   ── launches everything, fires shutdown on SIGTERM/SIGINT,
//!                     waits for every unit to drain
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use roundrobin_proxy::config::loader::{load_config, resolve_path, CONFIG_PATH_ENV};
use roundrobin_proxy::lifecycle::signals::shutdown_signal;
use roundrobin_proxy::observability::{logging, metrics};
use roundrobin_proxy::Orchestrator;

#[derive(Parser)]
#[command(name = "roundrobin-proxy")]
#[command(about = "Round-robin load balancer and mirror backend fleet", long_about = None)]
struct Cli {
    /// Path to the JSON or TOML config file
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_path(cli.config).and_then(|path| load_config(&path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("roundrobin-proxy: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        port = %config.server.port,
        backends = ?config.backend.routes,
        health_path = %config.health_path(),
        grace = ?config.grace_period(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let report = orchestrator.run_until(shutdown_signal()).await;

    for unit in &report.units {
        match &unit.error {
            Some(error) => tracing::warn!(unit = %unit.name, state = %unit.state, error = %error, "Unit report"),
            None => tracing::info!(unit = %unit.name, state = %unit.state, "Unit report"),
        }
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
