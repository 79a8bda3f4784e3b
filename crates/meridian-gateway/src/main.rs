//! Meridian gateway entry point.
//!
//! Reads configuration and starts the axum-based HTTP gateway service.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MERIDIAN_CONFIG` | *(none)* | Config file (toml, yaml or json) read before the variables below. |
//! | `MERIDIAN_PORT` | `9130` | TCP port to listen on. |
//! | `MERIDIAN_BIND` | `0.0.0.0` | Interface to bind. |
//! | `MERIDIAN_REQUEST_TIMEOUT_MS` | `30000` | Timeout of one module call. |
//! | `MERIDIAN_PROBE_TIMEOUT_MS` | `5000` | Timeout of one registry probe during a pull. |
//! | `MERIDIAN_PLAN_CACHE` | `1024` | Cached plans; `0` disables the cache. |
//! | `MERIDIAN_PULL_URLS` | *(none)* | Comma-separated default registries for pulls. |
//! | `MERIDIAN_LOG_JSON` | *(unset)* | `1` for JSON log lines. |

use meridian_gateway::server::{GatewayServer, GatewayServerConfig};
use meridian_kernel::config::load_config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("meridian_gateway=info,tower_http=info"));
    if std::env::var("MERIDIAN_LOG_JSON").is_ok_and(|v| v == "1") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = match std::env::var("MERIDIAN_CONFIG") {
        Ok(path) => match load_config::<GatewayServerConfig>(&path) {
            Ok(cfg) => {
                info!(path = %path, "configuration file loaded");
                cfg.with_env()
            }
            Err(e) => {
                error!(path = %path, error = %e, "cannot load configuration");
                std::process::exit(1);
            }
        },
        Err(_) => GatewayServerConfig::from_env(),
    };

    let server = match GatewayServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "gateway initialisation failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!(error = %e, "gateway server exited");
        std::process::exit(1);
    }
}
