//! `meridian-gateway`: Meridian multi-tenant gateway runtime.
//!
//! This crate provides the concrete implementations of the contracts
//! defined in `meridian-kernel::gateway`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`CatalogStore`](gateway::CatalogStore) | [`store::InMemoryCatalogStore`] |
//! | [`TenantStore`](gateway::TenantStore) | [`store::InMemoryTenantStore`] |
//! | [`Discovery`](gateway::Discovery) | [`discovery::InMemoryDiscovery`] |
//!
//! On top of those sit the pipeline resolver ([`router::PipelineResolver`]),
//! the pipeline executor ([`backend::PipelineExecutor`]), catalog
//! reconciliation ([`pull::PullManager`]) and the catalog/tenant managers.
//! [`server::GatewayServer`] wires everything together into an axum HTTP
//! service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use meridian_gateway::server::{GatewayServer, GatewayServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = GatewayServer::new(GatewayServerConfig {
//!         port: 9130,
//!         pull_urls: vec!["http://registry:9130".to_string()],
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     server.start().await.unwrap();
//! }
//! ```

pub mod backend;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod modules;
pub mod pull;
pub mod router;
pub mod server;
pub mod state;
pub mod store;
pub mod tenants;

// Re-export the kernel gateway types for convenience.
pub use meridian_kernel::gateway;
