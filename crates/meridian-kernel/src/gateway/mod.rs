//! Gateway kernel contract.
//!
//! This module defines the *data model, trait interfaces and error types* of
//! the Meridian gateway.  Concrete implementations live in
//! `meridian-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              meridian-kernel  (this module)                 │
//! │  ModuleDescriptor / RouteHandler / RouteFilter              │
//! │  Tenant / TenantDescriptor   PipelineEntry / ExecutionPlan  │
//! │  CatalogStore / TenantStore / Discovery traits              │
//! │  PullDescriptor              GatewayError / ErrorKind       │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              meridian-gateway  (runtime crate)              │
//! │  PipelineResolver / PipelineExecutor                        │
//! │  PullManager (catalog reconciliation)                       │
//! │  ModuleManager / TenantManager                              │
//! │  In-memory stores + discovery, axum GatewayServer           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use meridian_kernel::gateway::{HttpMethod, ModuleDescriptor};
//!
//! let md: ModuleDescriptor = serde_json::from_str(r#"{
//!     "id": "sample-module-1.0.0",
//!     "provides": [ {
//!         "id": "sample",
//!         "version": "1.0",
//!         "handlers": [ { "methods": ["GET", "POST"], "path": "/testb" } ]
//!     } ]
//! }"#).unwrap();
//!
//! md.validate().expect("descriptor is valid");
//! assert_eq!(md.product(), "sample-module");
//! assert!(md.handlers().any(|h| h.matches(&HttpMethod::Get, "/testb")));
//! ```

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod path;
pub mod pipeline;
pub mod pull;
pub mod store;
pub mod tenant;
pub mod types;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use descriptor::{
    FilterType, GATEWAY_PRODUCT, InterfaceBrief, InterfaceDescriptor, InterfaceReference,
    ModuleBrief, ModuleDescriptor, ModuleId, RouteFilter, RouteHandler,
};
pub use discovery::{DeploymentDescriptor, Discovery};
pub use error::{ErrorKind, GatewayError};
pub use pipeline::{DEFAULT_HANDLER_LEVEL, EntryKind, ExecutionPlan, Phase, PipelineEntry};
pub use pull::{PullDescriptor, PullPhase};
pub use store::{CatalogStore, ModuleFilter, TenantStore};
pub use tenant::{Tenant, TenantDescriptor};
pub use types::{GatewayRequest, GatewayResponse, HttpMethod, headers};
