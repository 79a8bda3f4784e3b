//! Gateway error types for `meridian-kernel`.
//!
//! [`GatewayError`] covers every failure the catalog, tenant and routing
//! layers can report: unknown entities, conflicting registrations, invalid
//! descriptors and consistency faults in the stores.  Transport failures
//! (connection refused, upstream timeout, …) belong in the runtime crate.

use thiserror::Error;

/// Coarse classification used by callers to map errors onto HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown tenant / module / route, or no reachable remote.
    NotFound,
    /// Duplicate id, ambiguous route, entity still referenced.
    Conflict,
    /// Malformed input or unsatisfiable request.
    BadRequest,
    /// Store failure or broken invariant.
    Internal,
    /// A module call failed.
    Upstream,
}

/// Error type for the gateway kernel contract.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Tenants ─────────────────────────────────────────────────────────────
    /// No tenant with this id exists.
    #[error("tenant '{0}' not found")]
    TenantNotFound(String),

    /// A tenant with this id already exists.
    #[error("tenant '{0}' already exists")]
    DuplicateTenant(String),

    /// A tenant refers to a module id that is not in the catalog.
    #[error("tenant '{tenant}' refers to unknown module '{module}'")]
    DanglingModuleReference { tenant: String, module: String },

    // ── Modules ─────────────────────────────────────────────────────────────
    /// No module with this id exists in the catalog.
    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    /// A module with this id is already registered (or repeated in a batch).
    #[error("module '{0}' is already registered")]
    DuplicateModule(String),

    /// A module cannot be removed while a tenant has it enabled.
    #[error("module '{module}' is enabled for tenant '{tenant}'")]
    ModuleInUse { module: String, tenant: String },

    /// A required interface is not provided by any module.
    #[error("module '{module}' requires interface '{interface}' {version} which is not provided")]
    MissingDependency {
        module: String,
        interface: String,
        version: String,
    },

    /// A module descriptor failed structural validation.
    #[error("invalid module descriptor '{0}': {1}")]
    InvalidDescriptor(String, String),

    /// An enabled module id has no stored descriptor.
    #[error("module '{module}' is enabled for tenant '{tenant}' but has no descriptor")]
    MissingDescriptor { tenant: String, module: String },

    // ── Routing ─────────────────────────────────────────────────────────────
    /// No enabled handler matches the request.
    #[error("no handler for {method} {path} in tenant '{tenant}'")]
    NoRouteMatch {
        tenant: String,
        method: String,
        path: String,
    },

    /// More than one enabled handler matches the request.
    #[error("{method} {path} matches handlers in several modules: {}", modules.join(", "))]
    AmbiguousRoute {
        method: String,
        path: String,
        modules: Vec<String>,
    },

    // ── Discovery ───────────────────────────────────────────────────────────
    /// No deployed instance is known for this module.
    #[error("no instance of module '{0}' is deployed")]
    InstanceNotFound(String),

    /// An instance with this (module, instance) pair is already registered.
    #[error("instance '{1}' of module '{0}' is already registered")]
    DuplicateInstance(String, String),

    // ── Reconciliation ──────────────────────────────────────────────────────
    /// None of the candidate remote registries answered.
    #[error("no remote registry reachable among {0} candidate url(s)")]
    NoRemoteReachable(usize),

    // ── Storage ─────────────────────────────────────────────────────────────
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),
}

impl GatewayError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::TenantNotFound(_)
            | GatewayError::ModuleNotFound(_)
            | GatewayError::NoRouteMatch { .. }
            | GatewayError::InstanceNotFound(_)
            | GatewayError::NoRemoteReachable(_) => ErrorKind::NotFound,
            GatewayError::DuplicateTenant(_)
            | GatewayError::DuplicateModule(_)
            | GatewayError::DuplicateInstance(..)
            | GatewayError::ModuleInUse { .. }
            | GatewayError::AmbiguousRoute { .. } => ErrorKind::Conflict,
            GatewayError::DanglingModuleReference { .. }
            | GatewayError::MissingDependency { .. }
            | GatewayError::InvalidDescriptor(..) => ErrorKind::BadRequest,
            GatewayError::MissingDescriptor { .. } | GatewayError::Store(_) => ErrorKind::Internal,
        }
    }
}
