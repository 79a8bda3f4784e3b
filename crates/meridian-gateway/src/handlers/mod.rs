//! Admin API handlers

pub mod discovery;
pub mod health;
pub mod modules;
pub mod tenants;

pub use discovery::discovery_router;
pub use health::health_router;
pub use modules::modules_router;
pub use tenants::tenants_router;
