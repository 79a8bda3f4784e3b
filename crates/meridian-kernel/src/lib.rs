//! `meridian-kernel`: contracts and data model for the Meridian gateway.
//!
//! The kernel owns everything that can be expressed without network I/O:
//! module descriptors and their validation, tenants and enabled sets, the
//! resolved pipeline types, and the storage / discovery traits the runtime
//! crate (`meridian-gateway`) implements and consumes.

pub mod gateway;

#[cfg(feature = "config")]
pub mod config;
