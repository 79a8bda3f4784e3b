//! Backend module: module calls and pipeline execution.

mod client;
mod executor;

pub use client::ModuleClient;
pub use executor::PipelineExecutor;
