//! Request-to-pipeline resolution

pub mod cache;
pub mod resolver;

pub use cache::{PlanCache, PlanKey};
pub use resolver::{PipelineResolver, build_plan};
