//! Metrics normalization, rating and batch summaries.

mod builder;
mod classify;
mod model;
mod normalize;
mod orchestrator;
mod summary;

pub use builder::*;
pub use classify::*;
pub use model::*;
pub use normalize::*;
pub use orchestrator::*;
pub use summary::*;
