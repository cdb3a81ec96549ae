//! Classification collaborator boundary for graph-ide
//!
//! This crate holds the provider trait and its backends, the prompt
//! templates for each classification task, validation of the JSON the
//! collaborator returns, and the per-symbol description cache.

pub mod bridge;
pub mod cache;
pub mod prompt;
pub mod providers;
pub mod response;


pub use bridge::*;
pub use cache::{DescriptionCache, DescriptionSource};
pub use prompt::ProjectOverview;
pub use response::ResponseError;
