//! Staged analysis pipeline for graph-ide
//!
//! Runs the six classification and aggregation stages in dependency order,
//! caching each stage's output under `.graph-ide/` so unchanged work is
//! never repeated.

pub mod orchestrator;
pub mod stages;


pub use orchestrator::{PipelineOrchestrator, PipelineReport, RunOptions};
