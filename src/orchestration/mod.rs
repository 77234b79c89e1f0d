//! Orchestration of webhook event processing.

pub mod pipeline;

pub use pipeline::{EventPipeline, PipelineError, PipelineOutcome, ProcessStatus};
