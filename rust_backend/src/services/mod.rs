//! Service layer for orchestration.
//!
//! This module sits between the pure algorithms and the outside world. The
//! pipeline wires the configured components together, the collaborator traits
//! describe the data sources and the render sink, and the runner drives a
//! full asynchronous run with per-input error isolation.

pub mod collaborators;
pub mod pipeline;
pub mod runner;

pub use collaborators::{MediaMetadataSource, Recording, RenderJob, RenderSink, SampleSource};
pub use pipeline::{ChannelDropouts, DropoutPipeline, Failure, PipelineOutput};
pub use runner::{AnalysisRunner, RunReport};
