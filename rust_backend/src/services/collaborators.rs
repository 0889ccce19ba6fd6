//! Interfaces to the systems around the core.
//!
//! The core never touches files, probes media or runs a transcoder itself.
//! These traits describe what the orchestration layer needs from the outside
//! world; [`crate::io::loaders`] provides file-backed implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::domain::{CutPlan, TrackFile};
use crate::core::error::LosResult;
use crate::parsing::annotations::LogStep;
use crate::parsing::tracking_csv::ChannelSamples;

/// Samples of one recording (one tracking export), keyed by channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub name: String,
    pub channels: ChannelSamples,
}

/// A cut plan ready for rendering, with the operator step it happened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub plan: CutPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<LogStep>,
}

/// Source of tracking samples.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Names of the available recordings.
    async fn recordings(&self) -> LosResult<Vec<String>>;

    /// Load one recording by name.
    async fn load(&self, name: &str) -> LosResult<Recording>;
}

/// Source of media file placement on the absolute clock.
#[async_trait]
pub trait MediaMetadataSource: Send + Sync {
    /// Identifiers of the known media files.
    async fn media_files(&self) -> LosResult<Vec<String>>;

    /// Absolute start and duration of one media file.
    ///
    /// Fails with `MissingMetadata` rather than guessing a start time.
    async fn probe(&self, file_id: &str) -> LosResult<TrackFile>;
}

/// Receiver of render jobs; solely responsible for producing output media.
#[async_trait]
pub trait RenderSink: Send + Sync {
    async fn submit(&self, job: &RenderJob) -> LosResult<()>;

    /// Called once after the last job of a run.
    async fn finish(&self) -> LosResult<()> {
        Ok(())
    }
}
