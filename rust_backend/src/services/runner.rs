//! Asynchronous orchestration of a full analysis run.
//!
//! Collaborator data is loaded concurrently, detection runs on the blocking
//! pool one task per channel, and the resulting cut plans are handed to the
//! render sink in order. A failing recording, channel, media file or render
//! job is recorded in the [`RunReport`] and the run carries on.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::algorithms::analysis::{average_missing_percentage, summarize_channels, RecordingSummary};
use crate::core::domain::{CutPlan, Interval, TrackFile};
use crate::core::error::{LosError, LosResult};
use crate::parsing::annotations::AnnotationLog;
use crate::parsing::tracking_csv::{pool_channels, ChannelSamples};
use crate::services::collaborators::{MediaMetadataSource, Recording, RenderJob, RenderSink, SampleSource};
use crate::services::pipeline::{ChannelDropouts, DropoutPipeline, Failure};

/// Outcome of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub recordings_loaded: usize,
    pub recording_failures: Vec<Failure>,
    pub summaries: Vec<RecordingSummary>,
    pub average_missing_percentage: Option<f64>,
    pub dropouts: Vec<ChannelDropouts>,
    pub channel_failures: Vec<Failure>,
    pub media_files: usize,
    pub media_failures: Vec<Failure>,
    pub segments: Vec<Interval>,
    pub plans: Vec<CutPlan>,
    pub jobs_submitted: usize,
    pub sink_failures: Vec<Failure>,
}

impl RunReport {
    pub fn failure_count(&self) -> usize {
        self.recording_failures.len()
            + self.channel_failures.len()
            + self.media_failures.len()
            + self.sink_failures.len()
    }
}

pub struct AnalysisRunner {
    pipeline: Arc<DropoutPipeline>,
    samples: Arc<dyn SampleSource>,
    media: Arc<dyn MediaMetadataSource>,
    sink: Arc<dyn RenderSink>,
    annotations: Option<AnnotationLog>,
}

impl AnalysisRunner {
    pub fn new(
        pipeline: DropoutPipeline,
        samples: Arc<dyn SampleSource>,
        media: Arc<dyn MediaMetadataSource>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            samples,
            media,
            sink,
            annotations: None,
        }
    }

    /// Attach operator log steps to the render jobs.
    pub fn with_annotations(mut self, annotations: AnnotationLog) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Runs the whole analysis.
    ///
    /// Only failures to enumerate recordings or media files, or to finish the
    /// sink, abort the run.
    pub async fn run(&self) -> LosResult<RunReport> {
        let mut report = RunReport::default();

        let recordings = self.load_recordings(&mut report).await?;
        report.recordings_loaded = recordings.len();

        for recording in &recordings {
            report.summaries.extend(summarize_channels(
                &recording.name,
                &recording.channels,
                self.pipeline.timeframes(),
            ));
        }
        report.average_missing_percentage = average_missing_percentage(&report.summaries);

        let pooled = pool_channels(recordings.into_iter().map(|r| r.channels));
        self.detect(pooled, &mut report).await;

        let files = self.probe_media(&mut report).await?;
        report.media_files = files.len();

        report.segments = self.pipeline.source_segments(&report.dropouts);
        let index = self.pipeline.build_index(files)?;

        let pipeline = Arc::clone(&self.pipeline);
        let segments = report.segments.clone();
        report.plans = tokio::task::spawn_blocking(move || pipeline.correlate(&segments, &index))
            .await
            .map_err(|e| LosError::Io(std::io::Error::other(e)))?;

        self.submit(&mut report).await?;

        log::info!(
            "Run finished: {} recording(s), {} segment(s), {} job(s) submitted, {} failure(s)",
            report.recordings_loaded,
            report.segments.len(),
            report.jobs_submitted,
            report.failure_count()
        );
        Ok(report)
    }

    async fn load_recordings(&self, report: &mut RunReport) -> LosResult<Vec<Recording>> {
        let names = self.samples.recordings().await?;
        let loads = join_all(names.iter().map(|name| self.samples.load(name))).await;

        let mut recordings = Vec::with_capacity(names.len());
        for (name, result) in names.iter().zip(loads) {
            match result {
                Ok(recording) => recordings.push(recording),
                Err(e) => {
                    log::warn!("Skipping recording {}: {}", name, e);
                    report.recording_failures.push(Failure::new(name.clone(), &e));
                }
            }
        }
        Ok(recordings)
    }

    async fn detect(&self, pooled: ChannelSamples, report: &mut RunReport) {
        let tasks = pooled.into_iter().map(|(channel, samples)| {
            let pipeline = Arc::clone(&self.pipeline);
            let label = channel.clone();
            let handle = tokio::task::spawn_blocking(move || pipeline.detect_channel(&channel, &samples));
            async move { (label, handle.await) }
        });

        for (channel, outcome) in join_all(tasks).await {
            match outcome {
                Ok(Ok(dropouts)) => report.dropouts.push(dropouts),
                Ok(Err(e)) => {
                    log::warn!("Skipping channel {}: {}", channel, e);
                    report.channel_failures.push(Failure::new(channel, &e));
                }
                Err(e) => {
                    log::warn!("Detection task for channel {} failed: {}", channel, e);
                    report.channel_failures.push(Failure {
                        subject: channel,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    async fn probe_media(&self, report: &mut RunReport) -> LosResult<Vec<TrackFile>> {
        let ids = self.media.media_files().await?;
        let probes = join_all(ids.iter().map(|id| self.media.probe(id))).await;

        let mut files = Vec::with_capacity(ids.len());
        for (id, result) in ids.iter().zip(probes) {
            match result {
                Ok(file) => files.push(file),
                Err(e) => {
                    log::warn!("Skipping media file {}: {}", id, e);
                    report.media_failures.push(Failure::new(id.clone(), &e));
                }
            }
        }
        Ok(files)
    }

    async fn submit(&self, report: &mut RunReport) -> LosResult<()> {
        for plan in &report.plans {
            let step = self
                .annotations
                .as_ref()
                .and_then(|steps| steps.find_step_at(plan.core_issue_window.start))
                .cloned();
            let job = RenderJob {
                plan: plan.clone(),
                step,
            };
            match self.sink.submit(&job).await {
                Ok(()) => report.jobs_submitted += 1,
                Err(e) => {
                    let subject = format!("segment {} ({})", plan.segment_id.0, plan.file_ids().join("+"));
                    log::warn!("Render job for {} failed: {}", subject, e);
                    report.sink_failures.push(Failure::new(subject, &e));
                }
            }
        }
        self.sink.finish().await
    }
}
