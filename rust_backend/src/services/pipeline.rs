//! Synchronous detect → merge → correlate pipeline.
//!
//! The pipeline owns the validated components built from an
//! [`AnalysisConfig`]. Detection and merging run per channel; a channel whose
//! samples are malformed is reported as a failure and the remaining channels
//! still complete. Correlation runs over every media file in a [`TrackIndex`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::algorithms::correlation::TimelineCorrelator;
use crate::algorithms::detection::DropoutDetector;
use crate::algorithms::merging::SegmentMerger;
use crate::algorithms::track_index::TrackIndex;
use crate::config::AnalysisConfig;
use crate::core::domain::{sort_samples, CutPlan, Interval, Sample, TrackFile};
use crate::core::error::{LosError, LosResult};
use crate::time::TimeframeSet;

/// Dropouts found on one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDropouts {
    pub channel: String,
    pub sample_count: usize,
    /// Detector output before merging.
    pub raw: Vec<Interval>,
    /// Canonical list after timeframe clipping and merging.
    pub canonical: Vec<Interval>,
}

/// A channel, recording or media file that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub subject: String,
    pub error: String,
}

impl Failure {
    pub fn new(subject: impl Into<String>, error: &LosError) -> Self {
        Self {
            subject: subject.into(),
            error: error.to_string(),
        }
    }
}

/// Everything one pipeline pass produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineOutput {
    pub dropouts: Vec<ChannelDropouts>,
    pub channel_failures: Vec<Failure>,
    /// Canonical union of the source channels' dropouts.
    pub segments: Vec<Interval>,
    pub plans: Vec<CutPlan>,
}

/// Validated components for one analysis run.
#[derive(Debug, Clone)]
pub struct DropoutPipeline {
    config: AnalysisConfig,
    detectors: BTreeMap<String, DropoutDetector>,
    default_detector: DropoutDetector,
    merger: SegmentMerger,
    correlator: TimelineCorrelator,
    timeframes: Option<TimeframeSet>,
}

impl DropoutPipeline {
    pub fn new(config: &AnalysisConfig) -> LosResult<Self> {
        config.validate()?;

        let default_detector = DropoutDetector::new(&config.detector_config("")?)?;
        let mut detectors = BTreeMap::new();
        for channel in config.channels.keys() {
            detectors.insert(
                channel.clone(),
                DropoutDetector::new(&config.detector_config(channel)?)?,
            );
        }

        Ok(Self {
            config: config.clone(),
            detectors,
            default_detector,
            merger: SegmentMerger::new(&config.merge_config())?,
            correlator: TimelineCorrelator::new(&config.correlation_config())?,
            timeframes: config.timeframe_set()?,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn timeframes(&self) -> Option<&TimeframeSet> {
        self.timeframes.as_ref()
    }

    pub fn detector_for(&self, channel: &str) -> &DropoutDetector {
        self.detectors.get(channel).unwrap_or(&self.default_detector)
    }

    /// Detects and canonicalizes the dropouts of one channel.
    ///
    /// `samples` may come from several recordings in any order.
    pub fn detect_channel(&self, channel: &str, samples: &[Sample]) -> LosResult<ChannelDropouts> {
        let mut sorted = samples.to_vec();
        sort_samples(&mut sorted);

        let raw = self.detector_for(channel).detect_samples(&sorted)?;
        let canonical = self.merger.merge(&raw, self.timeframes.as_ref());

        log::info!(
            "Channel {}: {} samples, {} raw dropout(s), {} canonical",
            channel,
            sorted.len(),
            raw.len(),
            canonical.len()
        );
        Ok(ChannelDropouts {
            channel: channel.to_string(),
            sample_count: sorted.len(),
            raw,
            canonical,
        })
    }

    /// Runs [`detect_channel`](Self::detect_channel) on every channel, isolating failures.
    pub fn detect_all(
        &self,
        channels: &BTreeMap<String, Vec<Sample>>,
    ) -> (Vec<ChannelDropouts>, Vec<Failure>) {
        let mut dropouts = Vec::new();
        let mut failures = Vec::new();
        for (channel, samples) in channels {
            match self.detect_channel(channel, samples) {
                Ok(found) => dropouts.push(found),
                Err(e) => {
                    log::warn!("Skipping channel {}: {}", channel, e);
                    failures.push(Failure::new(channel.clone(), &e));
                }
            }
        }
        (dropouts, failures)
    }

    /// Canonical union of the dropouts of the configured source channels.
    pub fn source_segments(&self, dropouts: &[ChannelDropouts]) -> Vec<Interval> {
        let sources = &self.config.correlation.source_channels;
        let lists: Vec<&[Interval]> = dropouts
            .iter()
            .filter(|d| sources.iter().any(|s| s == &d.channel))
            .map(|d| d.canonical.as_slice())
            .collect();
        self.merger.union(&lists, self.timeframes.as_ref())
    }

    pub fn build_index(&self, files: Vec<TrackFile>) -> LosResult<TrackIndex> {
        TrackIndex::build_with_resolution(files, self.config.correlation.session_resolution)
    }

    /// Cut plans for every indexed media file, ordered by segment then window start.
    ///
    /// A dropout recorded by several files yields one plan per file, each
    /// padded around that file's share of the dropout.
    pub fn correlate(&self, segments: &[Interval], index: &TrackIndex) -> Vec<CutPlan> {
        let mut plans: Vec<CutPlan> = index
            .iter()
            .flat_map(|file| self.correlator.correlate(segments, file, index))
            .collect();
        plans.sort_by(|a, b| {
            a.segment_id
                .cmp(&b.segment_id)
                .then(a.absolute_window.start.total_cmp(&b.absolute_window.start))
                .then_with(|| a.file_ids().cmp(&b.file_ids()))
        });

        let warnings = plans.iter().filter(|p| p.has_warnings()).count();
        log::info!(
            "Correlated {} segment(s) against {} file(s): {} plan(s), {} with recording gaps",
            segments.len(),
            index.len(),
            plans.len(),
            warnings
        );
        plans
    }

    /// Full pass over in-memory inputs.
    pub fn run(
        &self,
        channels: &BTreeMap<String, Vec<Sample>>,
        files: Vec<TrackFile>,
    ) -> LosResult<PipelineOutput> {
        let (dropouts, channel_failures) = self.detect_all(channels);
        let segments = self.source_segments(&dropouts);
        let index = self.build_index(files)?;
        let plans = self.correlate(&segments, &index);
        Ok(PipelineOutput {
            dropouts,
            channel_failures,
            segments,
            plans,
        })
    }
}
