use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::domain::Sample;
use crate::time::TimeframeSet;

/// Missing-marker statistics of one channel in one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub recording: String,
    pub channel: String,
    pub total_points: usize,
    pub missing_points: usize,
    pub missing_percentage: f64,
    pub first_timestamp: f64,
    pub last_timestamp: f64,
}

/// Summarize one channel of one recording
///
/// # Arguments
/// * `recording` - Recording name, usually the source file stem
/// * `channel` - Channel label
/// * `samples` - Samples of the channel, in any order
/// * `timeframes` - Only samples inside these windows are counted when given
///
/// # Returns
/// `None` when no sample falls inside the timeframes
pub fn summarize_recording(
    recording: &str,
    channel: &str,
    samples: &[Sample],
    timeframes: Option<&TimeframeSet>,
) -> Option<RecordingSummary> {
    let mut total = 0usize;
    let mut missing = 0usize;
    let mut first = f64::INFINITY;
    let mut last = f64::NEG_INFINITY;

    for sample in samples
        .iter()
        .filter(|s| timeframes.map_or(true, |tf| tf.contains(s.timestamp)))
    {
        total += 1;
        if sample.is_missing() {
            missing += 1;
        }
        first = first.min(sample.timestamp);
        last = last.max(sample.timestamp);
    }

    if total == 0 {
        return None;
    }

    Some(RecordingSummary {
        recording: recording.to_string(),
        channel: channel.to_string(),
        total_points: total,
        missing_points: missing,
        missing_percentage: missing as f64 / total as f64 * 100.0,
        first_timestamp: first,
        last_timestamp: last,
    })
}

/// Summarize every channel of one recording, in channel order
pub fn summarize_channels(
    recording: &str,
    channels: &BTreeMap<String, Vec<Sample>>,
    timeframes: Option<&TimeframeSet>,
) -> Vec<RecordingSummary> {
    channels
        .iter()
        .filter_map(|(channel, samples)| {
            summarize_recording(recording, channel, samples, timeframes)
        })
        .collect()
}

/// Mean of the per-recording missing percentages, `None` for no summaries
pub fn average_missing_percentage(summaries: &[RecordingSummary]) -> Option<f64> {
    if summaries.is_empty() {
        return None;
    }
    let sum: f64 = summaries.iter().map(|s| s.missing_percentage).sum();
    Some(sum / summaries.len() as f64)
}
