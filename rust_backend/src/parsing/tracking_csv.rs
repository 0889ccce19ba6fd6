use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use polars::prelude::*;

use crate::config::TrackingSettings;
use crate::core::domain::{sort_samples, Sample, MISSING_SENTINEL};
use crate::core::error::{LosError, LosResult};

/// Samples of one recording keyed by channel label, each sorted by timestamp
pub type ChannelSamples = BTreeMap<String, Vec<Sample>>;

/// Column names of an exported tracking-topic CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingColumns {
    pub time: String,
    pub channel: String,
    pub value: String,
}

impl Default for TrackingColumns {
    fn default() -> Self {
        Self::from(&TrackingSettings::default())
    }
}

impl From<&TrackingSettings> for TrackingColumns {
    fn from(settings: &TrackingSettings) -> Self {
        Self {
            time: settings.time_column.clone(),
            channel: settings.channel_column.clone(),
            value: settings.value_column.clone(),
        }
    }
}

fn string_column<'a>(df: &'a DataFrame, name: &str) -> LosResult<&'a StringChunked> {
    let column = df
        .get_column_names()
        .into_iter()
        .find(|h| h.trim() == name)
        .ok_or_else(|| LosError::Parse(format!("missing column '{}'", name)))?;
    Ok(df.column(column.as_str())?.str()?)
}

/// Parse an exported tracking CSV into per-channel samples
///
/// Rows are split by the channel column. An empty value cell is read as the
/// missing-marker sentinel; an empty or non-numeric timestamp is an error.
pub fn parse_tracking_csv<R: Read>(mut reader: R, columns: &TrackingColumns) -> LosResult<ChannelSamples> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    // Every column is read as text so bad cells can be reported by line
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    let times = string_column(&df, &columns.time)?;
    let labels = string_column(&df, &columns.channel)?;
    let values = string_column(&df, &columns.value)?;

    let mut channels = ChannelSamples::new();
    for (row, ((time, label), value)) in times
        .into_iter()
        .zip(labels.into_iter())
        .zip(values.into_iter())
        .enumerate()
    {
        // header is line 1
        let line = row + 2;

        let time_text = time.unwrap_or("").trim();
        let timestamp: f64 = time_text.parse().map_err(|_| {
            LosError::Parse(format!("line {}: invalid timestamp '{}'", line, time_text))
        })?;

        let value_text = value.unwrap_or("").trim();
        let value = if value_text.is_empty() {
            MISSING_SENTINEL
        } else {
            value_text.parse::<f64>().map_err(|_| {
                LosError::Parse(format!("line {}: invalid value '{}'", line, value_text))
            })?
        };

        let channel = label.unwrap_or("").trim();
        let sample = Sample::new(timestamp, value)
            .map_err(|e| LosError::Parse(format!("line {}: {}", line, e)))?;
        channels.entry(channel.to_string()).or_default().push(sample);
    }

    for samples in channels.values_mut() {
        sort_samples(samples);
    }

    log::debug!(
        "Parsed tracking CSV: {} channel(s), {} sample(s)",
        channels.len(),
        channels.values().map(Vec::len).sum::<usize>()
    );
    Ok(channels)
}

/// Parse a tracking CSV file into per-channel samples
pub fn parse_tracking_csv_file(path: &Path, columns: &TrackingColumns) -> LosResult<ChannelSamples> {
    let file = File::open(path)?;
    parse_tracking_csv(file, columns).map_err(|e| match e {
        LosError::Parse(msg) => LosError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Pool the channels of several recordings, re-sorting each pooled channel
pub fn pool_channels<I>(recordings: I) -> ChannelSamples
where
    I: IntoIterator<Item = ChannelSamples>,
{
    let mut pooled = ChannelSamples::new();
    for recording in recordings {
        for (channel, samples) in recording {
            pooled.entry(channel).or_default().extend(samples);
        }
    }
    for samples in pooled.values_mut() {
        sort_samples(samples);
    }
    pooled
}
