//! Analysis configuration file support.
//!
//! This module reads the analysis settings from a TOML file. Every field has a
//! default, so an empty file yields the stock configuration:
//!
//! ```toml
//! [detection]
//! window_size = 60
//! threshold_percentage = 90.0
//! strategy = "incremental"
//!
//! [merge]
//! min_duration = 2.0
//! tolerance = 0.0
//!
//! [correlation]
//! padding = 1.5
//! contiguity_tolerance = 0.5
//! session_resolution = 1.0
//! source_channels = ["telescopeMarkerTransform"]
//!
//! [tracking]
//! time_column = "Time"
//! channel_column = "header.frame_id"
//! value_column = "pose.position.x"
//!
//! [timeframes]
//! utc_offset = "+00:00"
//!
//! [timeframes.dates]
//! "2021-09-28" = ["10:00:08 - 10:21:29"]
//!
//! [channels.phantomMarkerTransform]
//! threshold_percentage = 80.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::algorithms::correlation::{CorrelationConfig, TimelineCorrelator};
use crate::algorithms::detection::{DetectionStrategy, DetectorConfig, DropoutDetector, Threshold};
use crate::algorithms::merging::{MergeConfig, SegmentMerger};
use crate::core::error::{LosError, LosResult};
use crate::time::{parse_utc_offset, TimeframeSet};

const CONFIG_FILE_NAME: &str = "los.toml";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Analysis configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub detection: DetectionSettings,
    #[serde(default)]
    pub merge: MergeSettings,
    #[serde(default)]
    pub correlation: CorrelationSettings,
    #[serde(default)]
    pub tracking: TrackingSettings,
    #[serde(default)]
    pub timeframes: TimeframeSettings,
    /// Per-channel detection overrides keyed by channel label.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelSettings>,
}

/// Default detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub threshold_percentage: Option<f64>,
    #[serde(default)]
    pub threshold_count: Option<usize>,
    #[serde(default)]
    pub strategy: DetectionStrategy,
}

/// Detection overrides for one channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelSettings {
    #[serde(default)]
    pub window_size: Option<usize>,
    #[serde(default)]
    pub threshold_percentage: Option<f64>,
    #[serde(default)]
    pub threshold_count: Option<usize>,
}

/// Merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSettings {
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,
    #[serde(default)]
    pub tolerance: f64,
}

/// Correlation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationSettings {
    #[serde(default = "default_padding")]
    pub padding: f64,
    #[serde(default = "default_contiguity_tolerance")]
    pub contiguity_tolerance: f64,
    #[serde(default = "default_session_resolution")]
    pub session_resolution: f64,
    /// Channels whose dropouts are cut out of the media files.
    #[serde(default = "default_source_channels")]
    pub source_channels: Vec<String>,
}

/// Column names of the exported tracking CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSettings {
    #[serde(default = "default_time_column")]
    pub time_column: String,
    #[serde(default = "default_channel_column")]
    pub channel_column: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
}

/// Timeframes of interest keyed by calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeSettings {
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default)]
    pub dates: BTreeMap<String, Vec<String>>,
}

fn default_window_size() -> usize {
    60
}

fn default_threshold_percentage() -> f64 {
    90.0
}

fn default_min_duration() -> f64 {
    2.0
}

fn default_padding() -> f64 {
    1.5
}

fn default_contiguity_tolerance() -> f64 {
    0.5
}

fn default_session_resolution() -> f64 {
    1.0
}

fn default_source_channels() -> Vec<String> {
    vec!["telescopeMarkerTransform".to_string()]
}

fn default_time_column() -> String {
    "Time".to_string()
}

fn default_channel_column() -> String {
    "header.frame_id".to_string()
}

fn default_value_column() -> String {
    "pose.position.x".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            threshold_percentage: None,
            threshold_count: None,
            strategy: DetectionStrategy::default(),
        }
    }
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            min_duration: default_min_duration(),
            tolerance: 0.0,
        }
    }
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            contiguity_tolerance: default_contiguity_tolerance(),
            session_resolution: default_session_resolution(),
            source_channels: default_source_channels(),
        }
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            time_column: default_time_column(),
            channel_column: default_channel_column(),
            value_column: default_value_column(),
        }
    }
}

impl Default for TimeframeSettings {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            dates: BTreeMap::new(),
        }
    }
}

fn threshold_from(percentage: Option<f64>, count: Option<usize>, scope: &str) -> LosResult<Option<Threshold>> {
    match (percentage, count) {
        (Some(_), Some(_)) => Err(LosError::Configuration(format!(
            "{}: set either threshold_percentage or threshold_count, not both",
            scope
        ))),
        (Some(pct), None) => Ok(Some(Threshold::Percent(pct))),
        (None, Some(n)) => Ok(Some(Threshold::Count(n))),
        (None, None) => Ok(None),
    }
}

impl AnalysisConfig {
    /// Load analysis configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(AnalysisConfig)` if successful
    /// * `Err(LosError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> LosResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            LosError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse analysis configuration from TOML text.
    pub fn from_toml_str(content: &str) -> LosResult<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load analysis configuration from the default location.
    ///
    /// Searches for `los.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> LosResult<Self> {
        let search_paths = vec![
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("rust_backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in search_paths {
            if path.exists() {
                log::info!("Using configuration file {}", path.display());
                return Self::from_file(&path);
            }
        }

        Err(LosError::Configuration(format!(
            "No {} found in standard locations",
            CONFIG_FILE_NAME
        )))
    }

    /// Detector settings for `channel`, with its overrides applied.
    pub fn detector_config(&self, channel: &str) -> LosResult<DetectorConfig> {
        let base = threshold_from(
            self.detection.threshold_percentage,
            self.detection.threshold_count,
            "[detection]",
        )?
        .unwrap_or(Threshold::Percent(default_threshold_percentage()));

        let mut config = DetectorConfig {
            window_size: self.detection.window_size,
            threshold: base,
            strategy: self.detection.strategy,
        };

        if let Some(overrides) = self.channels.get(channel) {
            if let Some(window_size) = overrides.window_size {
                config.window_size = window_size;
            }
            let scope = format!("[channels.{}]", channel);
            if let Some(threshold) =
                threshold_from(overrides.threshold_percentage, overrides.threshold_count, &scope)?
            {
                config.threshold = threshold;
            }
        }

        Ok(config)
    }

    pub fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            min_duration: self.merge.min_duration,
            tolerance: self.merge.tolerance,
        }
    }

    /// Correlator settings; the minimum window length is shared with the merger.
    pub fn correlation_config(&self) -> CorrelationConfig {
        CorrelationConfig {
            padding: self.correlation.padding,
            contiguity_tolerance: self.correlation.contiguity_tolerance,
            min_duration: self.merge.min_duration,
        }
    }

    /// Timeframes of interest, or `None` when no date lists any range.
    pub fn timeframe_set(&self) -> LosResult<Option<TimeframeSet>> {
        let offset = parse_utc_offset(&self.timeframes.utc_offset)?;

        let mut schedule: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
        for (date, ranges) in &self.timeframes.dates {
            let day = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|e| {
                LosError::Configuration(format!("invalid timeframe date '{}': {}", date, e))
            })?;
            schedule.entry(day).or_default().extend(ranges.iter().cloned());
        }

        let frames = TimeframeSet::from_schedule(&schedule, offset)?;
        if frames.is_empty() {
            return Ok(None);
        }
        Ok(Some(frames))
    }

    /// Checks every section by building the components it configures.
    pub fn validate(&self) -> LosResult<()> {
        DropoutDetector::new(&self.detector_config("")?)?;
        for channel in self.channels.keys() {
            DropoutDetector::new(&self.detector_config(channel)?)?;
        }
        SegmentMerger::new(&self.merge_config())?;
        TimelineCorrelator::new(&self.correlation_config())?;

        let resolution = self.correlation.session_resolution;
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(LosError::Configuration(format!(
                "session resolution must be positive, got {}",
                resolution
            )));
        }
        if self.correlation.source_channels.is_empty() {
            return Err(LosError::Configuration(
                "at least one source channel is required".to_string(),
            ));
        }

        self.timeframe_set()?;
        Ok(())
    }
}
