//! Domain models for tracking samples, time intervals and media files.
//!
//! This module provides the value types shared by every stage of the dropout
//! analysis: raw samples of a tracked marker, absolute-time intervals, media
//! files placed on the absolute clock, and the cut plans produced by the
//! correlator. Constructors enforce the invariants the algorithms rely on.

use serde::{Deserialize, Serialize};

use super::error::{LosError, LosResult};

/// Value that marks "marker not detected in this frame".
pub const MISSING_SENTINEL: f64 = 0.0;

/// A single sample of a tracked marker.
///
/// `timestamp` is in seconds since the Unix epoch. A `value` of exactly
/// [`MISSING_SENTINEL`] means the marker was not detected.
///
/// # Examples
///
/// ```
/// use los_rust::core::domain::Sample;
///
/// let sample = Sample::new(1632816008.25, 0.0).unwrap();
/// assert!(sample.is_missing());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    /// Creates a sample, rejecting non-finite timestamps or values.
    pub fn new(timestamp: f64, value: f64) -> LosResult<Self> {
        if !timestamp.is_finite() {
            return Err(LosError::InvalidInput(format!(
                "sample timestamp is not finite: {}",
                timestamp
            )));
        }
        if !value.is_finite() {
            return Err(LosError::InvalidInput(format!(
                "sample value at {} is not finite: {}",
                timestamp, value
            )));
        }
        Ok(Self { timestamp, value })
    }

    /// Returns `true` if this sample carries the missing-marker sentinel.
    pub fn is_missing(&self) -> bool {
        self.value == MISSING_SENTINEL
    }
}

/// Sorts samples by timestamp.
///
/// Samples of one channel can arrive out of order when they come from several
/// recordings; the sort is stable so equal timestamps keep their input order.
pub fn sort_samples(samples: &mut [Sample]) {
    samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}

/// A closed time interval on the absolute clock, in epoch seconds.
///
/// # Examples
///
/// ```
/// use los_rust::core::domain::Interval;
///
/// let interval = Interval::new(100.0, 112.5).unwrap();
/// assert_eq!(interval.duration(), 12.5);
/// assert!(Interval::new(5.0, 1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    /// Creates an interval, requiring finite bounds and `start <= end`.
    pub fn new(start: f64, end: f64) -> LosResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(LosError::InvalidInput(format!(
                "interval bounds must be finite: [{}, {}]",
                start, end
            )));
        }
        if start > end {
            return Err(LosError::InvalidInput(format!(
                "interval start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Builds an interval from bounds already known to be ordered and finite.
    pub(crate) fn from_ordered(start: f64, end: f64) -> Self {
        debug_assert!(start <= end, "unordered interval [{}, {}]", start, end);
        Self { start, end }
    }

    /// Length of the interval in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Closed membership test.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    /// Returns `true` if the two intervals share a stretch of positive length.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The common part of two intervals, if it has positive length.
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end > start).then(|| Interval::from_ordered(start, end))
    }

    /// The interval widened by `padding` seconds on both sides.
    pub fn padded(&self, padding: f64) -> Interval {
        Interval::from_ordered(self.start - padding, self.end + padding)
    }
}

/// A media file placed on the absolute clock.
///
/// `end` is always `start + duration`; both come from the file's own metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFile {
    pub file_id: String,
    pub channel: String,
    pub start: f64,
    pub end: f64,
}

impl TrackFile {
    /// Creates a track file from its absolute start time and duration.
    ///
    /// # Examples
    ///
    /// ```
    /// use los_rust::core::domain::TrackFile;
    ///
    /// let file = TrackFile::new("room5_0001.mp4", "room5", 100.0, 100.0).unwrap();
    /// assert_eq!(file.end, 200.0);
    /// ```
    pub fn new(
        file_id: impl Into<String>,
        channel: impl Into<String>,
        start: f64,
        duration: f64,
    ) -> LosResult<Self> {
        let file_id = file_id.into();
        if !start.is_finite() {
            return Err(LosError::MissingMetadata(format!(
                "{}: start time is not a finite timestamp",
                file_id
            )));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(LosError::InvalidInput(format!(
                "{}: duration must be positive, got {}",
                file_id, duration
            )));
        }
        Ok(Self {
            file_id,
            channel: channel.into(),
            start,
            end: start + duration,
        })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// The file's absolute `[start, end]` span.
    pub fn span(&self) -> Interval {
        Interval::from_ordered(self.start, self.end)
    }
}

/// Which side of a window a note refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Before,
    After,
}

/// Position of a canonical dropout interval in its canonical list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub usize);

/// One file's contribution to a cut plan, in file-local seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSpan {
    pub file_id: String,
    pub local_start: f64,
    pub duration: f64,
}

impl FileSpan {
    pub fn local_end(&self) -> f64 {
        self.local_start + self.duration
    }
}

/// Data-quality conditions recorded while building a cut plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanNote {
    /// The requested padding could not be fully honoured on `side`.
    PaddingTruncated { side: Side, missing_seconds: f64 },
    /// The neighbouring file on `side` does not touch this file's span.
    ///
    /// With `stitched` set the neighbour's span is still part of the plan, so
    /// the spans cover `gap_seconds` less than the absolute window.
    RecordingGap {
        side: Side,
        neighbour: String,
        gap_seconds: f64,
        stitched: bool,
    },
}

impl PlanNote {
    /// Recording gaps are warnings; truncated padding is informational.
    pub fn is_warning(&self) -> bool {
        matches!(self, PlanNote::RecordingGap { .. })
    }
}

/// Which file(s), at which local offsets, reconstruct one padded dropout window.
///
/// `core_issue_window` is the un-padded dropout interval; `absolute_window` is
/// the padded, file-boundary-clamped interval to render. `spans` are in
/// chronological order and their durations sum to the absolute window, except
/// across a stitched [`PlanNote::RecordingGap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPlan {
    pub segment_id: SegmentId,
    pub spans: Vec<FileSpan>,
    pub absolute_window: Interval,
    pub core_issue_window: Interval,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<PlanNote>,
}

impl CutPlan {
    /// Sum of the per-file span durations.
    pub fn total_duration(&self) -> f64 {
        self.spans.iter().map(|s| s.duration).sum()
    }

    pub fn is_multi_file(&self) -> bool {
        self.spans.len() > 1
    }

    pub fn file_ids(&self) -> Vec<&str> {
        self.spans.iter().map(|s| s.file_id.as_str()).collect()
    }

    pub fn has_warnings(&self) -> bool {
        self.notes.iter().any(PlanNote::is_warning)
    }

    /// The core issue, clipped to the rendered window and expressed relative
    /// to the window's start. Used for overlay timing.
    pub fn issue_offset_in_window(&self) -> Option<Interval> {
        self.core_issue_window
            .intersection(&self.absolute_window)
            .map(|i| {
                Interval::from_ordered(
                    i.start - self.absolute_window.start,
                    i.end - self.absolute_window.start,
                )
            })
    }
}
