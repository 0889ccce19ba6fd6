//! Absolute-time windows of interest.
//!
//! Timeframes are authored by people as `"HH:MM:SS - HH:MM:SS"` ranges for a
//! given calendar day. They are anchored to that date in a fixed UTC offset
//! (taken from configuration, never inferred from the host) and converted to
//! epoch seconds once; the resulting [`TimeframeSet`] is immutable.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::core::domain::Interval;
use crate::core::error::{LosError, LosResult};

const CLOCK_FORMAT: &str = "%H:%M:%S";

/// Sorted, pairwise disjoint set of absolute-time windows.
///
/// # Examples
///
/// ```
/// use los_rust::core::domain::Interval;
/// use los_rust::time::TimeframeSet;
///
/// let set = TimeframeSet::new(vec![
///     Interval::new(50.0, 60.0).unwrap(),
///     Interval::new(0.0, 10.0).unwrap(),
///     Interval::new(10.0, 20.0).unwrap(),
/// ]);
/// assert_eq!(set.len(), 2);
/// assert!(set.contains(15.0));
/// assert!(!set.contains(30.0));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeframeSet {
    frames: Vec<Interval>,
}

impl TimeframeSet {
    /// Builds a set from arbitrary windows, merging overlapping and touching ones.
    pub fn new(mut frames: Vec<Interval>) -> Self {
        frames.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut merged: Vec<Interval> = Vec::with_capacity(frames.len());
        for frame in frames {
            match merged.last_mut() {
                Some(last) if frame.start <= last.end => {
                    if frame.end > last.end {
                        last.end = frame.end;
                    }
                }
                _ => merged.push(frame),
            }
        }

        Self { frames: merged }
    }

    /// Builds a set from clock ranges of a single calendar day.
    pub fn from_clock_ranges<S: AsRef<str>>(
        date: NaiveDate,
        ranges: &[S],
        offset: FixedOffset,
    ) -> LosResult<Self> {
        let frames = ranges
            .iter()
            .map(|r| parse_clock_range(r.as_ref(), date, offset))
            .collect::<LosResult<Vec<_>>>()?;
        Ok(Self::new(frames))
    }

    /// Builds a set from clock ranges keyed by calendar day.
    pub fn from_schedule<S: AsRef<str>>(
        schedule: &BTreeMap<NaiveDate, Vec<S>>,
        offset: FixedOffset,
    ) -> LosResult<Self> {
        let mut frames = Vec::new();
        for (date, ranges) in schedule {
            for range in ranges {
                frames.push(parse_clock_range(range.as_ref(), *date, offset)?);
            }
        }
        Ok(Self::new(frames))
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Closed membership test: `t` lies inside some window, boundaries included.
    pub fn contains(&self, t: f64) -> bool {
        let idx = self.frames.partition_point(|f| f.end < t);
        self.frames.get(idx).is_some_and(|f| f.start <= t)
    }

    /// Returns `true` if `interval` shares a stretch of positive length with any window.
    pub fn intersects(&self, interval: &Interval) -> bool {
        !self.clip(interval).is_empty()
    }

    /// Splits `interval` into its positive-length pieces inside the windows.
    pub fn clip(&self, interval: &Interval) -> Vec<Interval> {
        let first = self.frames.partition_point(|f| f.end <= interval.start);
        self.frames[first..]
            .iter()
            .take_while(|f| f.start < interval.end)
            .filter_map(|f| f.intersection(interval))
            .collect()
    }

    /// Earliest start and latest end over all windows.
    pub fn bounds(&self) -> Option<Interval> {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => Some(Interval::from_ordered(first.start, last.end)),
            _ => None,
        }
    }
}

/// Parses a UTC offset such as `"+02:00"`, `"-0530"` or `"Z"`.
pub fn parse_utc_offset(text: &str) -> LosResult<FixedOffset> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| LosError::Configuration("invalid UTC offset".to_string()));
    }
    trimmed
        .parse::<FixedOffset>()
        .map_err(|e| LosError::Configuration(format!("invalid UTC offset '{}': {}", text, e)))
}

/// Converts a wall-clock time on `date` in `offset` to epoch seconds.
pub fn clock_to_epoch(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> LosResult<f64> {
    let local = NaiveDateTime::new(date, time);
    let dt = offset.from_local_datetime(&local).single().ok_or_else(|| {
        LosError::Parse(format!("ambiguous local time {} at offset {}", local, offset))
    })?;
    Ok(dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9)
}

/// Parses one `"HH:MM:SS - HH:MM:SS"` range anchored to `date`.
///
/// # Examples
///
/// ```
/// use chrono::{FixedOffset, NaiveDate};
/// use los_rust::time::parse_clock_range;
///
/// let date = NaiveDate::from_ymd_opt(2021, 9, 28).unwrap();
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let frame = parse_clock_range("10:00:08 - 10:21:29", date, utc).unwrap();
/// assert_eq!(frame.duration(), 1281.0);
/// ```
pub fn parse_clock_range(text: &str, date: NaiveDate, offset: FixedOffset) -> LosResult<Interval> {
    let (start_text, end_text) = text
        .split_once('-')
        .ok_or_else(|| LosError::Parse(format!("expected 'HH:MM:SS - HH:MM:SS', got '{}'", text)))?;

    let start = parse_clock(start_text)?;
    let end = parse_clock(end_text)?;
    if end < start {
        return Err(LosError::Parse(format!(
            "timeframe '{}' ends before it starts",
            text.trim()
        )));
    }

    Interval::new(
        clock_to_epoch(date, start, offset)?,
        clock_to_epoch(date, end, offset)?,
    )
}

fn parse_clock(text: &str) -> LosResult<NaiveTime> {
    let trimmed = text.trim();
    NaiveTime::parse_from_str(trimmed, CLOCK_FORMAT)
        .map_err(|e| LosError::Parse(format!("invalid clock time '{}': {}", trimmed, e)))
}
