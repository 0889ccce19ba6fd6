//! Sliding-window dropout detection.
//!
//! The detector scans one channel's `(timestamp, value)` series with a window
//! of the last `window_size` samples and counts how many carry the missing
//! sentinel. While the count is at or above the threshold the channel is in
//! dropout.
//!
//! Boundary rules:
//! - only full windows are evaluated (the first one ends at index `window_size - 1`);
//! - a dropout starts at the timestamp of the *first sample of the first
//!   triggering window* and is not moved while the condition holds;
//! - it ends at the timestamp of the sample *before* the last sample of the
//!   first window that falls below the threshold;
//! - a dropout still open at the end of the series closes at the last timestamp.
//!
//! Start times are therefore anchored to the window's left edge, which
//! coarsens them by up to one window. Minimum-duration and padding settings
//! are calibrated against this.
//!
//! Two scan strategies produce identical output: [`DetectionStrategy::Windowed`]
//! recounts every window (O(n·w)), [`DetectionStrategy::Incremental`] keeps a
//! rolling count (O(n)).

use serde::{Deserialize, Serialize};

use crate::core::domain::{Interval, Sample, MISSING_SENTINEL};
use crate::core::error::{LosError, LosResult};

/// How many missing samples in a window put the channel in dropout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// Absolute number of missing samples.
    Count(usize),
    /// Percentage of the window, rounded up to a whole sample count.
    ///
    /// The count is `ceil(pct * window_size / 100)`, multiplying before
    /// dividing so exact fractions stay exact: 70% of 10 samples needs 7.
    /// Comparing a count against the float `pct / 100.0 * window_size`
    /// instead can demand one sample more when that product rounds above
    /// the integer.
    Percent(f64),
}

impl Threshold {
    /// Converts the threshold into a missing-sample count for `window_size`.
    ///
    /// # Examples
    ///
    /// ```
    /// use los_rust::algorithms::detection::Threshold;
    ///
    /// assert_eq!(Threshold::Percent(90.0).resolve(60).unwrap(), 54);
    /// assert_eq!(Threshold::Percent(50.0).resolve(3).unwrap(), 2);
    /// assert_eq!(Threshold::Percent(70.0).resolve(10).unwrap(), 7);
    /// assert!(Threshold::Count(4).resolve(3).is_err());
    /// ```
    pub fn resolve(&self, window_size: usize) -> LosResult<usize> {
        match *self {
            Threshold::Count(count) => {
                if count > window_size {
                    return Err(LosError::Configuration(format!(
                        "threshold count {} exceeds window size {}",
                        count, window_size
                    )));
                }
                Ok(count)
            }
            Threshold::Percent(pct) => {
                if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                    return Err(LosError::Configuration(format!(
                        "threshold percentage must be within [0, 100], got {}",
                        pct
                    )));
                }
                let exact = pct * window_size as f64 / 100.0;
                Ok((exact.ceil() as usize).min(window_size))
            }
        }
    }
}

/// Window scan implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Recount every window.
    Windowed,
    /// Maintain a rolling missing count.
    #[default]
    Incremental,
}

/// Detector settings for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub window_size: usize,
    pub threshold: Threshold,
    pub strategy: DetectionStrategy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            threshold: Threshold::Percent(90.0),
            strategy: DetectionStrategy::Incremental,
        }
    }
}

/// Sliding-window dropout detector.
///
/// # Examples
///
/// ```
/// use los_rust::algorithms::detection::{DetectionStrategy, DetectorConfig, DropoutDetector, Threshold};
///
/// let detector = DropoutDetector::new(&DetectorConfig {
///     window_size: 3,
///     threshold: Threshold::Count(2),
///     strategy: DetectionStrategy::Incremental,
/// })
/// .unwrap();
///
/// let timestamps = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
/// let values = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0];
/// let intervals = detector.detect(&timestamps, &values).unwrap();
///
/// assert_eq!(intervals.len(), 2);
/// assert_eq!((intervals[0].start, intervals[0].end), (0.0, 2.0));
/// assert_eq!((intervals[1].start, intervals[1].end), (3.0, 7.0));
/// ```
#[derive(Debug, Clone)]
pub struct DropoutDetector {
    window_size: usize,
    threshold_count: usize,
    strategy: DetectionStrategy,
}

impl DropoutDetector {
    /// Creates a detector, rejecting an empty window or an out-of-range threshold.
    pub fn new(config: &DetectorConfig) -> LosResult<Self> {
        if config.window_size == 0 {
            return Err(LosError::Configuration(
                "window size must be at least 1".to_string(),
            ));
        }
        let threshold_count = config.threshold.resolve(config.window_size)?;
        Ok(Self {
            window_size: config.window_size,
            threshold_count,
            strategy: config.strategy,
        })
    }

    /// Same detector with a different scan strategy.
    pub fn with_strategy(mut self, strategy: DetectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn threshold_count(&self) -> usize {
        self.threshold_count
    }

    pub fn strategy(&self) -> DetectionStrategy {
        self.strategy
    }

    /// Detects dropout intervals in parallel timestamp/value arrays.
    ///
    /// Empty input yields no intervals. A non-empty series shorter than the
    /// window, mismatched lengths, non-finite data and decreasing timestamps
    /// are rejected with [`LosError::InvalidInput`].
    pub fn detect(&self, timestamps: &[f64], values: &[f64]) -> LosResult<Vec<Interval>> {
        validate_series(timestamps, values, self.window_size)?;
        if timestamps.is_empty() {
            return Ok(Vec::new());
        }

        let mut tracker = DropoutTracker::new(timestamps);
        match self.strategy {
            DetectionStrategy::Windowed => self.scan_windowed(values, &mut tracker),
            DetectionStrategy::Incremental => self.scan_incremental(values, &mut tracker),
        }
        let intervals = tracker.finish();

        log::debug!(
            "Detected {} dropout interval(s) in {} samples (window={}, threshold={}, {:?})",
            intervals.len(),
            timestamps.len(),
            self.window_size,
            self.threshold_count,
            self.strategy
        );
        Ok(intervals)
    }

    /// Detects dropout intervals in a series of samples sorted by timestamp.
    pub fn detect_samples(&self, samples: &[Sample]) -> LosResult<Vec<Interval>> {
        let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        self.detect(&timestamps, &values)
    }

    fn scan_windowed(&self, values: &[f64], tracker: &mut DropoutTracker<'_>) {
        for end in (self.window_size - 1)..values.len() {
            let start = end + 1 - self.window_size;
            let missing = values[start..=end].iter().filter(|v| is_missing(**v)).count();
            tracker.observe(end, start, missing >= self.threshold_count);
        }
    }

    fn scan_incremental(&self, values: &[f64], tracker: &mut DropoutTracker<'_>) {
        let w = self.window_size;
        let mut missing = values[..w].iter().filter(|v| is_missing(**v)).count();
        tracker.observe(w - 1, 0, missing >= self.threshold_count);

        for end in w..values.len() {
            if is_missing(values[end]) {
                missing += 1;
            }
            if is_missing(values[end - w]) {
                missing -= 1;
            }
            tracker.observe(end, end + 1 - w, missing >= self.threshold_count);
        }
    }
}

fn is_missing(value: f64) -> bool {
    value == MISSING_SENTINEL
}

fn validate_series(timestamps: &[f64], values: &[f64], window_size: usize) -> LosResult<()> {
    if timestamps.len() != values.len() {
        return Err(LosError::InvalidInput(format!(
            "{} timestamps but {} values",
            timestamps.len(),
            values.len()
        )));
    }
    if timestamps.is_empty() {
        return Ok(());
    }
    if timestamps.len() < window_size {
        return Err(LosError::InvalidInput(format!(
            "series of {} samples is shorter than the window of {}",
            timestamps.len(),
            window_size
        )));
    }
    if let Some(i) = timestamps.iter().position(|t| !t.is_finite()) {
        return Err(LosError::InvalidInput(format!(
            "timestamp at index {} is not finite",
            i
        )));
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(LosError::InvalidInput(format!(
            "value at index {} is not finite",
            i
        )));
    }
    if let Some(i) = timestamps.windows(2).position(|w| w[1] < w[0]) {
        return Err(LosError::InvalidInput(format!(
            "timestamps decrease at index {} ({} -> {})",
            i + 1,
            timestamps[i],
            timestamps[i + 1]
        )));
    }
    Ok(())
}

/// Open/close bookkeeping shared by both scan strategies.
struct DropoutTracker<'a> {
    timestamps: &'a [f64],
    open_start: Option<f64>,
    intervals: Vec<Interval>,
}

impl<'a> DropoutTracker<'a> {
    fn new(timestamps: &'a [f64]) -> Self {
        Self {
            timestamps,
            open_start: None,
            intervals: Vec::new(),
        }
    }

    /// Feeds the verdict for the window `[window_start, end]`.
    fn observe(&mut self, end: usize, window_start: usize, in_dropout: bool) {
        if in_dropout {
            if self.open_start.is_none() {
                self.open_start = Some(self.timestamps[window_start]);
            }
        } else if let Some(start) = self.open_start.take() {
            // An open dropout implies an earlier window, so end >= 1.
            let stop = self.timestamps[end - 1];
            self.intervals.push(Interval::from_ordered(start, stop));
        }
    }

    fn finish(mut self) -> Vec<Interval> {
        if let (Some(start), Some(&last)) = (self.open_start.take(), self.timestamps.last()) {
            self.intervals.push(Interval::from_ordered(start, last));
        }
        self.intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STRATEGIES: [DetectionStrategy; 2] =
        [DetectionStrategy::Windowed, DetectionStrategy::Incremental];

    fn detector(window_size: usize, threshold: usize, strategy: DetectionStrategy) -> DropoutDetector {
        DropoutDetector::new(&DetectorConfig {
            window_size,
            threshold: Threshold::Count(threshold),
            strategy,
        })
        .unwrap()
    }

    fn bounds(intervals: &[Interval]) -> Vec<(f64, f64)> {
        intervals.iter().map(|i| (i.start, i.end)).collect()
    }

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    /// Window-by-window for W=3, T=2:
    /// end=2 [0,0,1] 2 -> open at t[0]=0
    /// end=3 [0,1,1] 1 -> close at t[2]=2
    /// end=4 [1,1,0] 1
    /// end=5 [1,0,0] 2 -> open at t[3]=3
    /// end=6 [0,0,0] 3
    /// end=7 [0,0,1] 2 -> still open, closes at last t[7]=7
    #[test]
    fn test_reference_fixture_both_strategies() {
        let timestamps = ramp(8);
        let values = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        for strategy in STRATEGIES {
            let intervals = detector(3, 2, strategy).detect(&timestamps, &values).unwrap();
            assert_eq!(bounds(&intervals), vec![(0.0, 2.0), (3.0, 7.0)], "{:?}", strategy);
        }
    }

    #[test]
    fn test_start_frozen_at_window_left_edge() {
        // First triggering window is [2,4]; start stays at t[2] while the
        // window keeps sliding over missing samples.
        let timestamps = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0];
        let values = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0];
        for strategy in STRATEGIES {
            let intervals = detector(3, 2, strategy).detect(&timestamps, &values).unwrap();
            // end=4 [1,0,0] opens at t[2]=12; end=8 [0,1,1] closes at t[7]=17
            assert_eq!(bounds(&intervals), vec![(12.0, 17.0)]);
        }
    }

    #[test]
    fn test_no_dropout() {
        let timestamps = ramp(10);
        let values = vec![1.0; 10];
        for strategy in STRATEGIES {
            assert!(detector(4, 2, strategy).detect(&timestamps, &values).unwrap().is_empty());
        }
    }

    #[test]
    fn test_all_missing_spans_whole_series() {
        let timestamps = ramp(6);
        let values = vec![0.0; 6];
        for strategy in STRATEGIES {
            let intervals = detector(3, 3, strategy).detect(&timestamps, &values).unwrap();
            assert_eq!(bounds(&intervals), vec![(0.0, 5.0)]);
        }
    }

    #[test]
    fn test_zero_threshold_always_in_dropout() {
        let timestamps = ramp(5);
        let values = vec![1.0; 5];
        let intervals = detector(2, 0, DetectionStrategy::Incremental)
            .detect(&timestamps, &values)
            .unwrap();
        assert_eq!(bounds(&intervals), vec![(0.0, 4.0)]);
    }

    #[test]
    fn test_window_equal_to_series_length() {
        let timestamps = ramp(3);
        let values = [0.0, 0.0, 1.0];
        for strategy in STRATEGIES {
            let intervals = detector(3, 2, strategy).detect(&timestamps, &values).unwrap();
            assert_eq!(bounds(&intervals), vec![(0.0, 2.0)]);
        }
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let intervals = detector(3, 2, DetectionStrategy::Windowed).detect(&[], &[]).unwrap();
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_series_shorter_than_window_is_rejected() {
        let result = detector(5, 2, DetectionStrategy::Incremental).detect(&ramp(3), &[0.0; 3]);
        assert!(matches!(result, Err(LosError::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_series_is_rejected() {
        let d = detector(2, 1, DetectionStrategy::Incremental);
        assert!(d.detect(&ramp(3), &[0.0; 2]).is_err());
        assert!(d.detect(&[0.0, 2.0, 1.0], &[0.0; 3]).is_err());
        assert!(d.detect(&[0.0, f64::NAN, 1.0], &[0.0; 3]).is_err());
        assert!(d.detect(&ramp(3), &[0.0, f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_repeated_timestamps_are_accepted() {
        let timestamps = [0.0, 0.0, 1.0, 1.0];
        let values = [0.0, 0.0, 0.0, 1.0];
        let intervals = detector(2, 2, DetectionStrategy::Incremental)
            .detect(&timestamps, &values)
            .unwrap();
        // end=1 opens at t[0]; end=3 [0,1] closes at t[2]
        assert_eq!(bounds(&intervals), vec![(0.0, 1.0)]);
    }

    #[test]
    fn test_configuration_errors() {
        let zero_window = DetectorConfig {
            window_size: 0,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            DropoutDetector::new(&zero_window),
            Err(LosError::Configuration(_))
        ));

        let too_many = DetectorConfig {
            window_size: 3,
            threshold: Threshold::Count(4),
            ..DetectorConfig::default()
        };
        assert!(DropoutDetector::new(&too_many).is_err());

        let bad_pct = DetectorConfig {
            threshold: Threshold::Percent(120.0),
            ..DetectorConfig::default()
        };
        assert!(DropoutDetector::new(&bad_pct).is_err());
    }

    #[test]
    fn test_percent_threshold_rounds_up_exact_product() {
        assert_eq!(Threshold::Percent(70.0).resolve(10).unwrap(), 7);
        assert_eq!(Threshold::Percent(25.0).resolve(10).unwrap(), 3);
        assert_eq!(Threshold::Percent(33.4).resolve(3).unwrap(), 2);
    }

    #[test]
    fn test_default_thresholds_resolve() {
        assert_eq!(Threshold::Percent(90.0).resolve(60).unwrap(), 54);
        assert_eq!(Threshold::Percent(80.0).resolve(60).unwrap(), 48);
        assert_eq!(Threshold::Percent(0.0).resolve(60).unwrap(), 0);
        assert_eq!(Threshold::Percent(100.0).resolve(60).unwrap(), 60);
        let d = DropoutDetector::new(&DetectorConfig::default()).unwrap();
        assert_eq!(d.threshold_count(), 54);
    }

    #[test]
    fn test_detect_samples() {
        let samples: Vec<Sample> = [1.0, 0.0, 0.0, 0.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::new(100.0 + i as f64, *v).unwrap())
            .collect();
        let intervals = detector(2, 2, DetectionStrategy::Windowed)
            .detect_samples(&samples)
            .unwrap();
        assert_eq!(bounds(&intervals), vec![(101.0, 103.0)]);
    }

    proptest! {
        #[test]
        fn prop_strategies_agree(
            missing in prop::collection::vec(any::<bool>(), 1..200),
            window in 1usize..12,
            threshold_frac in 0.0f64..=1.0,
        ) {
            prop_assume!(missing.len() >= window);
            let threshold = (threshold_frac * window as f64).round() as usize;
            let timestamps: Vec<f64> = (0..missing.len()).map(|i| i as f64 * 0.1).collect();
            let values: Vec<f64> = missing.iter().map(|m| if *m { 0.0 } else { 1.0 }).collect();

            let windowed = detector(window, threshold, DetectionStrategy::Windowed)
                .detect(&timestamps, &values)
                .unwrap();
            let incremental = detector(window, threshold, DetectionStrategy::Incremental)
                .detect(&timestamps, &values)
                .unwrap();
            prop_assert_eq!(windowed, incremental);
        }

        #[test]
        fn prop_intervals_are_ordered_and_inside_series(
            missing in prop::collection::vec(any::<bool>(), 5..120),
            window in 1usize..5,
        ) {
            let timestamps: Vec<f64> = (0..missing.len()).map(|i| i as f64).collect();
            let values: Vec<f64> = missing.iter().map(|m| if *m { 0.0 } else { 1.0 }).collect();
            let intervals = detector(window, window, DetectionStrategy::Incremental)
                .detect(&timestamps, &values)
                .unwrap();
            let last = *timestamps.last().unwrap();
            for pair in intervals.windows(2) {
                prop_assert!(pair[0].end < pair[1].start);
            }
            for interval in &intervals {
                prop_assert!(interval.start <= interval.end);
                prop_assert!(interval.start >= 0.0 && interval.end <= last);
            }
        }
    }
}
