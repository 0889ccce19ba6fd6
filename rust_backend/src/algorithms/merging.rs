//! Canonicalization of dropout interval lists.
//!
//! Raw detector output (possibly from several recordings, overlapping and
//! out of order) is turned into a canonical list: sorted, pairwise
//! non-overlapping, and with every interval at least `min_duration` long.
//!
//! Steps:
//! 1. optionally clip every interval to the timeframes of interest;
//!    pieces shorter than `min_duration` are discarded;
//! 2. sort by start;
//! 3. sweep, folding an interval into its predecessor when
//!    `start <= previous.end + tolerance`. Exactly touching intervals
//!    (`start == previous.end`) therefore merge even at zero tolerance;
//! 4. with timeframes, clip the merged intervals again. Tolerance never
//!    bridges the space between two timeframes.

use crate::core::domain::Interval;
use crate::core::error::{LosError, LosResult};
use crate::time::TimeframeSet;

/// Merger settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Shortest interval kept, in seconds. Must be positive.
    pub min_duration: f64,
    /// Largest gap bridged between consecutive intervals, in seconds.
    pub tolerance: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            min_duration: 2.0,
            tolerance: 0.0,
        }
    }
}

/// Produces canonical interval lists.
///
/// # Examples
///
/// ```
/// use los_rust::algorithms::merging::{MergeConfig, SegmentMerger};
/// use los_rust::core::domain::Interval;
///
/// let merger = SegmentMerger::new(&MergeConfig { min_duration: 2.0, tolerance: 0.0 }).unwrap();
/// let merged = merger.merge(
///     &[Interval::new(10.0, 20.0).unwrap(), Interval::new(0.0, 10.0).unwrap()],
///     None,
/// );
/// assert_eq!(merged, vec![Interval::new(0.0, 20.0).unwrap()]);
/// ```
#[derive(Debug, Clone)]
pub struct SegmentMerger {
    min_duration: f64,
    tolerance: f64,
}

impl SegmentMerger {
    /// Creates a merger, rejecting a non-positive minimum duration or a negative tolerance.
    pub fn new(config: &MergeConfig) -> LosResult<Self> {
        if !config.min_duration.is_finite() || config.min_duration <= 0.0 {
            return Err(LosError::Configuration(format!(
                "minimum duration must be positive, got {}",
                config.min_duration
            )));
        }
        if !config.tolerance.is_finite() || config.tolerance < 0.0 {
            return Err(LosError::Configuration(format!(
                "merge tolerance must be non-negative, got {}",
                config.tolerance
            )));
        }
        Ok(Self {
            min_duration: config.min_duration,
            tolerance: config.tolerance,
        })
    }

    pub fn min_duration(&self) -> f64 {
        self.min_duration
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Canonicalizes `intervals`, clipping to `timeframes` when given.
    pub fn merge(&self, intervals: &[Interval], timeframes: Option<&TimeframeSet>) -> Vec<Interval> {
        let mut pieces: Vec<Interval> = match timeframes {
            Some(frames) => intervals
                .iter()
                .flat_map(|interval| frames.clip(interval))
                .filter(|piece| self.long_enough(piece))
                .collect(),
            None => intervals.to_vec(),
        };

        pieces.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

        let mut merged: Vec<Interval> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match merged.last_mut() {
                Some(last) if piece.start <= last.end + self.tolerance => {
                    if piece.end > last.end {
                        last.end = piece.end;
                    }
                }
                _ => merged.push(piece),
            }
        }

        if let Some(frames) = timeframes {
            merged = merged
                .iter()
                .flat_map(|interval| frames.clip(interval))
                .collect();
        }

        let before = merged.len();
        merged.retain(|interval| self.long_enough(interval));
        if merged.len() < before {
            log::debug!(
                "Dropped {} interval(s) shorter than {}s",
                before - merged.len(),
                self.min_duration
            );
        }
        merged
    }

    /// Union of several interval lists (e.g. one per recording), canonicalized.
    pub fn union<L: AsRef<[Interval]>>(
        &self,
        lists: &[L],
        timeframes: Option<&TimeframeSet>,
    ) -> Vec<Interval> {
        let all: Vec<Interval> = lists
            .iter()
            .flat_map(|list| list.as_ref().iter().copied())
            .collect();
        self.merge(&all, timeframes)
    }

    /// Returns `true` if `intervals` is already a canonical list for this merger.
    ///
    /// With timeframes, every interval lies inside them and a gap no wider than
    /// the tolerance is allowed only where it leaves the timeframes.
    pub fn is_canonical(&self, intervals: &[Interval], timeframes: Option<&TimeframeSet>) -> bool {
        let inside = |i: &Interval| match timeframes {
            Some(frames) => frames.clip(i) == [*i],
            None => true,
        };
        let separated = |prev: &Interval, next: &Interval| {
            if next.start <= prev.end {
                return false;
            }
            if next.start > prev.end + self.tolerance {
                return true;
            }
            let gap = Interval::from_ordered(prev.end, next.start);
            timeframes.is_some_and(|frames| frames.clip(&gap) != [gap])
        };

        intervals.iter().all(|i| self.long_enough(i) && inside(i))
            && intervals.windows(2).all(|pair| separated(&pair[0], &pair[1]))
    }

    fn long_enough(&self, interval: &Interval) -> bool {
        interval.end > interval.start && interval.duration() >= self.min_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn iv(start: f64, end: f64) -> Interval {
        Interval::new(start, end).unwrap()
    }

    fn merger(min_duration: f64, tolerance: f64) -> SegmentMerger {
        SegmentMerger::new(&MergeConfig {
            min_duration,
            tolerance,
        })
        .unwrap()
    }

    #[test]
    fn test_touching_intervals_merge() {
        let merged = merger(1.0, 0.0).merge(&[iv(0.0, 10.0), iv(10.0, 20.0)], None);
        assert_eq!(merged, vec![iv(0.0, 20.0)]);
    }

    #[test]
    fn test_near_touching_intervals_stay_apart_at_zero_tolerance() {
        let merged = merger(1.0, 0.0).merge(&[iv(0.0, 10.0), iv(10.001, 20.0)], None);
        assert_eq!(merged, vec![iv(0.0, 10.0), iv(10.001, 20.0)]);
    }

    #[test]
    fn test_tolerance_bridges_small_gaps() {
        let merged = merger(1.0, 2.0).merge(&[iv(0.0, 10.0), iv(12.0, 20.0), iv(23.0, 30.0)], None);
        assert_eq!(merged, vec![iv(0.0, 20.0), iv(23.0, 30.0)]);
    }

    #[test]
    fn test_unsorted_and_nested_input() {
        let merged = merger(1.0, 0.0).merge(
            &[iv(50.0, 60.0), iv(0.0, 30.0), iv(5.0, 10.0), iv(25.0, 40.0)],
            None,
        );
        assert_eq!(merged, vec![iv(0.0, 40.0), iv(50.0, 60.0)]);
    }

    #[test]
    fn test_short_intervals_are_dropped() {
        let merged = merger(2.0, 0.0).merge(&[iv(0.0, 1.5), iv(10.0, 12.0), iv(20.0, 20.0)], None);
        assert_eq!(merged, vec![iv(10.0, 12.0)]);
    }

    #[test]
    fn test_short_pieces_combine_before_length_check_without_timeframes() {
        let merged = merger(2.0, 0.0).merge(&[iv(0.0, 1.5), iv(1.5, 3.0)], None);
        assert_eq!(merged, vec![iv(0.0, 3.0)]);
    }

    #[test]
    fn test_timeframe_clipping() {
        let frames = TimeframeSet::new(vec![iv(0.0, 100.0), iv(200.0, 300.0)]);
        let merged = merger(2.0, 0.0).merge(
            &[iv(90.0, 210.0), iv(99.0, 150.0), iv(400.0, 500.0), iv(299.0, 305.0)],
            Some(&frames),
        );
        // [299, 300] is 1s long after clipping and is discarded
        assert_eq!(merged, vec![iv(90.0, 100.0), iv(200.0, 210.0)]);
    }

    #[test]
    fn test_tolerance_does_not_bridge_timeframe_gaps() {
        let frames = TimeframeSet::new(vec![iv(0.0, 10.0), iv(11.0, 20.0)]);
        let m = merger(1.0, 2.0);

        let merged = m.merge(&[iv(5.0, 10.0), iv(11.0, 15.0)], Some(&frames));
        assert_eq!(merged, vec![iv(5.0, 10.0), iv(11.0, 15.0)]);
        assert_eq!(m.merge(&[iv(5.0, 15.0)], Some(&frames)), merged);
        assert!(merged.iter().all(|i| frames.clip(i) == [*i]));

        assert!(m.is_canonical(&merged, Some(&frames)));
        assert!(!m.is_canonical(&merged, None));
        assert!(!m.is_canonical(&[iv(5.0, 15.0)], Some(&frames)));
    }

    #[test]
    fn test_cross_file_union() {
        let file_a = vec![iv(0.0, 10.0), iv(40.0, 50.0)];
        let file_b = vec![iv(8.0, 20.0)];
        let merged = merger(1.0, 0.0).union(&[file_a, file_b], None);
        assert_eq!(merged, vec![iv(0.0, 20.0), iv(40.0, 50.0)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(merger(1.0, 0.0).merge(&[], None).is_empty());
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(SegmentMerger::new(&MergeConfig {
            min_duration: 0.0,
            tolerance: 0.0
        })
        .is_err());
        assert!(SegmentMerger::new(&MergeConfig {
            min_duration: 1.0,
            tolerance: -1.0
        })
        .is_err());
    }

    fn arb_intervals() -> impl Strategy<Value = Vec<Interval>> {
        prop::collection::vec((0.0f64..1000.0, 0.0f64..50.0), 0..40).prop_map(|raw| {
            raw.into_iter()
                .map(|(start, len)| Interval::new(start, start + len).unwrap())
                .collect()
        })
    }

    fn arb_timeframes() -> impl Strategy<Value = TimeframeSet> {
        prop::collection::vec((0.0f64..1000.0, 1.0f64..200.0), 1..6).prop_map(|raw| {
            TimeframeSet::new(
                raw.into_iter()
                    .map(|(start, len)| Interval::new(start, start + len).unwrap())
                    .collect(),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent(
            intervals in arb_intervals(),
            tolerance in 0.0f64..5.0,
        ) {
            let m = merger(2.0, tolerance);
            let once = m.merge(&intervals, None);
            let twice = m.merge(&once, None);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_merge_with_timeframes_is_idempotent(
            intervals in arb_intervals(),
            frames in arb_timeframes(),
            tolerance in 0.0f64..5.0,
        ) {
            let m = merger(2.0, tolerance);
            let once = m.merge(&intervals, Some(&frames));
            let twice = m.merge(&once, Some(&frames));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_output_is_canonical(
            intervals in arb_intervals(),
            frames in arb_timeframes(),
            tolerance in 0.0f64..5.0,
        ) {
            let m = merger(2.0, tolerance);
            prop_assert!(m.is_canonical(&m.merge(&intervals, None), None));
            prop_assert!(m.is_canonical(&m.merge(&intervals, Some(&frames)), Some(&frames)));
        }

        #[test]
        fn prop_every_kept_piece_is_covered_once(
            intervals in arb_intervals(),
            frames in arb_timeframes(),
        ) {
            let m = merger(2.0, 0.0);
            let merged = m.merge(&intervals, Some(&frames));
            for interval in &intervals {
                for piece in frames.clip(interval) {
                    if piece.duration() < 2.0 {
                        continue;
                    }
                    let covering = merged
                        .iter()
                        .filter(|o| o.start <= piece.start && piece.end <= o.end)
                        .count();
                    prop_assert_eq!(covering, 1);
                }
            }
        }
    }
}
