//! Mapping of dropout intervals onto media files.
//!
//! For every canonical dropout interval that overlaps a media file the
//! correlator clamps the dropout to the file, pads that core, and produces a
//! [`CutPlan`]: the padded absolute window to render and the file-local
//! `(offset, duration)` spans that reconstruct it. When the padded window runs
//! past either end of the file, at most one same-channel neighbour per side is
//! stitched in.
//!
//! Any gap between the file and a neighbour it needs is reported as a
//! [`PlanNote::RecordingGap`]. Gaps up to `contiguity_tolerance` are still
//! stitched (`stitched: true`); larger ones truncate the padding on that side.

use crate::algorithms::track_index::{Direction, TrackIndex};
use crate::core::domain::{CutPlan, FileSpan, Interval, PlanNote, SegmentId, Side, TrackFile};
use crate::core::error::{LosError, LosResult};

/// Correlator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationConfig {
    /// Seconds added before and after each dropout interval.
    pub padding: f64,
    /// Largest gap, in seconds, between adjacent files still treated as contiguous.
    pub contiguity_tolerance: f64,
    /// Shortest window worth rendering, in seconds.
    pub min_duration: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            padding: 1.5,
            contiguity_tolerance: 0.5,
            min_duration: 2.0,
        }
    }
}

/// Produces cut plans for one media file at a time.
///
/// # Examples
///
/// ```
/// use los_rust::algorithms::correlation::{CorrelationConfig, TimelineCorrelator};
/// use los_rust::algorithms::track_index::TrackIndex;
/// use los_rust::core::domain::{Interval, TrackFile};
///
/// let file = TrackFile::new("a.mp4", "room5", 100.0, 100.0).unwrap();
/// let next = TrackFile::new("b.mp4", "room5", 200.0, 100.0).unwrap();
/// let index = TrackIndex::build(vec![file.clone(), next]);
///
/// let correlator = TimelineCorrelator::new(&CorrelationConfig {
///     padding: 2.0,
///     ..CorrelationConfig::default()
/// })
/// .unwrap();
/// let plans = correlator.correlate(&[Interval::new(190.0, 205.0).unwrap()], &file, &index);
///
/// assert_eq!(plans.len(), 1);
/// assert_eq!(plans[0].file_ids(), vec!["a.mp4", "b.mp4"]);
/// assert_eq!(plans[0].total_duration(), 14.0);
/// ```
#[derive(Debug, Clone)]
pub struct TimelineCorrelator {
    config: CorrelationConfig,
}

/// One side of a window after neighbour resolution.
struct Edge {
    bound: f64,
    neighbour: Option<FileSpan>,
    notes: Vec<PlanNote>,
}

impl TimelineCorrelator {
    pub fn new(config: &CorrelationConfig) -> LosResult<Self> {
        if !config.padding.is_finite() || config.padding < 0.0 {
            return Err(LosError::Configuration(format!(
                "padding must be non-negative, got {}",
                config.padding
            )));
        }
        if !config.contiguity_tolerance.is_finite() || config.contiguity_tolerance < 0.0 {
            return Err(LosError::Configuration(format!(
                "contiguity tolerance must be non-negative, got {}",
                config.contiguity_tolerance
            )));
        }
        if !config.min_duration.is_finite() || config.min_duration <= 0.0 {
            return Err(LosError::Configuration(format!(
                "minimum duration must be positive, got {}",
                config.min_duration
            )));
        }
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Builds the cut plans of `file` for every segment overlapping it.
    ///
    /// `segments` is a canonical dropout list; a plan's [`SegmentId`] is the
    /// segment's position in it. Segments that do not overlap the file yield
    /// nothing.
    pub fn correlate(
        &self,
        segments: &[Interval],
        file: &TrackFile,
        index: &TrackIndex,
    ) -> Vec<CutPlan> {
        let span = file.span();
        segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.overlaps(&span))
            .filter_map(|(i, segment)| self.plan_segment(SegmentId(i), segment, file, index))
            .collect()
    }

    fn plan_segment(
        &self,
        segment_id: SegmentId,
        segment: &Interval,
        file: &TrackFile,
        index: &TrackIndex,
    ) -> Option<CutPlan> {
        // Padding grows the part of the dropout this file recorded, never the
        // part a neighbour recorded.
        let core = segment.intersection(&file.span())?;
        let padded = core.padded(self.config.padding);

        let before = self.resolve_before(padded.start, file, index);
        let after = self.resolve_after(padded.end, file, index);

        let own_start = before.bound.max(file.start);
        let own_end = after.bound.min(file.end);
        let own = FileSpan {
            file_id: file.file_id.clone(),
            local_start: own_start - file.start,
            duration: own_end - own_start,
        };

        let spans: Vec<FileSpan> = before
            .neighbour
            .into_iter()
            .chain(std::iter::once(own))
            .chain(after.neighbour)
            .filter(|s| s.duration > 0.0)
            .collect();

        let absolute_window = Interval::from_ordered(before.bound, after.bound.max(before.bound));
        let plan = CutPlan {
            segment_id,
            spans,
            absolute_window,
            core_issue_window: *segment,
            notes: before.notes.into_iter().chain(after.notes).collect(),
        };

        if plan.spans.is_empty()
            || absolute_window.duration() < self.config.min_duration
            || plan.total_duration() < self.config.min_duration
        {
            log::debug!(
                "Discarding segment {} on {}: window {:.3}s below {}s",
                segment_id.0,
                file.file_id,
                plan.total_duration(),
                self.config.min_duration
            );
            return None;
        }

        for note in &plan.notes {
            match note {
                PlanNote::RecordingGap {
                    side,
                    neighbour,
                    gap_seconds,
                    stitched: true,
                } => log::warn!(
                    "Recording gap of {:.3}s between {} and {} ({:?}); stitched, spans are {:.3}s short of the window",
                    gap_seconds,
                    file.file_id,
                    neighbour,
                    side,
                    gap_seconds
                ),
                PlanNote::RecordingGap {
                    side,
                    neighbour,
                    gap_seconds,
                    stitched: false,
                } => log::warn!(
                    "Recording gap of {:.3}s between {} and {} ({:?}); padding truncated",
                    gap_seconds,
                    file.file_id,
                    neighbour,
                    side
                ),
                PlanNote::PaddingTruncated {
                    side,
                    missing_seconds,
                } => log::debug!(
                    "Segment {} on {}: {:.3}s of padding unavailable ({:?})",
                    segment_id.0,
                    file.file_id,
                    missing_seconds,
                    side
                ),
            }
        }

        log::debug!(
            "Segment {} on {}: {} span(s) covering [{:.3}, {:.3}]",
            segment_id.0,
            file.file_id,
            plan.spans.len(),
            absolute_window.start,
            absolute_window.end
        );
        Some(plan)
    }

    fn resolve_before(&self, wanted: f64, file: &TrackFile, index: &TrackIndex) -> Edge {
        if wanted >= file.start {
            return Edge::within(wanted);
        }

        let Some(prev) = index.adjacent(file, Direction::Previous) else {
            return Edge::truncated(file.start, Side::Before, file.start - wanted);
        };

        let gap = file.start - prev.end;
        if gap > self.config.contiguity_tolerance {
            return Edge::gap(file.start, Side::Before, prev, gap, false);
        }

        // An overlapping neighbour only contributes up to this file's start.
        let stop = prev.end.min(file.start);
        if wanted >= stop {
            // The padding ends inside the gap; nothing to take from `prev`.
            return Edge::gap(file.start, Side::Before, prev, gap, false);
        }

        let bound = wanted.max(prev.start);
        let neighbour = FileSpan {
            file_id: prev.file_id.clone(),
            local_start: bound - prev.start,
            duration: stop - bound,
        };

        let mut notes = Vec::new();
        if gap > 0.0 {
            notes.push(gap_note(Side::Before, prev, gap, true));
        }
        if wanted < prev.start {
            notes.push(PlanNote::PaddingTruncated {
                side: Side::Before,
                missing_seconds: prev.start - wanted,
            });
        }

        Edge {
            bound,
            neighbour: Some(neighbour),
            notes,
        }
    }

    fn resolve_after(&self, wanted: f64, file: &TrackFile, index: &TrackIndex) -> Edge {
        if wanted <= file.end {
            return Edge::within(wanted);
        }

        let Some(next) = index.adjacent(file, Direction::Next) else {
            return Edge::truncated(file.end, Side::After, wanted - file.end);
        };

        let gap = next.start - file.end;
        if gap > self.config.contiguity_tolerance {
            return Edge::gap(file.end, Side::After, next, gap, false);
        }

        // An overlapping neighbour only contributes from this file's end on.
        let from = next.start.max(file.end);
        if wanted <= from {
            return Edge::gap(file.end, Side::After, next, gap, false);
        }

        let bound = wanted.min(next.end);
        let neighbour = FileSpan {
            file_id: next.file_id.clone(),
            local_start: from - next.start,
            duration: bound - from,
        };

        let mut notes = Vec::new();
        if gap > 0.0 {
            notes.push(gap_note(Side::After, next, gap, true));
        }
        if wanted > next.end {
            notes.push(PlanNote::PaddingTruncated {
                side: Side::After,
                missing_seconds: wanted - next.end,
            });
        }

        Edge {
            bound,
            neighbour: Some(neighbour),
            notes,
        }
    }
}

impl Edge {
    fn within(bound: f64) -> Self {
        Self {
            bound,
            neighbour: None,
            notes: Vec::new(),
        }
    }

    fn truncated(bound: f64, side: Side, missing_seconds: f64) -> Self {
        Self {
            bound,
            neighbour: None,
            notes: vec![PlanNote::PaddingTruncated {
                side,
                missing_seconds,
            }],
        }
    }

    fn gap(bound: f64, side: Side, neighbour: &TrackFile, gap_seconds: f64, stitched: bool) -> Self {
        Self {
            bound,
            neighbour: None,
            notes: vec![gap_note(side, neighbour, gap_seconds, stitched)],
        }
    }
}

fn gap_note(side: Side, neighbour: &TrackFile, gap_seconds: f64, stitched: bool) -> PlanNote {
    PlanNote::RecordingGap {
        side,
        neighbour: neighbour.file_id.clone(),
        gap_seconds,
        stitched,
    }
}
