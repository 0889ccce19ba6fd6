//! End-to-end checks of the detect → merge → correlate chain on in-memory data.

use std::collections::BTreeMap;

use los_rust::algorithms::{
    CorrelationConfig, DetectionStrategy, DetectorConfig, DropoutDetector, MergeConfig,
    SegmentMerger, Threshold, TimelineCorrelator, TrackIndex,
};
use los_rust::config::AnalysisConfig;
use los_rust::core::domain::{Interval, Sample, TrackFile};
use los_rust::services::DropoutPipeline;
use los_rust::time::TimeframeSet;

fn iv(start: f64, end: f64) -> Interval {
    Interval::new(start, end).unwrap()
}

#[test]
fn test_window_left_edge_fixture_for_both_strategies() {
    let timestamps = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
    let values = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    for strategy in [DetectionStrategy::Windowed, DetectionStrategy::Incremental] {
        let detector = DropoutDetector::new(&DetectorConfig {
            window_size: 3,
            threshold: Threshold::Count(2),
            strategy,
        })
        .unwrap();
        assert_eq!(
            detector.detect(&timestamps, &values).unwrap(),
            vec![iv(0.0, 2.0), iv(3.0, 7.0)],
            "{:?}",
            strategy
        );
    }
}

#[test]
fn test_merge_adjacency_rule() {
    let merger = SegmentMerger::new(&MergeConfig {
        min_duration: 2.0,
        tolerance: 0.0,
    })
    .unwrap();

    assert_eq!(
        merger.merge(&[iv(0.0, 10.0), iv(10.0, 20.0)], None),
        vec![iv(0.0, 20.0)]
    );
    assert_eq!(
        merger.merge(&[iv(0.0, 10.0), iv(10.001, 20.0)], None),
        vec![iv(0.0, 10.0), iv(10.001, 20.0)]
    );

    let canonical = merger.merge(&[iv(5.0, 9.0), iv(0.0, 6.0), iv(30.0, 31.0)], None);
    assert_eq!(merger.merge(&canonical, None), canonical);
}

#[test]
fn test_correlator_reconstructs_padded_window_across_files() {
    let first = TrackFile::new("file1", "cam", 100.0, 100.0).unwrap();
    let second = TrackFile::new("file2", "cam", 200.0, 100.0).unwrap();
    let index = TrackIndex::build(vec![second, first.clone()]);

    let correlator = TimelineCorrelator::new(&CorrelationConfig {
        padding: 2.0,
        contiguity_tolerance: 0.5,
        min_duration: 2.0,
    })
    .unwrap();

    let plans = correlator.correlate(&[iv(190.0, 205.0)], &first, &index);
    assert_eq!(plans.len(), 1);
    let plan = &plans[0];

    assert_eq!(plan.absolute_window, iv(188.0, 202.0));
    assert_eq!(plan.spans.len(), 2);
    assert_eq!(
        (plan.spans[0].file_id.as_str(), plan.spans[0].local_start, plan.spans[0].duration),
        ("file1", 88.0, 12.0)
    );
    assert_eq!(
        (plan.spans[1].file_id.as_str(), plan.spans[1].local_start, plan.spans[1].duration),
        ("file2", 0.0, 2.0)
    );
    assert_eq!(plan.total_duration(), plan.absolute_window.duration());
    assert_eq!(plan.issue_offset_in_window(), Some(iv(2.0, 14.0)));
}

#[test]
fn test_dropout_without_media_yields_no_plans() {
    let file = TrackFile::new("file1", "cam", 100.0, 100.0).unwrap();
    let index = TrackIndex::build(vec![file.clone()]);
    let correlator = TimelineCorrelator::new(&CorrelationConfig::default()).unwrap();

    assert!(correlator
        .correlate(&[iv(500.0, 600.0)], &file, &index)
        .is_empty());
}

#[test]
fn test_timeframes_limit_detected_dropouts() {
    let merger = SegmentMerger::new(&MergeConfig::default()).unwrap();
    let frames = TimeframeSet::new(vec![iv(0.0, 50.0), iv(100.0, 150.0)]);

    let merged = merger.merge(&[iv(40.0, 120.0), iv(149.0, 170.0)], Some(&frames));
    assert_eq!(merged, vec![iv(40.0, 50.0), iv(100.0, 120.0)]);
}

#[test]
fn test_pipeline_from_configuration() {
    let config = AnalysisConfig::from_toml_str(
        r#"
        [detection]
        window_size = 4
        threshold_percentage = 50.0

        [merge]
        min_duration = 2.0
        tolerance = 1.0

        [correlation]
        padding = 1.5
        source_channels = ["telescopeMarkerTransform"]
        "#,
    )
    .unwrap();
    let pipeline = DropoutPipeline::new(&config).unwrap();

    // missing runs at t=10..14 and t=17..21, one sample per second
    let samples: Vec<Sample> = (0..40)
        .map(|i| {
            let missing = (10..15).contains(&i) || (17..22).contains(&i);
            Sample::new(f64::from(i), if missing { 0.0 } else { 0.7 }).unwrap()
        })
        .collect();
    let mut channels = BTreeMap::new();
    channels.insert("telescopeMarkerTransform".to_string(), samples);

    let files = vec![
        TrackFile::new("a.mp4", "room5", 0.0, 16.0).unwrap(),
        TrackFile::new("b.mp4", "room5", 16.0, 30.0).unwrap(),
    ];
    let output = pipeline.run(&channels, files).unwrap();

    assert!(output.channel_failures.is_empty());
    assert_eq!(output.segments.len(), 1);
    let segment = output.segments[0];
    assert!(segment.start <= 10.0 && segment.end >= 20.0);

    // one plan per file, each padded across the boundary at t=16
    assert_eq!(output.plans.len(), 2);
    for plan in &output.plans {
        assert!(plan.total_duration() >= 2.0);
        assert_eq!(plan.segment_id.0, 0);
        assert_eq!(plan.file_ids(), vec!["a.mp4", "b.mp4"]);
    }
    assert_eq!(output.plans[0].absolute_window.end, 17.5);
    assert_eq!(output.plans[1].absolute_window.start, 14.5);
}
