//! Full asynchronous runs over on-disk collaborator data.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use los_rust::config::AnalysisConfig;
use los_rust::io::loaders::{CsvSampleSource, JsonLinesSink, ManifestMetadataSource, MemorySink};
use los_rust::parsing::annotations::parse_annotations_file;
use los_rust::parsing::tracking_csv::TrackingColumns;
use los_rust::services::{AnalysisRunner, DropoutPipeline, RenderJob};
use tempfile::tempdir;

// 2021-09-28T10:00:00Z
const T0: f64 = 1632823200.0;

const CONFIG: &str = r#"
[detection]
window_size = 3
threshold_count = 2

[correlation]
padding = 2.0
source_channels = ["telescopeMarkerTransform"]

[timeframes]
utc_offset = "+00:00"

[timeframes.dates]
"2021-09-28" = ["10:00:00 - 10:10:00"]
"#;

fn write_tracking_export(dir: &Path) {
    let mut csv = String::from("Time,header.seq,header.frame_id,pose.position.x\n");
    for i in 0..30 {
        let t = T0 + f64::from(i);
        let telescope = if (10..20).contains(&i) { 0.0 } else { 0.42 };
        writeln!(csv, "{:.3},{},telescopeMarkerTransform,{}", t, i, telescope).unwrap();
        writeln!(csv, "{:.3},{},phantomMarkerTransform,0.9", t + 0.5, i).unwrap();
    }
    fs::write(dir.join("bag_1.csv"), csv).unwrap();
    fs::write(
        dir.join("broken.csv"),
        "Time,header.seq,header.frame_id,pose.position.x\nsoon,0,telescopeMarkerTransform,1\n",
    )
    .unwrap();
}

fn write_manifest(path: &Path) {
    let manifest = format!(
        r#"{{"files": [
            {{"path": "room5/cam_a.mp4", "creation_time": "2021-09-28T09:58:20Z", "duration": 115.0}},
            {{"path": "room5/cam_b.mp4", "start": {}, "duration": 100.0}},
            {{"path": "room5/cam_c.mp4", "start": {}}}
        ]}}"#,
        T0 + 15.0,
        T0 + 115.0
    );
    fs::write(path, manifest).unwrap();
}

fn pipeline() -> DropoutPipeline {
    DropoutPipeline::new(&AnalysisConfig::from_toml_str(CONFIG).unwrap()).unwrap()
}

#[tokio::test]
async fn test_run_writes_stitched_cut() {
    let dir = tempdir().unwrap();
    let samples_dir = dir.path().join("tracking");
    fs::create_dir(&samples_dir).unwrap();
    write_tracking_export(&samples_dir);
    let manifest = dir.path().join("media.json");
    write_manifest(&manifest);
    let output = dir.path().join("cuts.jsonl");

    let runner = AnalysisRunner::new(
        pipeline(),
        Arc::new(CsvSampleSource::new(&samples_dir, TrackingColumns::default())),
        Arc::new(ManifestMetadataSource::from_file(&manifest).unwrap()),
        Arc::new(JsonLinesSink::create(&output).unwrap()),
    );
    let report = runner.run().await.unwrap();

    assert_eq!(report.recordings_loaded, 1);
    assert_eq!(report.recording_failures.len(), 1);
    assert_eq!(report.recording_failures[0].subject, "broken.csv");
    assert_eq!(report.media_files, 2);
    assert_eq!(report.media_failures[0].subject, "cam_c.mp4");

    // telescope missing at T0+10..T0+19 gives [T0+9, T0+20]
    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.segments[0].start, T0 + 9.0);
    assert_eq!(report.segments[0].end, T0 + 20.0);

    let telescope = report
        .summaries
        .iter()
        .find(|s| s.channel == "telescopeMarkerTransform")
        .unwrap();
    assert_eq!((telescope.total_points, telescope.missing_points), (30, 10));

    let content = fs::read_to_string(&output).unwrap();
    let jobs: Vec<RenderJob> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(jobs.len(), 2);

    // cam_a recorded T0+9..T0+15, cam_b the rest
    let first = &jobs[0].plan;
    assert_eq!(first.file_ids(), vec!["cam_a.mp4", "cam_b.mp4"]);
    assert_eq!((first.spans[0].local_start, first.spans[0].duration), (107.0, 8.0));
    assert_eq!((first.spans[1].local_start, first.spans[1].duration), (0.0, 2.0));
    assert!(first.notes.is_empty());

    let second = &jobs[1].plan;
    assert_eq!(second.file_ids(), vec!["cam_a.mp4", "cam_b.mp4"]);
    assert_eq!((second.spans[0].local_start, second.spans[0].duration), (113.0, 2.0));
    assert_eq!((second.spans[1].local_start, second.spans[1].duration), (0.0, 7.0));
    assert_eq!(first.segment_id, second.segment_id);
}

#[tokio::test]
async fn test_run_annotates_jobs() {
    let dir = tempdir().unwrap();
    write_tracking_export(dir.path());
    let manifest = dir.path().join("media.json");
    write_manifest(&manifest);
    let steps = dir.path().join("steps.json");
    fs::write(
        &steps,
        format!(
            r#"[{{"description": "Track reference star", "start_time": {}, "end_time": {}}}]"#,
            T0,
            T0 + 60.0
        ),
    )
    .unwrap();

    let sink = Arc::new(MemorySink::new());
    let report = AnalysisRunner::new(
        pipeline(),
        Arc::new(CsvSampleSource::new(dir.path(), TrackingColumns::default())),
        Arc::new(ManifestMetadataSource::from_file(&manifest).unwrap()),
        sink.clone(),
    )
    .with_annotations(parse_annotations_file(&steps).unwrap())
    .run()
    .await
    .unwrap();

    assert_eq!(report.jobs_submitted, 2);
    for job in sink.jobs() {
        let step = job.step.as_ref().unwrap();
        assert_eq!(step.description, "Track reference star");
        assert_eq!(step.length_mmss(), "1:00");
    }
}

#[tokio::test]
async fn test_run_fails_without_sample_directory() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("media.json");
    write_manifest(&manifest);

    let result = AnalysisRunner::new(
        pipeline(),
        Arc::new(CsvSampleSource::new(dir.path().join("absent"), TrackingColumns::default())),
        Arc::new(ManifestMetadataSource::from_file(&manifest).unwrap()),
        Arc::new(MemorySink::new()),
    )
    .run()
    .await;

    assert!(result.is_err());
}
