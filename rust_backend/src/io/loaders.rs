use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::domain::TrackFile;
use crate::core::error::{LosError, LosResult};
use crate::parsing::media_manifest::{parse_media_manifest_file, MediaEntry};
use crate::parsing::tracking_csv::{parse_tracking_csv_file, TrackingColumns};
use crate::services::collaborators::{
    MediaMetadataSource, Recording, RenderJob, RenderSink, SampleSource,
};

fn join_error(e: tokio::task::JoinError) -> LosError {
    LosError::Io(std::io::Error::other(e))
}

/// Tracking exports stored as one CSV file per recording in a directory
pub struct CsvSampleSource {
    dir: PathBuf,
    columns: TrackingColumns,
}

impl CsvSampleSource {
    pub fn new(dir: impl Into<PathBuf>, columns: TrackingColumns) -> Self {
        Self {
            dir: dir.into(),
            columns,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SampleSource for CsvSampleSource {
    /// File names of the `.csv` files in the directory, sorted
    async fn recordings(&self) -> LosResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        log::info!("Found {} recording(s) in {}", names.len(), self.dir.display());
        Ok(names)
    }

    async fn load(&self, name: &str) -> LosResult<Recording> {
        let path = self.dir.join(name);
        let columns = self.columns.clone();
        let recording_name = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
            .to_string();

        let channels =
            tokio::task::spawn_blocking(move || parse_tracking_csv_file(&path, &columns))
                .await
                .map_err(join_error)??;

        Ok(Recording {
            name: recording_name,
            channels,
        })
    }
}

/// Media placement taken from a metadata manifest
pub struct ManifestMetadataSource {
    entries: Vec<MediaEntry>,
}

impl ManifestMetadataSource {
    pub fn from_entries(entries: Vec<MediaEntry>) -> Self {
        Self { entries }
    }

    /// Load the manifest from a JSON file
    pub fn from_file(path: &Path) -> LosResult<Self> {
        Ok(Self::from_entries(parse_media_manifest_file(path)?))
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }
}

#[async_trait]
impl MediaMetadataSource for ManifestMetadataSource {
    async fn media_files(&self) -> LosResult<Vec<String>> {
        Ok(self.entries.iter().map(MediaEntry::id).collect())
    }

    async fn probe(&self, file_id: &str) -> LosResult<TrackFile> {
        self.entries
            .iter()
            .find(|entry| entry.id() == file_id)
            .ok_or_else(|| {
                LosError::MissingMetadata(format!("{}: not in the media manifest", file_id))
            })?
            .to_track_file()
    }
}

/// Writes one JSON document per render job
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Create (or truncate) the output file
    pub fn create(path: &Path) -> LosResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

#[async_trait]
impl RenderSink for JsonLinesSink {
    async fn submit(&self, job: &RenderJob) -> LosResult<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, job)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    async fn finish(&self) -> LosResult<()> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

/// Keeps render jobs in memory
#[derive(Default)]
pub struct MemorySink {
    jobs: Mutex<Vec<RenderJob>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<RenderJob> {
        self.jobs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[async_trait]
impl RenderSink for MemorySink {
    async fn submit(&self, job: &RenderJob) -> LosResult<()> {
        self.jobs.lock().push(job.clone());
        Ok(())
    }
}
