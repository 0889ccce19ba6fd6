use std::path::Path;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::core::domain::TrackFile;
use crate::core::error::{LosError, LosResult};

const DEFAULT_CHANNEL: &str = "default";

/// One media file as described by the metadata manifest.
///
/// Start time comes either from an ISO-8601 `creation_time` tag or from an
/// explicit epoch `start`; `duration` is the probed length in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub path: String,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Accepts either `{"files": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawManifest {
    Wrapped { files: Vec<MediaEntry> },
    Bare(Vec<MediaEntry>),
}

impl MediaEntry {
    /// Identifier used in cut plans: explicit `file_id`, else the file name.
    pub fn id(&self) -> String {
        if let Some(id) = &self.file_id {
            return id.clone();
        }
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
            .to_string()
    }

    /// Channel label: explicit `channel`, else the parent directory name.
    pub fn channel(&self) -> String {
        if let Some(channel) = &self.channel {
            return channel.clone();
        }
        Path::new(&self.path)
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_CHANNEL)
            .to_string()
    }

    /// Absolute start time in epoch seconds.
    pub fn start_timestamp(&self) -> LosResult<f64> {
        if let Some(start) = self.start {
            return Ok(start);
        }
        let text = self.creation_time.as_deref().ok_or_else(|| {
            LosError::MissingMetadata(format!("{}: no creation_time or start", self.id()))
        })?;
        let parsed = DateTime::parse_from_rfc3339(text.trim()).map_err(|e| {
            LosError::MissingMetadata(format!(
                "{}: unreadable creation_time '{}': {}",
                self.id(),
                text,
                e
            ))
        })?;
        Ok(parsed.timestamp() as f64 + f64::from(parsed.timestamp_subsec_nanos()) / 1e9)
    }

    /// Places the file on the absolute clock.
    pub fn to_track_file(&self) -> LosResult<TrackFile> {
        let start = self.start_timestamp()?;
        let duration = self
            .duration
            .ok_or_else(|| LosError::MissingMetadata(format!("{}: no duration", self.id())))?;
        TrackFile::new(self.id(), self.channel(), start, duration)
    }
}

/// Parse a media manifest from JSON text
pub fn parse_media_manifest(json: &str) -> LosResult<Vec<MediaEntry>> {
    let de = &mut serde_json::Deserializer::from_str(json);
    let raw: RawManifest = serde_path_to_error::deserialize(de)
        .map_err(|e| LosError::Parse(format!("media manifest at '{}': {}", e.path(), e.inner())))?;

    let entries = match raw {
        RawManifest::Wrapped { files } => files,
        RawManifest::Bare(files) => files,
    };
    log::debug!("Parsed media manifest with {} entries", entries.len());
    Ok(entries)
}

/// Parse a media manifest file
pub fn parse_media_manifest_file(path: &Path) -> LosResult<Vec<MediaEntry>> {
    let content = std::fs::read_to_string(path)?;
    parse_media_manifest(&content)
}
