//! Lookup structure over media files grouped by channel and session.
//!
//! Files of one channel (one physical camera) are temporally adjacent
//! recordings of the same source; files of different channels that start at
//! the same rounded time belong to one acquisition session. The index is
//! built once per correlation run and is read-only afterwards.

use std::collections::{BTreeMap, HashSet};

use crate::core::domain::TrackFile;
use crate::core::error::{LosError, LosResult};

/// Default rounding applied to start times when grouping sessions, in seconds.
pub const DEFAULT_SESSION_RESOLUTION: f64 = 1.0;

/// Direction of an adjacency lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Media files grouped by channel, each channel ordered by start time.
///
/// # Examples
///
/// ```
/// use los_rust::algorithms::track_index::{Direction, TrackIndex};
/// use los_rust::core::domain::TrackFile;
///
/// let first = TrackFile::new("room5_a.mp4", "room5", 100.0, 100.0).unwrap();
/// let second = TrackFile::new("room5_b.mp4", "room5", 200.0, 100.0).unwrap();
/// let index = TrackIndex::build(vec![second.clone(), first.clone()]);
///
/// assert_eq!(index.adjacent(&first, Direction::Next), Some(&second));
/// assert_eq!(index.adjacent(&first, Direction::Previous), None);
/// ```
#[derive(Debug, Clone)]
pub struct TrackIndex {
    channels: BTreeMap<String, Vec<TrackFile>>,
    session_resolution: f64,
}

impl TrackIndex {
    /// Builds an index with the default session resolution.
    pub fn build(files: Vec<TrackFile>) -> Self {
        Self::group(files, DEFAULT_SESSION_RESOLUTION)
    }

    /// Builds an index whose sessions group start times rounded to `resolution` seconds.
    pub fn build_with_resolution(files: Vec<TrackFile>, resolution: f64) -> LosResult<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(LosError::Configuration(format!(
                "session resolution must be positive, got {}",
                resolution
            )));
        }
        Ok(Self::group(files, resolution))
    }

    fn group(files: Vec<TrackFile>, session_resolution: f64) -> Self {
        let mut seen = HashSet::new();
        let mut channels: BTreeMap<String, Vec<TrackFile>> = BTreeMap::new();

        for file in files {
            if !seen.insert(file.file_id.clone()) {
                log::warn!("Ignoring duplicate media file entry: {}", file.file_id);
                continue;
            }
            channels.entry(file.channel.clone()).or_default().push(file);
        }

        for files in channels.values_mut() {
            files.sort_by(|a, b| {
                a.start
                    .total_cmp(&b.start)
                    .then_with(|| a.file_id.cmp(&b.file_id))
            });
        }

        Self {
            channels,
            session_resolution,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Files of `channel` in start-time order; empty for an unknown channel.
    pub fn files(&self, channel: &str) -> &[TrackFile] {
        self.channels.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every indexed file, channel by channel.
    pub fn iter(&self) -> impl Iterator<Item = &TrackFile> {
        self.channels.values().flatten()
    }

    pub fn get(&self, file_id: &str) -> Option<&TrackFile> {
        self.iter().find(|f| f.file_id == file_id)
    }

    /// The file immediately before or after `file` within its own channel.
    ///
    /// Returns `None` at either end of the channel, for a channel with a single
    /// file, and for a file that is not in the index.
    pub fn adjacent(&self, file: &TrackFile, direction: Direction) -> Option<&TrackFile> {
        let files = self.channels.get(&file.channel)?;
        let pos = files.iter().position(|f| f.file_id == file.file_id)?;
        match direction {
            Direction::Previous => pos.checked_sub(1).and_then(|i| files.get(i)),
            Direction::Next => files.get(pos + 1),
        }
    }

    /// Session key of a file: its start time rounded to the session resolution.
    pub fn session_key(&self, file: &TrackFile) -> i64 {
        (file.start / self.session_resolution).round() as i64
    }

    /// Files grouped by session key, across channels.
    pub fn sessions(&self) -> BTreeMap<i64, Vec<&TrackFile>> {
        let mut sessions: BTreeMap<i64, Vec<&TrackFile>> = BTreeMap::new();
        for file in self.iter() {
            sessions.entry(self.session_key(file)).or_default().push(file);
        }
        sessions
    }

    /// All files, across channels, recorded in the same session as `file`.
    pub fn session_of(&self, file: &TrackFile) -> Vec<&TrackFile> {
        let key = self.session_key(file);
        self.iter().filter(|f| self.session_key(f) == key).collect()
    }
}
