//! Dropout detection and timeline correlation algorithms.
//!
//! All components here are pure, synchronous computations over in-memory
//! sequences. They hold no state across calls apart from the one-time-built
//! [`TrackIndex`].
//!
//! # Components
//!
//! - [`detection`]: sliding-window dropout detection over one channel
//! - [`merging`]: canonicalization of dropout interval lists
//! - [`track_index`]: per-channel ordering and session grouping of media files
//! - [`correlation`]: mapping of dropouts onto (possibly several) media files
//! - [`analysis`]: missing-marker statistics per recording
//!
//! # Example
//!
//! ```
//! use los_rust::algorithms::{DetectorConfig, DropoutDetector, MergeConfig, SegmentMerger, Threshold};
//!
//! let detector = DropoutDetector::new(&DetectorConfig {
//!     window_size: 3,
//!     threshold: Threshold::Count(2),
//!     ..DetectorConfig::default()
//! })
//! .unwrap();
//! let raw = detector
//!     .detect(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0])
//!     .unwrap();
//!
//! let merger = SegmentMerger::new(&MergeConfig { min_duration: 2.0, tolerance: 0.0 }).unwrap();
//! let canonical = merger.merge(&raw, None);
//! assert_eq!(canonical.len(), 2);
//! ```

pub mod analysis;
pub mod correlation;
pub mod detection;
pub mod merging;
pub mod track_index;

pub use analysis::{average_missing_percentage, summarize_channels, summarize_recording, RecordingSummary};
pub use correlation::{CorrelationConfig, TimelineCorrelator};
pub use detection::{DetectionStrategy, DetectorConfig, DropoutDetector, Threshold};
pub use merging::{MergeConfig, SegmentMerger};
pub use track_index::{Direction, TrackIndex};
