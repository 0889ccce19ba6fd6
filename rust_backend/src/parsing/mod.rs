//! Parsers for the collaborator data formats.
//!
//! # Parsers
//!
//! - [`tracking_csv`]: Parse exported tracking-topic CSV files into per-channel samples
//! - [`media_manifest`]: Parse media metadata manifests (creation time plus duration)
//! - [`annotations`]: Parse operator log steps for issue annotation
//!
//! # Example
//!
//! ```no_run
//! use los_rust::parsing::tracking_csv::{parse_tracking_csv_file, TrackingColumns};
//! use std::path::Path;
//!
//! let channels = parse_tracking_csv_file(Path::new("ARTracking.csv"), &TrackingColumns::default())
//!     .expect("Failed to parse tracking data");
//! ```

pub mod annotations;
pub mod media_manifest;
pub mod tracking_csv;


pub use annotations::{parse_annotations, AnnotationLog, LogStep};
pub use media_manifest::{parse_media_manifest, MediaEntry};
pub use tracking_csv::{parse_tracking_csv, pool_channels, ChannelSamples, TrackingColumns};
