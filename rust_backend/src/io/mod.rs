//! File-backed collaborators.
//!
//! This module provides the implementations of the collaborator traits used
//! by the command-line tool: tracking CSV exports read from a directory, media
//! placement read from a manifest, and render jobs written as JSON lines or
//! kept in memory.
//!
//! # Example
//!
//! ```no_run
//! use los_rust::io::loaders::ManifestMetadataSource;
//! use std::path::Path;
//!
//! let media = ManifestMetadataSource::from_file(Path::new("media.json"))
//!     .expect("Failed to load manifest");
//! println!("{} media files", media.entries().len());
//! ```

pub mod loaders;


pub use loaders::{CsvSampleSource, JsonLinesSink, ManifestMetadataSource, MemorySink};
