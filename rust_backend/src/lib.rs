//! Loss-of-signal analysis for tracked-marker recordings.
//!
//! The crate finds the time ranges in which a tracked marker disappeared
//! (dropouts), canonicalizes them, and maps them onto the recorded media
//! files as cut plans for a downstream renderer.
//!
//! - [`algorithms`]: detection, merging, track indexing and correlation
//! - [`time`]: timeframes of interest on the absolute clock
//! - [`config`]: TOML configuration
//! - [`parsing`]: collaborator data formats
//! - [`services`]: pipeline and asynchronous run orchestration
//! - [`io`]: file-backed collaborators

pub mod algorithms;
pub mod config;
pub mod core;
pub mod io;
pub mod parsing;
pub mod services;
pub mod time;
