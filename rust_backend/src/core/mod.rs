//! Core domain models for dropout analysis.
//!
//! This module defines the fundamental data structures used throughout the crate,
//! representing tracking samples, absolute-time intervals, media files and cut plans,
//! together with the crate-wide error type.

pub mod domain;
pub mod error;

pub use domain::{
    CutPlan, FileSpan, Interval, PlanNote, Sample, SegmentId, Side, TrackFile, MISSING_SENTINEL,
};
pub use error::{LosError, LosResult};
