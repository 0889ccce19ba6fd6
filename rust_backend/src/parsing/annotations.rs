use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{LosError, LosResult};

/// One annotated step of an operator log, in epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogStep {
    pub description: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl LogStep {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Closed membership test.
    pub fn contains(&self, t: f64) -> bool {
        self.start_time <= t && t <= self.end_time
    }

    /// Step length as `m:ss`, whole seconds.
    pub fn length_mmss(&self) -> String {
        let secs = self.duration().max(0.0) as u64;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

/// Annotation steps ordered by start time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationLog {
    steps: Vec<LogStep>,
}

impl AnnotationLog {
    /// Builds a log, rejecting steps with non-finite or reversed bounds.
    pub fn new(mut steps: Vec<LogStep>) -> LosResult<Self> {
        for step in &steps {
            if !step.start_time.is_finite() || !step.end_time.is_finite() {
                return Err(LosError::Parse(format!(
                    "step '{}' has non-finite bounds",
                    step.description
                )));
            }
            if step.end_time < step.start_time {
                return Err(LosError::Parse(format!(
                    "step '{}' ends before it starts",
                    step.description
                )));
            }
        }
        steps.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[LogStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The earliest-starting step covering `t`, if any.
    pub fn find_step_at(&self, t: f64) -> Option<&LogStep> {
        self.steps
            .iter()
            .take_while(|s| s.start_time <= t)
            .find(|s| s.contains(t))
    }
}

/// Parse annotation steps from a JSON array
pub fn parse_annotations(json: &str) -> LosResult<AnnotationLog> {
    let de = &mut serde_json::Deserializer::from_str(json);
    let steps: Vec<LogStep> = serde_path_to_error::deserialize(de)
        .map_err(|e| LosError::Parse(format!("annotations at '{}': {}", e.path(), e.inner())))?;
    AnnotationLog::new(steps)
}

/// Parse an annotation file
pub fn parse_annotations_file(path: &Path) -> LosResult<AnnotationLog> {
    let content = std::fs::read_to_string(path)?;
    parse_annotations(&content)
}
