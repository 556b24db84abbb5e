//! Execution results produced for the external collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::step::Step;

/// Outcome of a single executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Error,
    /// A deliberate no-op (skipped hover) or an inconclusive passive
    /// extraction.
    Skipped,
}

/// Per-step entry in the execution result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: Step,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

impl StepResult {
    pub fn success(step: Step) -> Self {
        Self {
            step,
            status: StepStatus::Success,
            error: None,
            extracted_text: None,
        }
    }

    pub fn error(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Error,
            error: Some(message.into()),
            extracted_text: None,
        }
    }

    pub fn skipped(step: Step, reason: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            error: Some(reason.into()),
            extracted_text: None,
        }
    }

    pub fn with_extracted(mut self, text: impl Into<String>) -> Self {
        self.extracted_text = Some(text.into());
        self
    }
}

/// Overall run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
}

/// Aggregate record for one playback run; persisted by the external layer as
/// run history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_text: Option<String>,
    /// First fatal error message, when the run aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<StepResult>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// True when every step either succeeded or was deliberately skipped.
    pub fn is_clean(&self) -> bool {
        self.status == RunStatus::Success
            && self.results.iter().all(|r| r.status != StepStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Action;

    #[test]
    fn result_entry_shape() {
        let entry = StepResult::error(Step::click("#missing"), "element not found: #missing");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["step"]["action"], "click");
        assert_eq!(json["error"], "element not found: #missing");
        assert!(json.get("extracted_text").is_none());
    }

    #[test]
    fn clean_run_detection() {
        let report = RunReport {
            status: RunStatus::Success,
            duration: 1.25,
            extracted_text: Some("42".into()),
            expected_text: Some("42".into()),
            error: None,
            results: vec![
                StepResult::success(Step::navigate("https://example.com")),
                StepResult::skipped(Step::hover("#menu"), "hover skipped by policy"),
            ],
            finished_at: Utc::now(),
        };
        assert!(report.is_clean());
        assert_eq!(report.results[1].step.action, Action::Hover);
    }
}
