//! Engine error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::step::CompareType;

/// Failures surfaced by the record-and-replay engine.
///
/// Per-step failures (`ElementNotFound`, `InteractionTimeout`,
/// `AssertionFailure`, `NavigationError`) are captured into that step's
/// result entry and the run continues; [`AutomationError::is_fatal`] marks
/// the ones that abort the remaining sequence.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Selector resolved to zero elements after every degradation attempt.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// An action's wait/strategy ladder exhausted without success.
    #[error("interaction timed out: {0}")]
    InteractionTimeout(String),

    /// Navigation failed to reach a stable loaded state within bounds.
    #[error("navigation failed: {0}")]
    NavigationError(String),

    /// Extracted value did not satisfy the configured compare mode.
    #[error("assertion failed: extracted {extracted:?} did not match expected {expected:?} ({mode:?})")]
    AssertionFailure {
        extracted: String,
        expected: String,
        mode: CompareType,
    },

    /// A submit step executed without a preceding click in the same run.
    #[error("sequencing violation: {0}")]
    SequencingViolation(String),

    /// A submitted operation exceeded the worker ceiling. The underlying
    /// browser call is abandoned, not aborted.
    #[error("worker operation exceeded the {0:?} ceiling")]
    WorkerTimeout(Duration),

    /// The browser session could not be launched or was lost mid-run.
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),
}

impl AutomationError {
    /// Fatal errors abort the remaining sequence; everything else is recorded
    /// in the step's result entry and the run continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AutomationError::BrowserUnavailable(_) | AutomationError::SequencingViolation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_split() {
        assert!(AutomationError::BrowserUnavailable("gone".into()).is_fatal());
        assert!(AutomationError::SequencingViolation("submit first".into()).is_fatal());
        assert!(!AutomationError::ElementNotFound("#x".into()).is_fatal());
        assert!(!AutomationError::InteractionTimeout("click".into()).is_fatal());
        assert!(
            !AutomationError::AssertionFailure {
                extracted: "a".into(),
                expected: "b".into(),
                mode: CompareType::Equals,
            }
            .is_fatal()
        );
    }

    #[test]
    fn messages_are_structured() {
        let err = AutomationError::WorkerTimeout(Duration::from_secs(600));
        assert!(err.to_string().contains("600"));
    }
}
