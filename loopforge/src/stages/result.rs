//! Typed outcome of a stage execution.

use super::StageName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The final status of a stage within one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Stage completed and its expected output was validated.
    Success,
    /// Stage failed (process error, timeout, missing output, or bad config).
    Failed,
    /// Stage was skipped because an upstream stage failed.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Classification of a stage failure, driving the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The external process exited nonzero. Transient; retried.
    Error,
    /// The per-attempt timeout expired. Transient; retried.
    Timeout,
    /// The process exited zero but produced no qualifying artifacts.
    /// A data-integrity defect; never retried.
    MissingOutput,
    /// Missing or invalid configuration, or a spawn/internal fault.
    /// Fatal; never retried.
    Config,
}

impl FailureClass {
    /// Returns true if the failure is transient and eligible for retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Error | Self::Timeout)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Timeout => write!(f, "timeout"),
            Self::MissingOutput => write!(f, "missing_output"),
            Self::Config => write!(f, "config"),
        }
    }
}

/// Outcome of one stage execution, finalized by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage: StageName,
    /// Final status.
    pub status: StageStatus,
    /// Total attempts consumed (0 for skipped stages).
    pub attempts: usize,
    /// Failure classification, if the stage failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureClass>,
    /// Captured diagnostic text, bounded at capture time.
    pub diagnostics: String,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
}

impl StageResult {
    /// Creates a successful stage result.
    #[must_use]
    pub fn succeeded(
        stage: StageName,
        started_at: DateTime<Utc>,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            attempts: 1,
            failure: None,
            diagnostics: diagnostics.into(),
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Creates a failed stage result with the given classification.
    #[must_use]
    pub fn failed(
        stage: StageName,
        started_at: DateTime<Utc>,
        failure: FailureClass,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            attempts: 1,
            failure: Some(failure),
            diagnostics: diagnostics.into(),
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Creates a skipped stage result.
    #[must_use]
    pub fn skipped(stage: StageName) -> Self {
        let now = Utc::now();
        Self {
            stage,
            status: StageStatus::Skipped,
            attempts: 0,
            failure: None,
            diagnostics: String::new(),
            started_at: now,
            ended_at: now,
        }
    }

    /// Annotates the result with the total attempt count actually used.
    #[must_use]
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, StageStatus::Success)
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StageStatus::Failed)
    }

    /// Returns true if the stage was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, StageStatus::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(StageStatus::Success.to_string(), "success");
        assert_eq!(StageStatus::Failed.to_string(), "failed");
        assert_eq!(StageStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_failure_class_transient() {
        assert!(FailureClass::Error.is_transient());
        assert!(FailureClass::Timeout.is_transient());
        assert!(!FailureClass::MissingOutput.is_transient());
        assert!(!FailureClass::Config.is_transient());
    }

    #[test]
    fn test_succeeded_result() {
        let result = StageResult::succeeded(StageName::Generate, Utc::now(), "10 prompts");
        assert!(result.is_success());
        assert!(result.failure.is_none());
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn test_failed_result() {
        let result = StageResult::failed(
            StageName::Render,
            Utc::now(),
            FailureClass::Timeout,
            "killed after 300s",
        );
        assert!(result.is_failure());
        assert_eq!(result.failure, Some(FailureClass::Timeout));
    }

    #[test]
    fn test_skipped_result_consumes_no_attempts() {
        let result = StageResult::skipped(StageName::Upload);
        assert!(result.is_skipped());
        assert_eq!(result.attempts, 0);
    }

    #[test]
    fn test_with_attempts() {
        let result = StageResult::failed(
            StageName::Render,
            Utc::now(),
            FailureClass::Error,
            "exit 1",
        )
        .with_attempts(3);
        assert_eq!(result.attempts, 3);
    }

    #[test]
    fn test_result_serialization_roundtrip() {
        let result = StageResult::succeeded(StageName::Process, Utc::now(), "ok");
        let json = serde_json::to_string(&result).unwrap();
        let parsed: StageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stage, StageName::Process);
        assert_eq!(parsed.status, StageStatus::Success);
    }
}
