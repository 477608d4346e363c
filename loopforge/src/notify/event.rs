//! The tagged payload delivered to notification channels.

use crate::pipeline::RunSummary;
use crate::stages::StageName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A stage failed terminally (non-timeout classification).
    StageFailure,
    /// A stage failed terminally with a timeout classification.
    StageTimeout,
    /// The whole pipeline completed successfully.
    PipelineSuccess,
    /// The pipeline stopped on a failed stage.
    PipelineFailure,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageFailure => write!(f, "stage_failure"),
            Self::StageTimeout => write!(f, "stage_timeout"),
            Self::PipelineSuccess => write!(f, "pipeline_success"),
            Self::PipelineFailure => write!(f, "pipeline_failure"),
        }
    }
}

/// A notification payload: constructed by the orchestrator at a checkpoint
/// and consumed synchronously by the notifier. Never persisted.
///
/// Every channel renders it in its own shape, but the information content
/// (kind, stage, message, summary) is the same across channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Stage the event concerns, if stage-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageName>,
    /// Human-readable message.
    pub message: String,
    /// Snapshot of the run summary at dispatch time.
    pub summary: RunSummary,
}

impl NotificationEvent {
    /// Creates a new notification event.
    #[must_use]
    pub fn new(
        kind: EventKind,
        stage: Option<StageName>,
        message: impl Into<String>,
        summary: RunSummary,
    ) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            summary,
        }
    }

    /// Short subject line, used as the mail subject and chat headline.
    #[must_use]
    pub fn subject(&self) -> String {
        match (self.kind, self.stage) {
            (EventKind::StageFailure, Some(stage)) => {
                format!("LoopForge: stage '{stage}' failed")
            }
            (EventKind::StageTimeout, Some(stage)) => {
                format!("LoopForge: stage '{stage}' timed out")
            }
            (EventKind::PipelineSuccess, _) => "LoopForge: pipeline succeeded".to_string(),
            (EventKind::PipelineFailure, _) => "LoopForge: pipeline failed".to_string(),
            (kind, None) => format!("LoopForge: {kind}"),
        }
    }

    /// Full body: the message plus the run summary table.
    #[must_use]
    pub fn body(&self) -> String {
        format!(
            "{}\n\nRun {}\n{}",
            self.message,
            self.summary.run_id,
            self.summary.render_table()
        )
    }
}
