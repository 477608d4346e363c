//! The pipeline orchestrator: fixed-order stage sequencing, skip-on-failure
//! semantics, run summary accounting, and notification checkpoints.

use super::retry::RetryPolicy;
use crate::config::LoopForgeConfig;
use crate::notify::{EventKind, NotificationEvent, Notifier};
use crate::stages::{FailureClass, StageName, StageResult, StageSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Overall outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every included stage succeeded.
    Success,
    /// Reserved for future optional-stage semantics; not produced while all
    /// stages are required.
    Partial,
    /// At least one required stage failed.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Ordered record of one orchestrator invocation.
///
/// Owned exclusively by the orchestrator for the lifetime of a run;
/// snapshots are cloned into notification events at dispatch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique id for this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished, once finalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Per-stage results in execution order.
    pub stages: Vec<StageResult>,
    /// Overall status.
    pub overall: RunStatus,
    /// Process exit code: 0 on success, 1 on failure.
    pub exit_code: i32,
}

impl RunSummary {
    /// Creates an empty summary at orchestration start.
    #[must_use]
    pub fn begin() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            overall: RunStatus::Success,
            exit_code: 0,
        }
    }

    /// Appends a concluded stage result.
    pub fn record(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    /// Computes the overall status and exit code and stamps the end time.
    pub fn finalize(&mut self) {
        let all_success = self.stages.iter().all(StageResult::is_success);
        self.overall = if all_success {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        self.exit_code = if all_success { 0 } else { 1 };
        self.finished_at = Some(Utc::now());
    }

    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.overall, RunStatus::Success)
    }

    /// Returns the first failed stage result, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StageResult> {
        self.stages.iter().find(|result| result.is_failure())
    }

    /// Renders the human-readable summary table printed at end of run.
    #[must_use]
    pub fn render_table(&self) -> String {
        let mut out = String::from("Pipeline summary:\n");
        for result in &self.stages {
            match result.status {
                crate::stages::StageStatus::Skipped => {
                    let _ = writeln!(out, "  {}: SKIPPED", result.stage);
                }
                status => {
                    let label = status.to_string().to_uppercase();
                    let class = result
                        .failure
                        .map(|failure| format!(" [{failure}]"))
                        .unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "  {}: {label}{class} ({} attempt{})",
                        result.stage,
                        result.attempts,
                        if result.attempts == 1 { "" } else { "s" }
                    );
                }
            }
        }
        let _ = write!(out, "Overall: {} (exit code {})", self.overall, self.exit_code);
        out
    }
}

/// Composes the retry policy, output validation, and notifier across the
/// ordered stage sequence for one run.
pub struct Orchestrator {
    config: Arc<LoopForgeConfig>,
    policy: RetryPolicy,
    notifier: Notifier,
}

impl Orchestrator {
    /// Creates a new orchestrator.
    #[must_use]
    pub fn new(config: Arc<LoopForgeConfig>, policy: RetryPolicy, notifier: Notifier) -> Self {
        Self {
            config,
            policy,
            notifier,
        }
    }

    /// Runs the requested stages in fixed dependency order.
    pub async fn run_pipeline(&self, requested: &[StageName]) -> RunSummary {
        self.run_pipeline_with_args(requested, &HashMap::new()).await
    }

    /// Runs the requested stages, appending per-stage pass-through
    /// arguments to each stage's entry point.
    pub async fn run_pipeline_with_args(
        &self,
        requested: &[StageName],
        stage_args: &HashMap<StageName, Vec<String>>,
    ) -> RunSummary {
        let ordered: Vec<StageName> = StageName::FULL_ORDER
            .into_iter()
            .filter(|stage| requested.contains(stage))
            .collect();

        let mut summary = RunSummary::begin();
        info!(run_id = %summary.run_id, stages = ?ordered, "starting pipeline run");

        let mut upstream_failed = false;
        for stage in ordered {
            if upstream_failed {
                summary.record(StageResult::skipped(stage));
                continue;
            }

            let extra = stage_args.get(&stage).cloned().unwrap_or_default();
            let result = match self.config.stage_spec(stage, &extra) {
                Ok(spec) => self.execute_guarded(spec).await,
                Err(err) => {
                    error!(stage = %stage, error = %err, "stage configuration invalid");
                    StageResult::failed(stage, Utc::now(), FailureClass::Config, err.to_string())
                }
            };

            let failed = result.is_failure();
            let failure = result.failure;
            let attempts = result.attempts;
            summary.record(result);

            if failed {
                upstream_failed = true;
                let kind = if failure == Some(FailureClass::Timeout) {
                    EventKind::StageTimeout
                } else {
                    EventKind::StageFailure
                };
                let class = failure.map(|f| f.to_string()).unwrap_or_default();
                let message = format!(
                    "Stage '{stage}' failed ({class}) after {attempts} attempt{}. Downstream stages will be skipped.",
                    if attempts == 1 { "" } else { "s" }
                );
                error!(stage = %stage, class = %class, attempts, "stage failed, stopping pipeline");
                self.notifier
                    .notify(&NotificationEvent::new(kind, Some(stage), message, summary.clone()))
                    .await;
            }
        }

        summary.finalize();
        let (kind, message) = if summary.is_success() {
            (
                EventKind::PipelineSuccess,
                "All pipeline stages completed successfully.".to_string(),
            )
        } else {
            let stage = summary
                .first_failure()
                .map(|result| result.stage.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            (
                EventKind::PipelineFailure,
                format!("Pipeline failed at stage '{stage}'. See the run log for details."),
            )
        };
        info!(
            run_id = %summary.run_id,
            overall = %summary.overall,
            exit_code = summary.exit_code,
            "pipeline run finished"
        );
        self.notifier
            .notify(&NotificationEvent::new(kind, None, message, summary.clone()))
            .await;

        summary
    }

    /// Executes one stage, converting any unexpected internal fault into a
    /// configuration failure of that stage (fail safe, skip downstream).
    async fn execute_guarded(&self, spec: StageSpec) -> StageResult {
        let stage = spec.name;
        let started_at = Utc::now();
        let policy = self.policy.clone();
        match tokio::spawn(async move { policy.execute(&spec).await }).await {
            Ok(result) => result,
            Err(err) => {
                error!(stage = %stage, error = %err, "unexpected fault during stage execution");
                StageResult::failed(
                    stage,
                    started_at,
                    FailureClass::Config,
                    format!("internal fault: {err}"),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageStatus;

    #[test]
    fn test_summary_finalize_all_success() {
        let mut summary = RunSummary::begin();
        summary.record(StageResult::succeeded(StageName::Generate, Utc::now(), ""));
        summary.record(StageResult::succeeded(StageName::Render, Utc::now(), ""));
        summary.finalize();

        assert_eq!(summary.overall, RunStatus::Success);
        assert_eq!(summary.exit_code, 0);
        assert!(summary.finished_at.is_some());
    }

    #[test]
    fn test_summary_finalize_with_failure() {
        let mut summary = RunSummary::begin();
        summary.record(StageResult::succeeded(StageName::Generate, Utc::now(), ""));
        summary.record(StageResult::failed(
            StageName::Render,
            Utc::now(),
            FailureClass::Error,
            "exit 1",
        ));
        summary.record(StageResult::skipped(StageName::Process));
        summary.finalize();

        assert_eq!(summary.overall, RunStatus::Failed);
        assert_eq!(summary.exit_code, 1);
        assert_eq!(summary.first_failure().map(|r| r.stage), Some(StageName::Render));
    }

    #[test]
    fn test_summary_table_rendering() {
        let mut summary = RunSummary::begin();
        summary.record(StageResult::succeeded(StageName::Generate, Utc::now(), ""));
        summary.record(
            StageResult::failed(StageName::Render, Utc::now(), FailureClass::Error, "x")
                .with_attempts(3),
        );
        summary.record(StageResult::skipped(StageName::Process));
        summary.finalize();

        let table = summary.render_table();
        assert!(table.contains("generate: SUCCESS (1 attempt)"));
        assert!(table.contains("render: FAILED [error] (3 attempts)"));
        assert!(table.contains("process: SKIPPED"));
        assert!(table.contains("exit code 1"));
    }

    #[test]
    fn test_empty_summary_is_success() {
        let mut summary = RunSummary::begin();
        summary.finalize();
        assert!(summary.is_success());
        assert_eq!(summary.exit_code, 0);
    }

    #[test]
    fn test_skipped_results_fail_the_run() {
        // A skipped stage is not a success, so overall is failed even if
        // nothing recorded an explicit failure class.
        let mut summary = RunSummary::begin();
        summary.record(StageResult::skipped(StageName::Upload));
        summary.finalize();
        assert_eq!(summary.overall, RunStatus::Failed);
        assert_eq!(summary.stages[0].status, StageStatus::Skipped);
    }
}
