//! Single-stage execution: invoke, capture, classify.

use super::runlog::RunLog;
use crate::stages::{
    FailureClass, Invocation, InvocationExit, StageInvoker, StageResult, StageSpec,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Executes one attempt of one stage and classifies the outcome.
///
/// Exit code zero is only tentative success; the output validator has the
/// final word (see the retry policy). Captured diagnostics go to the run
/// log on every attempt, whatever the outcome.
#[derive(Clone)]
pub struct StageRunner {
    invoker: Arc<dyn StageInvoker>,
    log: RunLog,
}

impl StageRunner {
    /// Creates a new stage runner.
    #[must_use]
    pub fn new(invoker: Arc<dyn StageInvoker>, log: RunLog) -> Self {
        Self { invoker, log }
    }

    /// Runs a single attempt of the stage.
    pub async fn run(&self, spec: &StageSpec, attempt: usize) -> StageResult {
        let started_at = Utc::now();
        info!(stage = %spec.name, attempt, command = %spec.command, "running stage");

        let Invocation { exit, output } = self.invoker.invoke(spec).await;
        self.log.append(spec.name, attempt, &output);

        match exit {
            InvocationExit::Completed(0) => {
                info!(stage = %spec.name, attempt, "stage process exited cleanly");
                StageResult::succeeded(spec.name, started_at, output)
            }
            InvocationExit::Completed(code) => {
                error!(stage = %spec.name, attempt, exit_code = code, "stage process failed");
                StageResult::failed(
                    spec.name,
                    started_at,
                    FailureClass::Error,
                    format!("exit code {code}\n{output}"),
                )
            }
            InvocationExit::TimedOut => {
                error!(
                    stage = %spec.name,
                    attempt,
                    timeout_secs = spec.timeout.as_secs(),
                    "stage timed out"
                );
                StageResult::failed(
                    spec.name,
                    started_at,
                    FailureClass::Timeout,
                    format!(
                        "killed after exceeding {}s timeout\n{output}",
                        spec.timeout.as_secs()
                    ),
                )
            }
            InvocationExit::SpawnFailed(message) => {
                warn!(stage = %spec.name, attempt, error = %message, "stage could not be invoked");
                StageResult::failed(spec.name, started_at, FailureClass::Config, message)
            }
        }
    }
}
