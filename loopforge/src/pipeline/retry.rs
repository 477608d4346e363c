//! Bounded retry with increasing backoff for transient stage failures.

use super::runner::StageRunner;
use super::validate::validate;
use crate::stages::{FailureClass, StageResult, StageSpec};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^(attempt - 1)
    #[default]
    Exponential,
    /// delay = base * attempt
    Linear,
}

/// Configuration for retry backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub strategy: BackoffStrategy,
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            strategy: BackoffStrategy::default(),
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns the delay to wait after the given attempt (1-indexed).
    ///
    /// Grows strictly with the attempt number until the cap is reached.
    #[must_use]
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let attempt = attempt.max(1);
        let delay = match self.strategy {
            BackoffStrategy::Exponential => self
                .base_delay_ms
                .saturating_mul(2u64.saturating_pow((attempt - 1) as u32)),
            BackoffStrategy::Linear => self.base_delay_ms.saturating_mul(attempt as u64),
        };
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Wraps stage execution with validation and bounded retry.
///
/// Only `error` and `timeout` classifications are retried. A missing-output
/// result after an apparently clean exit is a terminal data-integrity
/// failure and consumes no additional attempt; configuration failures abort
/// immediately.
#[derive(Clone)]
pub struct RetryPolicy {
    runner: StageRunner,
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a new retry policy around a stage runner.
    #[must_use]
    pub fn new(runner: StageRunner, config: RetryConfig) -> Self {
        Self { runner, config }
    }

    /// Executes the stage up to `max_retries + 1` times and returns the
    /// result of the last attempt, annotated with the attempts used.
    pub async fn execute(&self, spec: &StageSpec) -> StageResult {
        let total_attempts = spec.max_retries + 1;
        let mut attempt = 1;
        loop {
            let result = self.runner.run(spec, attempt).await;

            if result.is_success() {
                if validate(spec) {
                    return result.with_attempts(attempt);
                }
                let diagnostics = format!(
                    "process exited 0 but no qualifying output at {}\n{}",
                    spec.output, result.diagnostics
                );
                return StageResult::failed(
                    spec.name,
                    result.started_at,
                    FailureClass::MissingOutput,
                    diagnostics,
                )
                .with_attempts(attempt);
            }

            let transient = result
                .failure
                .map(|class| class.is_transient())
                .unwrap_or(false);
            if !transient || attempt >= total_attempts {
                return result.with_attempts(attempt);
            }

            let delay = self.config.delay_for(attempt);
            warn!(
                stage = %spec.name,
                attempt,
                remaining = total_attempts - attempt,
                delay_ms = delay.as_millis() as u64,
                "transient stage failure, retrying after backoff"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunLog;
    use crate::stages::{
        Invocation, OutputLocator, StageCommand, StageName, StageStatus,
    };
    use crate::testing::ScriptedInvoker;
    use std::path::Path;
    use std::sync::Arc;

    fn fast_policy(invoker: Arc<ScriptedInvoker>) -> RetryPolicy {
        RetryPolicy::new(
            StageRunner::new(invoker, RunLog::disabled()),
            RetryConfig::new().with_base_delay_ms(1),
        )
    }

    fn dir_spec(stage: StageName, dir: &Path, max_retries: usize) -> StageSpec {
        StageSpec::new(
            stage,
            StageCommand::new("unused"),
            OutputLocator::Directory {
                path: dir.to_path_buf(),
                extension: "mp4".to_string(),
            },
        )
        .with_max_retries(max_retries)
    }

    #[test]
    fn test_backoff_strictly_increasing_exponential() {
        let config = RetryConfig::new().with_base_delay_ms(100);
        assert!(config.delay_for(2) > config.delay_for(1));
        assert!(config.delay_for(3) > config.delay_for(2));
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_strictly_increasing_linear() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_strategy(BackoffStrategy::Linear);
        assert!(config.delay_for(2) > config.delay_for(1));
        assert!(config.delay_for(3) > config.delay_for(2));
        assert_eq!(config.delay_for(3), Duration::from_millis(300));
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let config = RetryConfig::new()
            .with_base_delay_ms(1000)
            .with_max_delay_ms(5000);
        assert_eq!(config.delay_for(10), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_transient_failure_consumes_all_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        invoker.set_fallback(StageName::Render, Invocation::completed(1, "boom"));
        let policy = fast_policy(Arc::clone(&invoker));

        let spec = dir_spec(StageName::Render, dir.path(), 2);
        let result = policy.execute(&spec).await;

        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.failure, Some(FailureClass::Error));
        assert_eq!(result.attempts, 3);
        assert_eq!(invoker.call_count(StageName::Render), 3);
    }

    #[tokio::test]
    async fn test_missing_output_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        invoker.set_fallback(StageName::Generate, Invocation::completed(0, "done"));
        let policy = fast_policy(Arc::clone(&invoker));

        // Directory stays empty, so validation fails after a clean exit.
        let spec = dir_spec(StageName::Generate, dir.path(), 5);
        let result = policy.execute(&spec).await;

        assert_eq!(result.failure, Some(FailureClass::MissingOutput));
        assert_eq!(result.attempts, 1);
        assert_eq!(invoker.call_count(StageName::Generate), 1);
    }

    #[tokio::test]
    async fn test_config_failure_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        invoker.set_fallback(
            StageName::Process,
            Invocation::spawn_failed("ffmpeg missing"),
        );
        let policy = fast_policy(Arc::clone(&invoker));

        let spec = dir_spec(StageName::Process, dir.path(), 5);
        let result = policy.execute(&spec).await;

        assert_eq!(result.failure, Some(FailureClass::Config));
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"frames").unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        invoker.script(StageName::Render, Invocation::completed(1, "flaky"));
        invoker.script(StageName::Render, Invocation::completed(0, "rendered"));
        let policy = fast_policy(Arc::clone(&invoker));

        let spec = dir_spec(StageName::Render, dir.path(), 2);
        let result = policy.execute(&spec).await;

        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"frames").unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        invoker.script(StageName::Render, Invocation::timed_out("stuck"));
        invoker.script(StageName::Render, Invocation::completed(0, "ok"));
        let policy = fast_policy(Arc::clone(&invoker));

        let spec = dir_spec(StageName::Render, dir.path(), 1);
        let result = policy.execute(&spec).await;

        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(result.attempts, 2);
    }
}
