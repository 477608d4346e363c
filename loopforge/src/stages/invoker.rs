//! The stage invocation seam.
//!
//! Each stage's external collaborator is an independent process with a
//! contract of "exit code + filesystem artifacts". `StageInvoker` is the
//! narrow abstraction over that invocation; `ProcessInvoker` is the real
//! subprocess-backed implementation with bounded combined output capture
//! and a forced kill on timeout.

use super::StageSpec;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default bound on captured combined stdout/stderr, in bytes.
pub const DEFAULT_CAPTURE_LIMIT: usize = 16 * 1024;

/// How the external invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationExit {
    /// The process exited on its own with the given code.
    Completed(i32),
    /// The per-attempt timeout expired and the process was killed.
    TimedOut,
    /// The process could not be spawned or awaited.
    SpawnFailed(String),
}

/// Typed result of one external invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Exit outcome.
    pub exit: InvocationExit,
    /// Captured combined stdout/stderr, bounded; when older content was
    /// dropped the text begins with an explicit marker.
    pub output: String,
}

impl Invocation {
    /// Creates a completed invocation.
    #[must_use]
    pub fn completed(code: i32, output: impl Into<String>) -> Self {
        Self {
            exit: InvocationExit::Completed(code),
            output: output.into(),
        }
    }

    /// Creates a timed-out invocation.
    #[must_use]
    pub fn timed_out(output: impl Into<String>) -> Self {
        Self {
            exit: InvocationExit::TimedOut,
            output: output.into(),
        }
    }

    /// Creates a spawn-failed invocation.
    #[must_use]
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self {
            exit: InvocationExit::SpawnFailed(message.into()),
            output: String::new(),
        }
    }
}

/// Trait for invoking a stage's external entry point.
///
/// Polymorphic over the concrete stage kinds: each `StageSpec` supplies its
/// own entry point, but invocation, timeout, and capture behave uniformly.
#[async_trait]
pub trait StageInvoker: Send + Sync {
    /// Invokes the stage's entry point and waits for it to finish.
    async fn invoke(&self, spec: &StageSpec) -> Invocation;
}

/// Bounded line buffer shared with the stdout/stderr reader tasks.
///
/// Keeps the newest lines up to the byte limit; older content is dropped
/// and flagged so the rendered text carries a marker instead of being
/// silently truncated.
#[derive(Debug)]
struct CaptureBuffer {
    lines: std::collections::VecDeque<String>,
    bytes: usize,
    limit: usize,
    dropped: bool,
}

impl CaptureBuffer {
    fn new(limit: usize) -> Self {
        Self {
            lines: std::collections::VecDeque::new(),
            bytes: 0,
            limit,
            dropped: false,
        }
    }

    fn push(&mut self, line: String) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line);
        while self.bytes > self.limit {
            if let Some(old) = self.lines.pop_front() {
                self.bytes -= old.len() + 1;
                self.dropped = true;
            } else {
                break;
            }
        }
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(self.bytes + 64);
        if self.dropped {
            out.push_str("[earlier output dropped]\n");
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Subprocess-backed stage invoker.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    capture_limit: usize,
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self {
            capture_limit: DEFAULT_CAPTURE_LIMIT,
        }
    }
}

impl ProcessInvoker {
    /// Creates a new process invoker with the default capture limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capture limit in bytes.
    #[must_use]
    pub fn with_capture_limit(mut self, limit: usize) -> Self {
        self.capture_limit = limit;
        self
    }

    fn spawn_reader<R>(
        reader: Option<R>,
        buffer: Arc<Mutex<CaptureBuffer>>,
        stream: &'static str,
        stage: String,
    ) -> Option<tokio::task::JoinHandle<()>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let reader = reader?;
        Some(tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(stage = %stage, "{stream}: {line}");
                if stream == "stderr" {
                    buffer.lock().push(format!("stderr: {line}"));
                } else {
                    buffer.lock().push(line);
                }
            }
        }))
    }
}

#[async_trait]
impl StageInvoker for ProcessInvoker {
    async fn invoke(&self, spec: &StageSpec) -> Invocation {
        let mut cmd = Command::new(&spec.command.program);
        cmd.args(&spec.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return Invocation::spawn_failed(format!(
                    "spawning '{}' for stage '{}': {err}",
                    spec.command, spec.name
                ));
            }
        };

        let buffer = Arc::new(Mutex::new(CaptureBuffer::new(self.capture_limit)));
        let stdout_task = Self::spawn_reader(
            child.stdout.take(),
            Arc::clone(&buffer),
            "stdout",
            spec.name.to_string(),
        );
        let stderr_task = Self::spawn_reader(
            child.stderr.take(),
            Arc::clone(&buffer),
            "stderr",
            spec.name.to_string(),
        );

        let exit = match tokio::time::timeout(spec.timeout, child.wait()).await {
            Ok(Ok(status)) => InvocationExit::Completed(status.code().unwrap_or(-1)),
            Ok(Err(err)) => InvocationExit::SpawnFailed(format!(
                "waiting for stage '{}' process: {err}",
                spec.name
            )),
            Err(_) => {
                warn!(
                    stage = %spec.name,
                    timeout_secs = spec.timeout.as_secs(),
                    "stage timed out, killing process"
                );
                if let Err(err) = child.start_kill() {
                    warn!(stage = %spec.name, error = %err, "failed to kill timed-out process");
                }
                // Reap so the kill completes before we return.
                let _ = child.wait().await;
                InvocationExit::TimedOut
            }
        };

        // The pipes close once the child is gone, so the readers finish.
        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        let output = buffer.lock().render();
        Invocation { exit, output }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{OutputLocator, StageCommand, StageName};
    use std::path::PathBuf;
    use std::time::Duration;

    fn spec_for(program: &str, args: &[&str], timeout: Duration) -> StageSpec {
        StageSpec::new(
            StageName::Generate,
            StageCommand::new(program).with_args(args.iter().copied()),
            OutputLocator::Directory {
                path: PathBuf::from("unused"),
                extension: "json".to_string(),
            },
        )
        .with_timeout(timeout)
    }

    #[test]
    fn test_capture_buffer_keeps_newest_with_marker() {
        let mut buffer = CaptureBuffer::new(16);
        buffer.push("first line that is long".to_string());
        buffer.push("second".to_string());
        buffer.push("third".to_string());

        let rendered = buffer.render();
        assert!(rendered.starts_with("[earlier output dropped]\n"));
        assert!(rendered.contains("third"));
        assert!(!rendered.contains("first line"));
    }

    #[test]
    fn test_capture_buffer_no_marker_under_limit() {
        let mut buffer = CaptureBuffer::new(1024);
        buffer.push("hello".to_string());
        assert_eq!(buffer.render(), "hello\n");
    }

    #[tokio::test]
    async fn test_invoke_captures_output_and_exit_zero() {
        let invoker = ProcessInvoker::new();
        let spec = spec_for("sh", &["-c", "echo hello"], Duration::from_secs(10));

        let invocation = invoker.invoke(&spec).await;
        assert_eq!(invocation.exit, InvocationExit::Completed(0));
        assert!(invocation.output.contains("hello"));
    }

    #[tokio::test]
    async fn test_invoke_nonzero_exit() {
        let invoker = ProcessInvoker::new();
        let spec = spec_for("sh", &["-c", "echo boom >&2; exit 3"], Duration::from_secs(10));

        let invocation = invoker.invoke(&spec).await;
        assert_eq!(invocation.exit, InvocationExit::Completed(3));
        assert!(invocation.output.contains("stderr: boom"));
    }

    #[tokio::test]
    async fn test_invoke_timeout_kills_process() {
        let invoker = ProcessInvoker::new();
        let spec = spec_for("sh", &["-c", "sleep 30"], Duration::from_millis(100));

        let invocation = invoker.invoke(&spec).await;
        assert_eq!(invocation.exit, InvocationExit::TimedOut);
    }

    #[tokio::test]
    async fn test_invoke_spawn_failure() {
        let invoker = ProcessInvoker::new();
        let spec = spec_for("definitely-not-a-real-binary", &[], Duration::from_secs(1));

        let invocation = invoker.invoke(&spec).await;
        assert!(matches!(invocation.exit, InvocationExit::SpawnFailed(_)));
    }
}
