//! Run-scoped append-only log sink for captured stage diagnostics.

use crate::errors::LoopForgeError;
use crate::stages::StageName;
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Append-only sink that every stage attempt writes its captured output to,
/// regardless of outcome. Write failures are logged and suppressed; the log
/// never affects pipeline status.
#[derive(Debug, Clone)]
pub struct RunLog {
    inner: Option<Arc<Mutex<File>>>,
    path: Option<PathBuf>,
}

impl RunLog {
    /// Creates the log file for one run under `log_dir`.
    pub fn create(log_dir: &Path, run_id: Uuid) -> Result<Self, LoopForgeError> {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("run-{run_id}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            inner: Some(Arc::new(Mutex::new(file))),
            path: Some(path),
        })
    }

    /// Creates a disabled log that discards everything. Used in tests.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            inner: None,
            path: None,
        }
    }

    /// Returns the log file path, if the log is enabled.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends one attempt's captured diagnostics.
    pub fn append(&self, stage: StageName, attempt: usize, text: &str) {
        let Some(inner) = &self.inner else {
            return;
        };
        let mut file = inner.lock();
        let header = format!(
            "[{}] stage={stage} attempt={attempt}\n",
            Utc::now().to_rfc3339()
        );
        let entry = if text.is_empty() || text.ends_with('\n') {
            format!("{header}{text}")
        } else {
            format!("{header}{text}\n")
        };
        if let Err(err) = file.write_all(entry.as_bytes()) {
            warn!(stage = %stage, error = %err, "failed to append to run log");
        }
    }
}
