//! Post-run output validation.
//!
//! A stage process exiting zero only proves the process ran; the artifacts
//! are the contract. Validation happens at the moment the stage runner
//! reports tentative success, and a miss is a terminal data-integrity
//! failure, not a transient one.

use crate::stages::{OutputLocator, StageSpec};
use std::path::Path;
use tracing::warn;

/// Confirms the stage's expected output exists and is non-empty.
#[must_use]
pub fn validate(spec: &StageSpec) -> bool {
    let ok = match &spec.output {
        OutputLocator::Directory { path, extension } => dir_has_artifacts(path, extension),
        OutputLocator::File { path } => file_non_empty(path),
    };
    if !ok {
        warn!(
            stage = %spec.name,
            expected = %spec.output,
            "no qualifying output artifacts after stage reported success"
        );
    }
    ok
}

/// Returns true if the directory holds at least one non-empty file with the
/// given extension.
fn dir_has_artifacts(dir: &Path, extension: &str) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && file_non_empty(&path) {
            return true;
        }
    }
    false
}

/// Returns true if the file exists and has a nonzero size.
fn file_non_empty(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
