//! Static stage descriptors built from configuration at process start.

use super::StageName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How a stage's external collaborator is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

impl StageCommand {
    /// Creates a new stage command.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends multiple arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Where a stage's expected output is checked after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLocator {
    /// A directory expected to contain at least one non-empty file with the
    /// given extension.
    Directory {
        /// Directory to scan.
        path: PathBuf,
        /// File extension filter, without the leading dot.
        extension: String,
    },
    /// A single file expected to exist and be non-empty. Used by the upload
    /// stage, whose collaborator writes a platform receipt rather than
    /// media artifacts.
    File {
        /// Expected file path.
        path: PathBuf,
    },
}

impl fmt::Display for OutputLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory { path, extension } => {
                write!(f, "{}/*.{extension}", path.display())
            }
            Self::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Static descriptor for one pipeline stage.
///
/// Immutable; built once from configuration and handed by reference to the
/// stage runner, validator, and retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Stage name.
    pub name: StageName,
    /// External entry point.
    pub command: StageCommand,
    /// Expected-output locator checked after a tentatively successful run.
    pub output: OutputLocator,
    /// Maximum retry count; the stage runs at most `max_retries + 1` times.
    pub max_retries: usize,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl StageSpec {
    /// Creates a new stage spec.
    #[must_use]
    pub fn new(name: StageName, command: StageCommand, output: OutputLocator) -> Self {
        Self {
            name,
            command,
            output,
            max_retries: 2,
            timeout: Duration::from_secs(300),
        }
    }

    /// Sets the maximum retry count.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_command_display() {
        let cmd = StageCommand::new("python")
            .with_arg("generate_prompts.py")
            .with_args(["--topic", "space"]);
        assert_eq!(cmd.to_string(), "python generate_prompts.py --topic space");
    }

    #[test]
    fn test_output_locator_display() {
        let dir = OutputLocator::Directory {
            path: PathBuf::from("data/rendered_clips"),
            extension: "mp4".to_string(),
        };
        assert_eq!(dir.to_string(), "data/rendered_clips/*.mp4");

        let file = OutputLocator::File {
            path: PathBuf::from("data/upload_receipts/receipt.json"),
        };
        assert_eq!(file.to_string(), "data/upload_receipts/receipt.json");
    }

    #[test]
    fn test_stage_spec_builder() {
        let spec = StageSpec::new(
            StageName::Render,
            StageCommand::new("render"),
            OutputLocator::Directory {
                path: PathBuf::from("out"),
                extension: "mp4".to_string(),
            },
        )
        .with_max_retries(5)
        .with_timeout(Duration::from_secs(60));

        assert_eq!(spec.name, StageName::Render);
        assert_eq!(spec.max_retries, 5);
        assert_eq!(spec.timeout, Duration::from_secs(60));
    }
}
