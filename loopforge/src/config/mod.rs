//! Process configuration, loaded once at startup from `config.json`.
//!
//! The document mirrors the original LoopForge layout: `api_keys`,
//! per-stage `paths`, `stages` entry points, and `notifications` channel
//! settings. The loaded value is immutable and passed by reference into the
//! orchestrator, stage runner, and notifier; there are no ambient globals,
//! so tests can run pipelines with distinct configurations in one process.

use crate::errors::LoopForgeError;
use crate::stages::{OutputLocator, StageCommand, StageName, StageSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// API credentials for the external collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// OpenAI API key, used by the generate stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    /// Anthropic API key, used by the generate stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
    /// YouTube upload credentials.
    #[serde(default)]
    pub youtube: HashMap<String, String>,
    /// TikTok upload credentials.
    #[serde(default)]
    pub tiktok: HashMap<String, String>,
}

/// Filesystem locations each stage consumes and produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where the generate stage writes prompt files.
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,
    /// Where the render stage writes clips.
    #[serde(default = "default_rendered_dir")]
    pub rendered_dir: PathBuf,
    /// Where the process stage writes finished videos.
    #[serde(default = "default_final_dir")]
    pub final_dir: PathBuf,
    /// Where the upload stage writes platform receipts.
    #[serde(default = "default_receipts_dir")]
    pub receipts_dir: PathBuf,
    /// Where run logs are appended.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("data/prompts_to_render")
}

fn default_rendered_dir() -> PathBuf {
    PathBuf::from("data/rendered_clips")
}

fn default_final_dir() -> PathBuf {
    PathBuf::from("data/ready_to_post")
}

fn default_receipts_dir() -> PathBuf {
    PathBuf::from("data/upload_receipts")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
            rendered_dir: default_rendered_dir(),
            final_dir: default_final_dir(),
            receipts_dir: default_receipts_dir(),
            log_dir: default_log_dir(),
        }
    }
}

/// Entry point and limits for one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOptions {
    /// Program to invoke. Required for a stage to be runnable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Arguments always passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
    /// Maximum retry count for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_max_retries() -> usize {
    2
}

fn default_timeout_seconds() -> u64 {
    300
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            max_retries: default_max_retries(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl StageOptions {
    /// Returns the per-attempt timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Per-stage entry point table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagesConfig {
    /// Generate stage options.
    #[serde(default)]
    pub generate: StageOptions,
    /// Render stage options.
    #[serde(default)]
    pub render: StageOptions,
    /// Process stage options.
    #[serde(default)]
    pub process: StageOptions,
    /// Upload stage options.
    #[serde(default)]
    pub upload: StageOptions,
}

impl StagesConfig {
    /// Returns the options for the given stage.
    #[must_use]
    pub fn options(&self, stage: StageName) -> &StageOptions {
        match stage {
            StageName::Generate => &self.generate,
            StageName::Render => &self.render,
            StageName::Process => &self.process,
            StageName::Upload => &self.upload,
        }
    }
}

/// E-mail notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Whether the channel is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP server hostname.
    #[serde(default)]
    pub smtp_server: String,
    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_user: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
    /// Sender address.
    #[serde(default)]
    pub from: String,
    /// Recipient addresses.
    #[serde(default)]
    pub to: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            smtp_user: String::new(),
            smtp_password: String::new(),
            from: String::new(),
            to: Vec::new(),
        }
    }
}

/// Webhook-style chat channel settings (Slack, Discord).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Whether the channel is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Webhook URL to post to.
    #[serde(default)]
    pub webhook_url: String,
}

/// Notification channel settings, each independently switchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// E-mail channel.
    #[serde(default)]
    pub email: EmailConfig,
    /// Slack webhook channel.
    #[serde(default)]
    pub slack: WebhookConfig,
    /// Discord webhook channel.
    #[serde(default)]
    pub discord: WebhookConfig,
}

/// The complete process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopForgeConfig {
    /// API credentials.
    #[serde(default)]
    pub api_keys: ApiKeys,
    /// Filesystem paths.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Per-stage entry points and limits.
    #[serde(default)]
    pub stages: StagesConfig,
    /// Notification channel settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl LoopForgeConfig {
    /// Loads the configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoopForgeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                LoopForgeError::config(format!(
                    "config file not found at {} (copy config.example.json and add your API keys)",
                    path.display()
                ))
            } else {
                LoopForgeError::Io(err)
            }
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Parses the configuration from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, LoopForgeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Checks that the configuration carries everything the given stage
    /// needs. Absence of a required key is fatal and never retried.
    pub fn ensure_stage(&self, stage: StageName) -> Result<(), LoopForgeError> {
        let options = self.stages.options(stage);
        if options.program.is_none() {
            return Err(LoopForgeError::config(format!(
                "no entry point configured for stage '{stage}' (stages.{stage}.program)"
            )));
        }
        match stage {
            StageName::Generate => {
                if self.api_keys.openai.is_none() && self.api_keys.anthropic.is_none() {
                    return Err(LoopForgeError::config(
                        "generate stage requires api_keys.openai or api_keys.anthropic",
                    ));
                }
            }
            StageName::Upload => {
                if self.api_keys.youtube.is_empty() && self.api_keys.tiktok.is_empty() {
                    return Err(LoopForgeError::config(
                        "upload stage requires api_keys.youtube or api_keys.tiktok credentials",
                    ));
                }
            }
            StageName::Render | StageName::Process => {}
        }
        Ok(())
    }

    /// Builds the immutable stage descriptor for one stage, appending any
    /// pass-through arguments from the caller.
    pub fn stage_spec(
        &self,
        stage: StageName,
        extra_args: &[String],
    ) -> Result<StageSpec, LoopForgeError> {
        self.ensure_stage(stage)?;
        let options = self.stages.options(stage);
        let program = options.program.as_deref().ok_or_else(|| {
            LoopForgeError::config(format!("no entry point configured for stage '{stage}'"))
        })?;
        let command = StageCommand::new(program)
            .with_args(options.args.iter().cloned())
            .with_args(extra_args.iter().cloned());

        let output = match stage {
            StageName::Generate => OutputLocator::Directory {
                path: self.paths.prompts_dir.clone(),
                extension: "json".to_string(),
            },
            StageName::Render => OutputLocator::Directory {
                path: self.paths.rendered_dir.clone(),
                extension: "mp4".to_string(),
            },
            StageName::Process => OutputLocator::Directory {
                path: self.paths.final_dir.clone(),
                extension: "mp4".to_string(),
            },
            // The upload collaborator has no local artifact in the render
            // sense; it writes the platform's returned post identifiers to
            // a receipt file, which is what gets validated.
            StageName::Upload => OutputLocator::File {
                path: self.paths.receipts_dir.join("upload_receipt.json"),
            },
        };

        Ok(StageSpec::new(stage, command, output)
            .with_max_retries(options.max_retries)
            .with_timeout(options.timeout()))
    }
}
