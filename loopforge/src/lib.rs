//! # LoopForge
//!
//! A Rust port of the LoopForge content pipeline orchestrator.
//!
//! LoopForge automates a four-stage pipeline for short looping videos:
//! prompt generation, rendering, post-processing, and upload. Each stage is
//! an external collaborator invoked as an independent process; this crate
//! is the orchestration core that sequences them, validates their output
//! artifacts, retries transient failures, and dispatches multi-channel
//! alerts.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use loopforge::prelude::*;
//! use std::sync::Arc;
//!
//! let config = Arc::new(LoopForgeConfig::from_file("config/config.json")?);
//! let runner = StageRunner::new(Arc::new(ProcessInvoker::new()), run_log);
//! let policy = RetryPolicy::new(runner, RetryConfig::default());
//! let notifier = Notifier::from_config(&config.notifications);
//!
//! let orchestrator = Orchestrator::new(config, policy, notifier);
//! let summary = orchestrator.run_pipeline(&StageName::FULL_ORDER).await;
//! std::process::exit(summary.exit_code);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod errors;
pub mod notify;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        ApiKeys, EmailConfig, LoopForgeConfig, NotificationsConfig, PathsConfig, StageOptions,
        StagesConfig, WebhookConfig,
    };
    pub use crate::errors::LoopForgeError;
    pub use crate::notify::{
        Channel, ChannelError, DeliveryOutcome, DiscordChannel, EmailChannel, EventKind,
        NotificationEvent, Notifier, SlackChannel,
    };
    pub use crate::pipeline::{
        BackoffStrategy, Orchestrator, RetryConfig, RetryPolicy, RunLog, RunStatus, RunSummary,
        StageRunner,
    };
    pub use crate::stages::{
        FailureClass, Invocation, InvocationExit, OutputLocator, ProcessInvoker, StageCommand,
        StageInvoker, StageName, StageResult, StageSpec, StageStatus,
    };
}
