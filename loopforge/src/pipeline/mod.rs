//! The pipeline orchestration core.
//!
//! Composition order: [`Orchestrator`] iterates the requested stage subset
//! in fixed dependency order, asking [`RetryPolicy`] to run the
//! [`StageRunner`] for each stage; terminal success is confirmed by output
//! validation, and checkpoints are reported through the notifier.

mod orchestrator;
mod retry;
mod runlog;
mod runner;
mod validate;


pub use orchestrator::{Orchestrator, RunStatus, RunSummary};
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};
pub use runlog::RunLog;
pub use runner::StageRunner;
pub use validate::validate;
