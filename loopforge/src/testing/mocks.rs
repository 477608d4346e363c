//! Scripted invoker and collecting channel used throughout the test suite.

use crate::notify::{Channel, ChannelError, NotificationEvent};
use crate::stages::{Invocation, StageInvoker, StageName, StageSpec};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// A stage invoker that replays scripted invocation outcomes per stage and
/// records call counts.
///
/// Scripted outcomes are consumed front-to-back; when a stage's script runs
/// out, the per-stage fallback (or a clean empty exit) is returned.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    scripts: Mutex<HashMap<StageName, VecDeque<Invocation>>>,
    fallbacks: Mutex<HashMap<StageName, Invocation>>,
    calls: Mutex<HashMap<StageName, usize>>,
}

impl ScriptedInvoker {
    /// Creates a new scripted invoker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one invocation outcome for the stage.
    pub fn script(&self, stage: StageName, invocation: Invocation) {
        self.scripts
            .lock()
            .entry(stage)
            .or_default()
            .push_back(invocation);
    }

    /// Sets the outcome returned once the stage's script is exhausted.
    pub fn set_fallback(&self, stage: StageName, invocation: Invocation) {
        self.fallbacks.lock().insert(stage, invocation);
    }

    /// Returns how many times the stage was invoked.
    #[must_use]
    pub fn call_count(&self, stage: StageName) -> usize {
        self.calls.lock().get(&stage).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StageInvoker for ScriptedInvoker {
    async fn invoke(&self, spec: &StageSpec) -> Invocation {
        *self.calls.lock().entry(spec.name).or_insert(0) += 1;
        if let Some(scripted) = self
            .scripts
            .lock()
            .get_mut(&spec.name)
            .and_then(VecDeque::pop_front)
        {
            return scripted;
        }
        self.fallbacks
            .lock()
            .get(&spec.name)
            .cloned()
            .unwrap_or_else(|| Invocation::completed(0, ""))
    }
}

/// A channel that records every event it sees, optionally failing delivery.
#[derive(Debug)]
pub struct CollectingChannel {
    name: String,
    fail: bool,
    events: Mutex<Vec<NotificationEvent>>,
}

impl CollectingChannel {
    /// Creates a channel that records and delivers successfully.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail: false,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Creates a channel that records but reports delivery failure.
    #[must_use]
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail: true,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().clone()
    }

    /// Returns just the recorded event kinds, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<crate::notify::EventKind> {
        self.events.lock().iter().map(|event| event.kind).collect()
    }
}

#[async_trait]
impl Channel for CollectingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), ChannelError> {
        self.events.lock().push(event.clone());
        if self.fail {
            Err(ChannelError::Transport("synthetic delivery failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{InvocationExit, OutputLocator, StageCommand};
    use std::path::PathBuf;

    fn spec(stage: StageName) -> StageSpec {
        StageSpec::new(
            stage,
            StageCommand::new("unused"),
            OutputLocator::Directory {
                path: PathBuf::from("unused"),
                extension: "mp4".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_scripted_outcomes_consumed_in_order() {
        let invoker = ScriptedInvoker::new();
        invoker.script(StageName::Render, Invocation::completed(1, "first"));
        invoker.script(StageName::Render, Invocation::completed(0, "second"));

        let first = invoker.invoke(&spec(StageName::Render)).await;
        let second = invoker.invoke(&spec(StageName::Render)).await;
        assert_eq!(first.exit, InvocationExit::Completed(1));
        assert_eq!(second.exit, InvocationExit::Completed(0));
        assert_eq!(invoker.call_count(StageName::Render), 2);
    }

    #[tokio::test]
    async fn test_fallback_after_script_exhausted() {
        let invoker = ScriptedInvoker::new();
        invoker.set_fallback(StageName::Upload, Invocation::timed_out("stuck"));

        let invocation = invoker.invoke(&spec(StageName::Upload)).await;
        assert_eq!(invocation.exit, InvocationExit::TimedOut);
    }
}
