//! Test doubles for the invocation and notification seams.

mod mocks;

pub use mocks::{CollectingChannel, ScriptedInvoker};
