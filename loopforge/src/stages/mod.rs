//! Stage descriptors, results, and the external invocation seam.

mod invoker;
mod result;
mod spec;

pub use invoker::{Invocation, InvocationExit, ProcessInvoker, StageInvoker, DEFAULT_CAPTURE_LIMIT};
pub use result::{FailureClass, StageResult, StageStatus};
pub use spec::{OutputLocator, StageCommand, StageSpec};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four pipeline stages, in fixed dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Prompt generation (LLM calls).
    Generate,
    /// Rendering (diffusion engine invocation).
    Render,
    /// Post-processing (media editing).
    Process,
    /// Upload (platform publishing).
    Upload,
}

impl StageName {
    /// The fixed pipeline execution order.
    pub const FULL_ORDER: [Self; 4] = [Self::Generate, Self::Render, Self::Process, Self::Upload];

    /// Returns the stage name as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Render => "render",
            Self::Process => "process",
            Self::Upload => "upload",
        }
    }

    /// Returns the position of this stage in the fixed order.
    #[must_use]
    pub fn order_index(&self) -> usize {
        match self {
            Self::Generate => 0,
            Self::Render => 1,
            Self::Process => 2,
            Self::Upload => 3,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(Self::Generate),
            "render" => Ok(Self::Render),
            "process" => Ok(Self::Process),
            "upload" => Ok(Self::Upload),
            other => Err(format!(
                "unknown stage '{other}' (expected generate, render, process, or upload)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_name_display() {
        assert_eq!(StageName::Generate.to_string(), "generate");
        assert_eq!(StageName::Render.to_string(), "render");
        assert_eq!(StageName::Process.to_string(), "process");
        assert_eq!(StageName::Upload.to_string(), "upload");
    }

    #[test]
    fn test_stage_name_from_str() {
        assert_eq!("render".parse::<StageName>(), Ok(StageName::Render));
        assert!("encode".parse::<StageName>().is_err());
    }

    #[test]
    fn test_full_order_is_sorted_by_index() {
        let indices: Vec<usize> = StageName::FULL_ORDER.iter().map(StageName::order_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_stage_name_serialize() {
        let json = serde_json::to_string(&StageName::Upload).unwrap();
        assert_eq!(json, r#""upload""#);
        let parsed: StageName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, StageName::Upload);
    }
}
