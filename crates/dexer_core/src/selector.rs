//! Tool selection: plain dexer or optimizer, local or remote.

use crate::context::BuildEnv;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The dexing pipeline a module goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// Plain dex compilation: no shrinking, no mapping dictionary.
    Plain,
    /// Shrink/optimize/obfuscate-capable optimizer, which also produces a
    /// mapping dictionary and a usage report.
    Optimize,
}

impl Pipeline {
    /// Name of the tool this pipeline invokes.
    pub fn tool_name(self) -> &'static str {
        match self {
            Pipeline::Plain => "d8",
            Pipeline::Optimize => "r8",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// The outcome of tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSelection {
    /// The selected pipeline.
    pub pipeline: Pipeline,
    /// Whether the tool runs through the remote-execution wrapper.
    ///
    /// Remote execution changes how the action runs, never what it produces.
    pub remote: bool,
}

/// Selects the pipeline and execution strategy for one module.
///
/// The optimizer is used exactly when `effective_optimize` is true. Remote
/// execution needs both the global switch and the per-tool switch.
pub fn select(effective_optimize: bool, env: &BuildEnv) -> ToolSelection {
    let (pipeline, tool_remote) = if effective_optimize {
        (Pipeline::Optimize, env.rbe_r8)
    } else {
        (Pipeline::Plain, env.rbe_d8)
    };
    let selection = ToolSelection {
        pipeline,
        remote: env.use_rbe && tool_remote,
    };
    tracing::debug!(pipeline = %selection.pipeline, remote = selection.remote, "selected dex tool");
    selection
}
