//! Optional alignment of uncompressed dex jars.

use crate::action::{ActionKind, BuildAction, ExecStrategy};
use crate::rules;
use dexer_common::{ArtifactPath, DexerResult, InternalError};
use dexer_config::Toolchain;

/// The module's visible artifact after post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignResult {
    /// The artifact other modules see.
    pub final_output: ArtifactPath,
    /// The chained alignment action, when one was needed.
    pub action: Option<BuildAction>,
}

/// Chains an alignment action after `dex` when uncompressed output is required.
///
/// Uncompressed dex entries are aligned so the runtime can map them directly.
/// When alignment is chained, `aligned_output` replaces the dex action's
/// output as the final artifact; otherwise the dex output is final.
pub fn maybe_align(
    toolchain: &Toolchain,
    dex: &BuildAction,
    require_uncompressed: bool,
    aligned_output: ArtifactPath,
) -> DexerResult<AlignResult> {
    if !require_uncompressed {
        return Ok(AlignResult {
            final_output: dex.output.clone(),
            action: None,
        });
    }
    if aligned_output == dex.output {
        return Err(InternalError::new(format!(
            "aligned output '{aligned_output}' would overwrite its own input"
        )));
    }

    let action = BuildAction {
        kind: ActionKind::ZipAlign,
        description: "zipalign".to_string(),
        steps: rules::zipalign_steps(toolchain, &dex.output, &aligned_output),
        flags: Vec::new(),
        input: dex.output.clone(),
        output: aligned_output.clone(),
        implicit_outputs: Vec::new(),
        implicit_inputs: Vec::new(),
        tool_deps: vec![toolchain.zipalign_cmd.clone()],
        depfile: None,
        strategy: ExecStrategy::Local,
    };
    tracing::debug!(output = %aligned_output, "chained alignment");

    Ok(AlignResult {
        final_output: aligned_output,
        action: Some(action),
    })
}
