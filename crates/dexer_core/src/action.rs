//! Build-action descriptors handed to the build-graph engine.

use dexer_common::{ArtifactPath, ContentHash};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Which command an action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Plain dex compilation.
    D8,
    /// Optimizer dex compilation.
    R8,
    /// Archive alignment of an uncompressed dex jar.
    ZipAlign,
}

impl ActionKind {
    /// The rule name used for this kind of action.
    pub fn rule_name(self) -> &'static str {
        match self {
            ActionKind::D8 => "d8",
            ActionKind::R8 => "r8",
            ActionKind::ZipAlign => "zipalign",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_name())
    }
}

/// Format of a tool-generated dependency file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepsFormat {
    /// Makefile-style `out: dep dep ...`, as written by gcc `-MD`.
    Gcc,
}

impl DepsFormat {
    /// Name of the format in ninja's `deps =` binding.
    pub fn as_str(self) -> &'static str {
        match self {
            DepsFormat::Gcc => "gcc",
        }
    }
}

/// A dependency file the tool writes while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Depfile {
    /// Where the tool writes it.
    pub path: ArtifactPath,
    /// How the engine should parse it.
    pub format: DepsFormat,
}

/// Parameters of one remotely executed command.
///
/// Maps are ordered so the rendered wrapper prefix is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteParams {
    /// Labels describing the command to the remote-execution service.
    pub labels: BTreeMap<String, String>,
    /// Files and directories uploaded as inputs.
    pub inputs: Vec<String>,
    /// Files downloaded after the command finishes.
    pub output_files: Vec<String>,
    /// `local`, `remote`, `racing`, ...
    pub exec_strategy: String,
    /// Inputs that belong to the execution toolchain.
    pub toolchain_inputs: Vec<String>,
    /// Worker platform properties.
    pub platform: BTreeMap<String, String>,
}

impl RemoteParams {
    /// Renders the wrapper prefix placed in front of the remote command.
    ///
    /// The result ends with `-- ` so the wrapped command can be appended
    /// directly.
    pub fn wrapper_prefix(&self, rewrapper: &ArtifactPath) -> String {
        let pairs = |map: &BTreeMap<String, String>| {
            map.iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut out = format!("{rewrapper}");
        if !self.labels.is_empty() {
            out.push_str(&format!(" --labels={}", pairs(&self.labels)));
        }
        out.push_str(&format!(" --exec_strategy={}", self.exec_strategy));
        if !self.inputs.is_empty() {
            out.push_str(&format!(" --inputs={}", self.inputs.join(",")));
        }
        if !self.output_files.is_empty() {
            out.push_str(&format!(" --output_files={}", self.output_files.join(",")));
        }
        if !self.toolchain_inputs.is_empty() {
            out.push_str(&format!(
                " --toolchain_inputs={}",
                self.toolchain_inputs.join(",")
            ));
        }
        if !self.platform.is_empty() {
            out.push_str(&format!(" --platform={}", pairs(&self.platform)));
        }
        out.push_str(" -- ");
        out
    }
}

/// Remote parameters for each wrapped stage of a dex action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteExecution {
    /// The dexer or optimizer invocation.
    pub tool: RemoteParams,
    /// Collecting the dex files into `classes.dex.jar`.
    pub archive: RemoteParams,
    /// Zipping the usage report. Optimizer only.
    pub usage_archive: Option<RemoteParams>,
}

/// How an action is executed.
///
/// Local and remote variants of the same action run the same commands and
/// declare the same outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecStrategy {
    /// Every stage runs on the local machine.
    Local,
    /// Some stages are wrapped for remote execution.
    Remote(RemoteExecution),
}

impl ExecStrategy {
    /// Whether any stage runs remotely.
    pub fn is_remote(&self) -> bool {
        matches!(self, ExecStrategy::Remote(_))
    }
}

/// One declarative build action.
///
/// The engine runs `steps` in order, stopping at the first failure. An action
/// either produces every declared output or none of them count as valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildAction {
    /// Which command this is.
    pub kind: ActionKind,
    /// Short status-line description.
    pub description: String,
    /// Shell commands, run in order.
    pub steps: Vec<String>,
    /// The tool flags derived for this action, in order.
    pub flags: Vec<String>,
    /// The primary input.
    pub input: ArtifactPath,
    /// The primary output.
    pub output: ArtifactPath,
    /// Additional outputs the action always produces.
    pub implicit_outputs: Vec<ArtifactPath>,
    /// Additional files the command reads.
    pub implicit_inputs: Vec<ArtifactPath>,
    /// The tool binaries the command runs.
    pub tool_deps: Vec<ArtifactPath>,
    /// Dependency file written by the tool, if any.
    pub depfile: Option<Depfile>,
    /// Execution strategy.
    pub strategy: ExecStrategy,
}

impl BuildAction {
    /// The full shell command.
    pub fn command_line(&self) -> String {
        self.steps.join(" && ")
    }

    /// The primary output followed by the implicit outputs.
    pub fn outputs(&self) -> impl Iterator<Item = &ArtifactPath> {
        std::iter::once(&self.output).chain(&self.implicit_outputs)
    }

    /// Every file the action reads: the primary input, implicit inputs and
    /// tool binaries.
    pub fn inputs(&self) -> impl Iterator<Item = &ArtifactPath> {
        std::iter::once(&self.input)
            .chain(&self.implicit_inputs)
            .chain(&self.tool_deps)
    }

    /// A stable hash of what this action runs and touches.
    pub fn fingerprint(&self) -> ContentHash {
        let command = self.command_line();
        let kind = self.kind.rule_name();
        let fields = [kind, command.as_str()]
            .into_iter()
            .chain(self.inputs().map(ArtifactPath::as_str))
            .chain(self.outputs().map(ArtifactPath::as_str));
        ContentHash::from_fields(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RemoteParams {
        RemoteParams {
            labels: BTreeMap::from([
                ("type".to_string(), "compile".to_string()),
                ("compiler".to_string(), "d8".to_string()),
            ]),
            inputs: vec!["prebuilts/r8/r8.jar".into()],
            output_files: vec![],
            exec_strategy: "remote".into(),
            toolchain_inputs: vec!["prebuilts/jdk/bin/java".into()],
            platform: BTreeMap::from([("Pool".to_string(), "java16".to_string())]),
        }
    }

    fn action() -> BuildAction {
        BuildAction {
            kind: ActionKind::D8,
            description: "d8".into(),
            steps: vec!["rm -rf \"out/dex\"".into(), "mkdir -p \"out/dex\"".into()],
            flags: vec!["--min-api 21".into()],
            input: "out/classes.jar".into(),
            output: "out/dex/javalib.jar".into(),
            implicit_outputs: vec![],
            implicit_inputs: vec!["boot/a.jar".into()],
            tool_deps: vec!["prebuilts/r8/d8".into()],
            depfile: None,
            strategy: ExecStrategy::Local,
        }
    }

    #[test]
    fn wrapper_prefix_is_sorted() {
        let prefix = params().wrapper_prefix(&ArtifactPath::new("rewrapper"));
        assert_eq!(
            prefix,
            "rewrapper --labels=compiler=d8,type=compile --exec_strategy=remote \
             --inputs=prebuilts/r8/r8.jar --toolchain_inputs=prebuilts/jdk/bin/java \
             --platform=Pool=java16 -- "
        );
    }

    #[test]
    fn command_line_joins_steps() {
        assert_eq!(
            action().command_line(),
            "rm -rf \"out/dex\" && mkdir -p \"out/dex\""
        );
    }

    #[test]
    fn inputs_and_outputs() {
        let a = action();
        let inputs: Vec<&str> = a.inputs().map(ArtifactPath::as_str).collect();
        assert_eq!(inputs, vec!["out/classes.jar", "boot/a.jar", "prebuilts/r8/d8"]);
        assert_eq!(a.outputs().count(), 1);
    }

    #[test]
    fn fingerprint_tracks_command() {
        let a = action();
        let mut b = action();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.steps.push("true".into());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn strategy_serializes_tagged() {
        let json = serde_json::to_value(ExecStrategy::Local).unwrap();
        assert_eq!(json["type"], "local");
    }
}
