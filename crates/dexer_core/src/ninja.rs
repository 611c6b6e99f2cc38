//! Ninja rendering of planned actions.

use crate::action::BuildAction;
use crate::graph::ActionGraph;
use dexer_common::{ArtifactPath, DexerResult, InternalError};
use std::fmt::Write;

/// Escapes a value on the right-hand side of a ninja binding.
fn escape_value(value: &str) -> String {
    value.replace('$', "$$").replace('\n', "$\n")
}

/// Escapes a path in a `build` line.
fn escape_path(path: &ArtifactPath) -> String {
    path.as_str()
        .replace('$', "$$")
        .replace(' ', "$ ")
        .replace(':', "$:")
}

fn join_paths<'a>(paths: impl IntoIterator<Item = &'a ArtifactPath>) -> String {
    paths
        .into_iter()
        .map(escape_path)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accumulates ninja `rule` and `build` statements.
///
/// Every action gets its own rule, named after its kind and fingerprint, so
/// the fully expanded command sits in the rule and identical actions from
/// different runs produce identical text.
#[derive(Debug, Default)]
pub struct NinjaWriter {
    out: String,
}

impl NinjaWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes every action of `graph`, producers first.
    pub fn write_graph(&mut self, graph: &ActionGraph) -> DexerResult<()> {
        for action in graph.ordered()? {
            self.write_action(action)?;
        }
        Ok(())
    }

    /// Writes one rule and its build statement.
    pub fn write_action(&mut self, action: &BuildAction) -> DexerResult<()> {
        let fingerprint = action.fingerprint().to_string();
        let rule = format!("{}_{}", action.kind.rule_name(), &fingerprint[..12]);
        self.emit(action, &rule)
            .map_err(|e| InternalError::new(format!("formatting ninja output: {e}")))
    }

    fn emit(&mut self, action: &BuildAction, rule: &str) -> std::fmt::Result {
        let out = &mut self.out;
        if !out.is_empty() {
            out.push('\n');
        }
        writeln!(out, "rule {rule}")?;
        writeln!(out, "  command = {}", escape_value(&action.command_line()))?;
        writeln!(
            out,
            "  description = {} {}",
            escape_value(&action.description),
            escape_value(action.output.as_str())
        )?;
        if let Some(depfile) = &action.depfile {
            writeln!(out, "  depfile = {}", escape_value(depfile.path.as_str()))?;
            writeln!(out, "  deps = {}", depfile.format.as_str())?;
        }

        write!(out, "build {}", escape_path(&action.output))?;
        if !action.implicit_outputs.is_empty() {
            write!(out, " | {}", join_paths(&action.implicit_outputs))?;
        }
        write!(out, ": {rule} {}", escape_path(&action.input))?;
        let implicit = join_paths(action.implicit_inputs.iter().chain(&action.tool_deps));
        if !implicit.is_empty() {
            write!(out, " | {implicit}")?;
        }
        out.push('\n');
        Ok(())
    }

    /// Returns the rendered text.
    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, Depfile, DepsFormat, ExecStrategy};

    fn r8() -> BuildAction {
        BuildAction {
            kind: ActionKind::R8,
            description: "r8".into(),
            steps: vec!["mkdir -p $(dirname out/usage/unused.txt)".into()],
            flags: vec![],
            input: "out/classes.jar".into(),
            output: "out/dex/javalib.jar".into(),
            implicit_outputs: vec!["out/proguard_dictionary".into()],
            implicit_inputs: vec!["boot/a.jar".into()],
            tool_deps: vec!["prebuilts/r8/r8".into()],
            depfile: Some(Depfile {
                path: "out/dex/javalib.jar.d".into(),
                format: DepsFormat::Gcc,
            }),
            strategy: ExecStrategy::Local,
        }
    }

    #[test]
    fn escapes() {
        assert_eq!(escape_value("$(dirname x)"), "$$(dirname x)");
        assert_eq!(escape_path(&"c:/a b$".into()), "c$:/a$ b$$");
    }

    #[test]
    fn renders_rule_and_build() {
        let mut writer = NinjaWriter::new();
        writer.write_action(&r8()).unwrap();
        let text = writer.finish();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("rule r8_"));
        assert_eq!(lines[1], "  command = mkdir -p $$(dirname out/usage/unused.txt)");
        assert_eq!(lines[2], "  description = r8 out/dex/javalib.jar");
        assert_eq!(lines[3], "  depfile = out/dex/javalib.jar.d");
        assert_eq!(lines[4], "  deps = gcc");
        let rule = lines[0].trim_start_matches("rule ");
        assert_eq!(
            lines[5],
            format!(
                "build out/dex/javalib.jar | out/proguard_dictionary: {rule} out/classes.jar \
                 | boot/a.jar prebuilts/r8/r8"
            )
        );
    }

    #[test]
    fn identical_actions_render_identically() {
        let mut a = NinjaWriter::new();
        a.write_action(&r8()).unwrap();
        let mut b = NinjaWriter::new();
        b.write_action(&r8()).unwrap();
        assert_eq!(a.finish(), b.finish());
    }
}
