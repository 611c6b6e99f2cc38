//! Command templates for the dex, optimizer and alignment rules.
//!
//! Both dex rules share one three-stage shape: strip stale dex entries from
//! the input, run the tool into a scratch directory, then re-archive the
//! produced dex files together with the input's non-class resources. Only the
//! middle stage differs between the pipelines.

use crate::action::RemoteParams;
use crate::context::RemoteConfig;
use crate::selector::Pipeline;
use dexer_common::ArtifactPath;
use dexer_config::Toolchain;
use std::collections::BTreeMap;

/// Joins the non-empty parts of a command with single spaces.
fn command(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Paths shared by both dex rules.
#[derive(Debug, Clone)]
pub struct DexLayout {
    /// The classes jar being dexed.
    pub input: ArtifactPath,
    /// The final dex jar.
    pub output: ArtifactPath,
    /// Scratch directory the tool writes dex files into.
    pub out_dir: ArtifactPath,
    /// The input with its dex entries stripped.
    pub tmp_jar: ArtifactPath,
}

impl DexLayout {
    /// The intermediate archive holding only the produced dex files.
    pub fn classes_dex_jar(&self) -> ArtifactPath {
        self.out_dir.join("classes.dex.jar")
    }
}

/// Paths only the optimizer rule uses.
#[derive(Debug, Clone)]
pub struct OptimizerLayout {
    /// The mapping dictionary.
    pub dictionary: ArtifactPath,
    /// Scratch directory for the usage report.
    pub usage_dir: ArtifactPath,
    /// The usage report itself, nested under `usage_dir`.
    pub usage: ArtifactPath,
    /// Zipped usage report.
    pub usage_zip: ArtifactPath,
    /// Dependency file written by the optimizer.
    pub depfile: ArtifactPath,
}

/// Archive flags for the re-archive and merge stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipFlags {
    /// Flags for collecting the dex files.
    pub zip: String,
    /// Flags for the final merge.
    pub merge: String,
}

impl ZipFlags {
    /// Builds the archive flags from the module's output toggles.
    pub fn new(uncompress_dex: bool, exclude_kotlinc_generated_files: bool) -> Self {
        let mut zip = "--ignore_missing_files".to_string();
        if uncompress_dex {
            zip.push_str(" -L 0");
        }
        let merge = if exclude_kotlinc_generated_files {
            "-stripFile META-INF/*.kotlin_module -stripFile **/*.kotlin_builtins".to_string()
        } else {
            String::new()
        };
        Self { zip, merge }
    }
}

/// Wrapper prefixes for the remotely executed stages. Empty strings run the
/// stage locally.
#[derive(Debug, Clone, Default)]
pub struct Wrappers {
    /// Prefix for the tool invocation.
    pub tool: String,
    /// Prefix for collecting the dex files.
    pub archive: String,
    /// Prefix for zipping the usage report.
    pub usage_archive: String,
}

fn strip_dex_steps(toolchain: &Toolchain, layout: &DexLayout) -> [String; 2] {
    [
        format!("mkdir -p $(dirname {})", layout.tmp_jar),
        command(&[
            toolchain.zip2zip_cmd.as_str(),
            "-i",
            layout.input.as_str(),
            "-o",
            layout.tmp_jar.as_str(),
            "-x",
            "'**/*.dex'",
        ]),
    ]
}

fn rearchive_steps(
    toolchain: &Toolchain,
    layout: &DexLayout,
    zip: &ZipFlags,
    archive_wrapper: &str,
) -> [String; 2] {
    let classes_dex_jar = layout.classes_dex_jar();
    let dex_glob = format!("\"{}/classes*.dex\"", layout.out_dir);
    let soong_zip = format!("{archive_wrapper}{}", toolchain.soong_zip_cmd);
    [
        command(&[
            &soong_zip,
            &zip.zip,
            "-o",
            classes_dex_jar.as_str(),
            "-C",
            layout.out_dir.as_str(),
            "-f",
            &dex_glob,
        ]),
        command(&[
            toolchain.merge_zips_cmd.as_str(),
            "-D",
            "-stripFile",
            "\"**/*.class\"",
            &zip.merge,
            layout.output.as_str(),
            classes_dex_jar.as_str(),
            layout.input.as_str(),
        ]),
    ]
}

/// Renders the plain dexer command.
pub fn d8_steps(
    toolchain: &Toolchain,
    layout: &DexLayout,
    flags: &str,
    zip: &ZipFlags,
    wrappers: &Wrappers,
) -> Vec<String> {
    let mut steps = vec![
        format!("rm -rf \"{}\"", layout.out_dir),
        format!("mkdir -p \"{}\"", layout.out_dir),
    ];
    steps.extend(strip_dex_steps(toolchain, layout));

    let d8 = format!("{}{}", wrappers.tool, toolchain.d8_cmd);
    let tool_flags = toolchain.d8_flags.join(" ");
    steps.push(command(&[
        &d8,
        &tool_flags,
        "--output",
        layout.out_dir.as_str(),
        flags,
        layout.tmp_jar.as_str(),
    ]));

    steps.extend(rearchive_steps(toolchain, layout, zip, &wrappers.archive));
    steps
}

/// Renders the optimizer command.
///
/// The dictionary and usage report are touched after the optimizer runs so
/// both exist even when it writes nothing.
pub fn r8_steps(
    toolchain: &Toolchain,
    layout: &DexLayout,
    opt: &OptimizerLayout,
    flags: &str,
    zip: &ZipFlags,
    wrappers: &Wrappers,
) -> Vec<String> {
    let mut steps = vec![
        format!("rm -rf \"{}\"", layout.out_dir),
        format!("mkdir -p \"{}\"", layout.out_dir),
        format!("rm -f \"{}\"", opt.dictionary),
        format!("rm -rf \"{}\"", opt.usage_dir),
        format!("mkdir -p $(dirname {})", opt.usage),
    ];
    steps.extend(strip_dex_steps(toolchain, layout));

    let r8 = format!("{}{}", wrappers.tool, toolchain.r8_cmd);
    let tool_flags = toolchain.r8_flags.join(" ");
    steps.push(command(&[
        &r8,
        &tool_flags,
        "-injars",
        layout.tmp_jar.as_str(),
        "--output",
        layout.out_dir.as_str(),
        "--no-data-resources",
        "-printmapping",
        opt.dictionary.as_str(),
        "-printusage",
        opt.usage.as_str(),
        "--deps-file",
        opt.depfile.as_str(),
        flags,
    ]));
    steps.push(format!("touch \"{}\" \"{}\"", opt.dictionary, opt.usage));

    let usage_zip = format!("{}{}", wrappers.usage_archive, toolchain.soong_zip_cmd);
    steps.push(command(&[
        &usage_zip,
        "-o",
        opt.usage_zip.as_str(),
        "-C",
        opt.usage_dir.as_str(),
        "-f",
        opt.usage.as_str(),
    ]));
    steps.push(format!("rm -rf {}", opt.usage_dir));

    steps.extend(rearchive_steps(toolchain, layout, zip, &wrappers.archive));
    steps
}

/// Renders the alignment command.
///
/// Already-aligned archives are copied unchanged.
pub fn zipalign_steps(
    toolchain: &Toolchain,
    input: &ArtifactPath,
    output: &ArtifactPath,
) -> Vec<String> {
    let zipalign = &toolchain.zipalign_cmd;
    vec![format!(
        "if ! {zipalign} -c -p 4 {input} >/dev/null; then {zipalign} -f -p 4 {input} {output}; else cp -f {input} {output}; fi"
    )]
}

/// The binaries each rule runs, declared so a rebuilt tool reruns the action.
pub fn tool_deps(toolchain: &Toolchain, pipeline: Pipeline, remote: bool) -> Vec<ArtifactPath> {
    let tool = match pipeline {
        Pipeline::Plain => &toolchain.d8_cmd,
        Pipeline::Optimize => &toolchain.r8_cmd,
    };
    let mut deps = vec![
        tool.clone(),
        toolchain.zip2zip_cmd.clone(),
        toolchain.soong_zip_cmd.clone(),
        toolchain.merge_zips_cmd.clone(),
    ];
    if remote {
        deps.push(toolchain.rewrapper_cmd.clone());
    }
    deps
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn pool(remote: &RemoteConfig) -> BTreeMap<String, String> {
    BTreeMap::from([("Pool".to_string(), remote.java_pool.clone())])
}

/// Remote parameters for the tool stage.
///
/// The optimizer uploads every implicit dependency, since its depfile can
/// name any of them.
pub fn tool_remote_params(
    toolchain: &Toolchain,
    remote: &RemoteConfig,
    pipeline: Pipeline,
    implicits: &[ArtifactPath],
    opt: Option<&OptimizerLayout>,
) -> RemoteParams {
    match pipeline {
        Pipeline::Plain => RemoteParams {
            labels: labels(&[("type", "compile"), ("compiler", "d8")]),
            inputs: vec![toolchain.d8_jar.to_string()],
            output_files: Vec::new(),
            exec_strategy: remote.d8_exec_strategy.clone(),
            toolchain_inputs: vec![toolchain.java_cmd.to_string()],
            platform: pool(remote),
        },
        Pipeline::Optimize => {
            let mut inputs: Vec<String> = implicits.iter().map(ArtifactPath::to_string).collect();
            inputs.push(toolchain.r8_jar.to_string());
            RemoteParams {
                labels: labels(&[("type", "compile"), ("compiler", "r8")]),
                inputs,
                output_files: opt.map(|o| vec![o.usage.to_string()]).unwrap_or_default(),
                exec_strategy: remote.r8_exec_strategy.clone(),
                toolchain_inputs: vec![toolchain.java_cmd.to_string()],
                platform: pool(remote),
            }
        }
    }
}

/// Remote parameters for a `soong_zip` stage reading `input` and writing
/// `output`.
pub fn zip_remote_params(
    toolchain: &Toolchain,
    remote: &RemoteConfig,
    pipeline: Pipeline,
    input: &ArtifactPath,
    output: &ArtifactPath,
) -> RemoteParams {
    let exec_strategy = match pipeline {
        Pipeline::Plain => remote.d8_exec_strategy.clone(),
        Pipeline::Optimize => remote.r8_exec_strategy.clone(),
    };
    RemoteParams {
        labels: labels(&[("type", "tool"), ("name", "soong_zip")]),
        inputs: vec![toolchain.soong_zip_cmd.to_string(), input.to_string()],
        output_files: vec![output.to_string()],
        exec_strategy,
        toolchain_inputs: Vec::new(),
        platform: pool(remote),
    }
}
