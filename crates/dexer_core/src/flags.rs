//! Flag derivation for the dexing tools.
//!
//! Every function here is pure: the same configuration, classpath and
//! environment always give the same flags in the same order. Flag order is
//! significant because both tools parse left to right, so nothing in this
//! module sorts or deduplicates.

use crate::context::{
    resolve_sdk_spec, BuildContext, BuildEnv, Classpath, DependencyTag, ExtraFlagFile,
    FlagFileOrigin, SdkResolver,
};
use crate::error::DexError;
use crate::selector::Pipeline;
use dexer_common::ArtifactPath;
use dexer_config::{ModuleDexConfig, Toolchain};
use serde::Serialize;

/// Legacy dexer flags the current dexer rejects. Removed from `dxflags`
/// without reordering the flags that survive.
pub const OBSOLETE_DX_FLAGS: &[&str] = &["--core-library", "--dex", "--multi-dex"];

/// An ordered flag list plus the files those flags make the tool read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlagSet {
    /// Command-line flags in the order the tool receives them.
    pub flags: Vec<String>,
    /// Files read because of these flags, in declaration order.
    pub deps: Vec<ArtifactPath>,
}

impl FlagSet {
    /// Creates an empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one flag.
    pub fn flag(&mut self, flag: impl Into<String>) {
        self.flags.push(flag.into());
    }

    /// Appends one dependency.
    pub fn dep(&mut self, path: ArtifactPath) {
        self.deps.push(path);
    }

    /// Appends `other`'s flags and dependencies after this set's own.
    pub fn extend(&mut self, other: FlagSet) {
        self.flags.extend(other.flags);
        self.deps.extend(other.deps);
    }

    /// The flags joined with single spaces, as they appear on a command line.
    pub fn joined(&self) -> String {
        self.flags.join(" ")
    }
}

/// Derives the flags shared by both pipelines.
///
/// Order: surviving `dxflags`, one `--main-dex-rules` pair per rule file,
/// the debug flags requested by the environment, then `--min-api`.
pub fn common_flags(
    config: &ModuleDexConfig,
    sdk: &dyn SdkResolver,
    env: &BuildEnv,
) -> Result<FlagSet, DexError> {
    let mut set = FlagSet::new();

    set.flags.extend(
        config
            .dxflags
            .iter()
            .filter(|f| !OBSOLETE_DX_FLAGS.contains(&f.as_str()))
            .cloned(),
    );

    for rules in &config.main_dex_rules {
        set.flag("--main-dex-rules");
        set.flag(rules.as_str());
        set.dep(rules.clone());
    }

    if env.no_optimize_dx {
        set.flag("--debug");
    }
    if env.generate_dex_debug {
        set.flag("--debug");
        set.flag("--verbose");
    }

    let level = resolve_sdk_spec(sdk, &config.min_sdk_version)?;
    set.flag(format!("--min-api {}", level.final_or_future_int()));

    Ok(set)
}

/// Derives the plain dexer's classpath flags.
///
/// Each boot classpath jar and then each extra classpath jar becomes one
/// `--lib <jar>` flag and one dependency.
pub fn d8_flags(classpath: &Classpath) -> FlagSet {
    let mut set = FlagSet::new();
    for jar in classpath.boot.iter().chain(&classpath.dex) {
        set.flag(format!("--lib {jar}"));
        set.dep(jar.clone());
    }
    set
}

/// Formats a classpath as a single `-libraryjars a:b:c` flag, or nothing
/// when the classpath is empty.
fn library_jars(jars: &[ArtifactPath]) -> Option<String> {
    if jars.is_empty() {
        return None;
    }
    let joined: Vec<&str> = jars.iter().map(ArtifactPath::as_str).collect();
    Some(format!("-libraryjars {}", joined.join(":")))
}

/// Derives the optimizer's flags.
///
/// `proguard_raise` holds the header jars of dependencies tagged
/// [`DependencyTag::ProguardRaise`]; `extra_flag_files` are collaborator flag
/// files that survived [`filter_extra_flag_files`].
pub fn r8_flags(
    config: &ModuleDexConfig,
    classpath: &Classpath,
    proguard_raise: &[ArtifactPath],
    extra_flag_files: &[ArtifactPath],
    toolchain: &Toolchain,
    env: &BuildEnv,
) -> FlagSet {
    let opt = &config.optimize;
    let mut set = FlagSet::new();

    for jars in [proguard_raise, classpath.boot.as_slice(), classpath.dex.as_slice()] {
        if let Some(flag) = library_jars(jars) {
            set.flag(flag);
        }
        set.deps.extend(jars.iter().cloned());
    }

    let flag_files = std::iter::once(&toolchain.proguard_default_flags)
        .chain(extra_flag_files)
        .chain(&opt.proguard_flags_files);
    for file in flag_files {
        set.flag(format!("-include {file}"));
        set.dep(file.clone());
    }
    // Included by the default flag file rather than named on the command line.
    set.dep(toolchain.proguard_basic_keeps.clone());

    set.flags.extend(opt.proguard_flags.iter().cloned());

    if opt.proguard_compatibility_enabled() {
        set.flag("--force-proguard-compatibility");
    } else if opt.optimize_enabled() || opt.obfuscate_enabled() {
        set.flag("--map-id-template");
        set.flag("%MAP_HASH");
        set.flag("--source-file-template");
        set.flag(format!("\"{}%MAP_ID\"", toolchain.source_file_prefix));
    }

    if !opt.shrink_enabled() {
        set.flag("-dontshrink");
    }
    if !opt.optimize_enabled() {
        set.flag("-dontoptimize");
    }
    if !opt.obfuscate_enabled() {
        set.flag("-dontobfuscate");
    }

    if env.eng {
        set.flag("--debug");
    }

    if opt.ignore_warnings_enabled() {
        set.flag("-ignorewarnings");
    }

    set
}

/// Drops aapt-generated flag files when `no_aapt_flags` is set.
///
/// Returns the surviving paths in their original order and the dropped ones.
pub fn filter_extra_flag_files(
    files: &[ExtraFlagFile],
    no_aapt_flags: bool,
) -> (Vec<ArtifactPath>, Vec<ArtifactPath>) {
    let mut kept = Vec::with_capacity(files.len());
    let mut dropped = Vec::new();
    for file in files {
        if no_aapt_flags && file.origin == FlagFileOrigin::Aapt {
            dropped.push(file.path.clone());
        } else {
            kept.push(file.path.clone());
        }
    }
    (kept, dropped)
}

/// Derives the complete flag set for `pipeline`: common flags first, then the
/// tool-specific ones.
pub fn tool_flags(
    pipeline: Pipeline,
    ctx: &BuildContext<'_>,
    config: &ModuleDexConfig,
    classpath: &Classpath,
    extra_flag_files: &[ArtifactPath],
) -> Result<FlagSet, DexError> {
    let common = common_flags(config, ctx.sdk, ctx.env)?;
    let tool = match pipeline {
        Pipeline::Plain => d8_flags(classpath),
        Pipeline::Optimize => {
            let raise = ctx.deps.tagged_dependencies(DependencyTag::ProguardRaise);
            r8_flags(config, classpath, &raise, extra_flag_files, ctx.toolchain, ctx.env)
        }
    };

    // Tool dependencies come first so classpath jars lead the implicit list.
    let mut set = FlagSet {
        flags: common.flags,
        deps: tool.deps,
    };
    set.flags.extend(tool.flags);
    set.deps.extend(common.deps);

    tracing::debug!(
        pipeline = %pipeline,
        flags = set.flags.len(),
        deps = set.deps.len(),
        "derived dex flags"
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PlatformSdk, SdkError};
    use dexer_config::ModuleKind;

    fn platform() -> PlatformSdk {
        PlatformSdk::default()
    }

    fn app() -> ModuleDexConfig {
        let mut config = ModuleDexConfig::new("Calc", ModuleKind::App);
        config.min_sdk_version = "30".into();
        config
    }

    #[test]
    fn obsolete_dx_flags_removed_in_order() {
        let mut config = app();
        config.dxflags = vec![
            "--no-locals".into(),
            "--multi-dex".into(),
            "--force-jumbo".into(),
            "--dex".into(),
            "--core-library".into(),
        ];
        let set = common_flags(&config, &platform(), &BuildEnv::default()).unwrap();
        assert_eq!(set.flags, vec!["--no-locals", "--force-jumbo", "--min-api 30"]);
    }

    #[test]
    fn main_dex_rules_are_flags_and_deps() {
        let mut config = app();
        config.main_dex_rules = vec!["m/a.flags".into(), "m/b.flags".into()];
        let set = common_flags(&config, &platform(), &BuildEnv::default()).unwrap();
        assert_eq!(
            set.flags,
            vec![
                "--main-dex-rules",
                "m/a.flags",
                "--main-dex-rules",
                "m/b.flags",
                "--min-api 30"
            ]
        );
        assert_eq!(set.deps, config.main_dex_rules);
    }

    #[test]
    fn debug_overrides_both_fire() {
        let env = BuildEnv {
            no_optimize_dx: true,
            generate_dex_debug: true,
            ..BuildEnv::default()
        };
        let set = common_flags(&app(), &platform(), &env).unwrap();
        assert_eq!(set.flags, vec!["--debug", "--debug", "--verbose", "--min-api 30"]);
    }

    #[test]
    fn min_api_appears_once() {
        let set = common_flags(&app(), &platform(), &BuildEnv::default()).unwrap();
        let count = set.flags.iter().filter(|f| *f == "--min-api 30").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn future_min_api() {
        let mut config = app();
        config.min_sdk_version = "current".into();
        let set = common_flags(&config, &platform(), &BuildEnv::default()).unwrap();
        assert_eq!(set.flags.last().map(String::as_str), Some("--min-api 10000"));
    }

    #[test]
    fn unresolvable_min_sdk_fails() {
        let mut config = app();
        config.min_sdk_version = "Baklava".into();
        let err = common_flags(&config, &platform(), &BuildEnv::default()).unwrap_err();
        assert!(matches!(
            err,
            DexError::MinSdk(SdkError::UnknownCodename { .. })
        ));
    }

    #[test]
    fn d8_classpath_boot_first() {
        let classpath = Classpath {
            boot: vec!["boot/a.jar".into(), "boot/b.jar".into()],
            dex: vec!["lib/c.jar".into()],
        };
        let set = d8_flags(&classpath);
        assert_eq!(
            set.flags,
            vec!["--lib boot/a.jar", "--lib boot/b.jar", "--lib lib/c.jar"]
        );
        assert_eq!(set.deps.len(), 3);
        assert_eq!(set.deps[0].as_str(), "boot/a.jar");
    }

    #[test]
    fn r8_defaults() {
        let toolchain = Toolchain::default();
        let set = r8_flags(
            &app(),
            &Classpath::default(),
            &[],
            &[],
            &toolchain,
            &BuildEnv::default(),
        );
        assert_eq!(
            set.flags,
            vec![
                "-include build/make/core/proguard.flags",
                "--force-proguard-compatibility",
                "-dontshrink",
                "-dontoptimize",
                "-dontobfuscate",
                "-ignorewarnings",
            ]
        );
        assert_eq!(
            set.deps,
            vec![
                toolchain.proguard_default_flags.clone(),
                toolchain.proguard_basic_keeps.clone(),
            ]
        );
    }

    #[test]
    fn r8_classpath_and_flag_file_order() {
        let mut config = app();
        config.optimize.proguard_flags_files = vec!["m/proguard.flags".into()];
        config.optimize.proguard_flags = vec!["-keep class A".into(), "-dontnote".into()];
        let classpath = Classpath {
            boot: vec!["boot/a.jar".into(), "boot/b.jar".into()],
            dex: vec!["lib/c.jar".into()],
        };
        let raise = vec![ArtifactPath::new("raise/h.jar")];
        let extra = vec![ArtifactPath::new("gen/aapt.flags")];
        let set = r8_flags(
            &config,
            &classpath,
            &raise,
            &extra,
            &Toolchain::default(),
            &BuildEnv::default(),
        );
        assert_eq!(
            &set.flags[..7],
            &[
                "-libraryjars raise/h.jar",
                "-libraryjars boot/a.jar:boot/b.jar",
                "-libraryjars lib/c.jar",
                "-include build/make/core/proguard.flags",
                "-include gen/aapt.flags",
                "-include m/proguard.flags",
                "-keep class A",
            ]
        );
        let deps: Vec<&str> = set.deps.iter().map(ArtifactPath::as_str).collect();
        assert_eq!(
            deps,
            vec![
                "raise/h.jar",
                "boot/a.jar",
                "boot/b.jar",
                "lib/c.jar",
                "build/make/core/proguard.flags",
                "gen/aapt.flags",
                "m/proguard.flags",
                "build/make/core/proguard_basic_keeps.flags",
            ]
        );
    }

    #[test]
    fn each_disable_flag_is_independent() {
        let toolchain = Toolchain::default();
        let env = BuildEnv::default();
        let disabled = |shrink, optimize, obfuscate| {
            let mut config = app();
            config.optimize.shrink = Some(shrink);
            config.optimize.optimize = Some(optimize);
            config.optimize.obfuscate = Some(obfuscate);
            r8_flags(&config, &Classpath::default(), &[], &[], &toolchain, &env)
                .flags
                .into_iter()
                .filter(|f| f.starts_with("-dont"))
                .collect::<Vec<_>>()
        };
        assert_eq!(disabled(true, true, true), Vec::<String>::new());
        assert_eq!(disabled(false, true, true), vec!["-dontshrink"]);
        assert_eq!(disabled(true, false, true), vec!["-dontoptimize"]);
        assert_eq!(disabled(true, true, false), vec!["-dontobfuscate"]);
    }

    #[test]
    fn full_mode_templates() {
        let toolchain = Toolchain::default();
        let env = BuildEnv::default();
        let has_templates = |compat: Option<bool>, optimize: bool, obfuscate: bool| {
            let mut config = app();
            config.optimize.proguard_compatibility = compat;
            config.optimize.optimize = Some(optimize);
            config.optimize.obfuscate = Some(obfuscate);
            let flags = r8_flags(&config, &Classpath::default(), &[], &[], &toolchain, &env).flags;
            let map_id = flags.iter().any(|f| f == "--map-id-template");
            let source = flags.iter().any(|f| f == "--source-file-template");
            assert_eq!(map_id, source);
            map_id
        };
        assert!(!has_templates(None, true, true));
        assert!(!has_templates(Some(true), true, false));
        assert!(has_templates(Some(false), true, false));
        assert!(has_templates(Some(false), false, true));
        assert!(!has_templates(Some(false), false, false));
    }

    #[test]
    fn source_file_template_uses_prefix() {
        let toolchain = Toolchain {
            source_file_prefix: "retrace-".into(),
            ..Toolchain::default()
        };
        let mut config = app();
        config.optimize.proguard_compatibility = Some(false);
        config.optimize.obfuscate = Some(true);
        let flags = r8_flags(
            &config,
            &Classpath::default(),
            &[],
            &[],
            &toolchain,
            &BuildEnv::default(),
        )
        .flags;
        let pos = flags.iter().position(|f| f == "--source-file-template").unwrap();
        assert_eq!(flags[pos + 1], "\"retrace-%MAP_ID\"");
    }

    #[test]
    fn default_source_file_template() {
        let mut config = app();
        config.optimize.proguard_compatibility = Some(false);
        config.optimize.optimize = Some(true);
        let flags = r8_flags(
            &config,
            &Classpath::default(),
            &[],
            &[],
            &Toolchain::default(),
            &BuildEnv::default(),
        )
        .flags;
        let pos = flags.iter().position(|f| f == "--source-file-template").unwrap();
        assert_eq!(flags[pos + 1], "\"go/retraceme %MAP_ID\"");
    }

    #[test]
    fn eng_and_ignore_warnings() {
        let mut config = app();
        config.optimize.ignore_warnings = Some(false);
        let env = BuildEnv {
            eng: true,
            ..BuildEnv::default()
        };
        let flags = r8_flags(
            &config,
            &Classpath::default(),
            &[],
            &[],
            &Toolchain::default(),
            &env,
        )
        .flags;
        assert_eq!(flags.last().map(String::as_str), Some("--debug"));
        assert!(!flags.iter().any(|f| f == "-ignorewarnings"));
    }

    #[test]
    fn aapt_files_dropped_only_when_requested() {
        let files = vec![
            ExtraFlagFile::new("gen/aapt.flags", FlagFileOrigin::Aapt),
            ExtraFlagFile::new("lib/export.flags", FlagFileOrigin::Library),
            ExtraFlagFile::new("gen/aapt2.flags", FlagFileOrigin::Aapt),
        ];
        let (kept, dropped) = filter_extra_flag_files(&files, false);
        assert_eq!(kept.len(), 3);
        assert!(dropped.is_empty());

        let (kept, dropped) = filter_extra_flag_files(&files, true);
        assert_eq!(kept, vec![ArtifactPath::new("lib/export.flags")]);
        assert_eq!(
            dropped,
            vec![
                ArtifactPath::new("gen/aapt.flags"),
                ArtifactPath::new("gen/aapt2.flags")
            ]
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let mut config = app();
        config.dxflags = vec!["--no-locals".into()];
        config.optimize.proguard_flags = vec!["-keep class A".into()];
        let classpath = Classpath {
            boot: vec!["boot/a.jar".into()],
            dex: vec![],
        };
        let toolchain = Toolchain::default();
        let env = BuildEnv::default();
        let deps = crate::context::TaggedDependencies::default();
        let sdk = platform();
        let ctx = BuildContext {
            env: &env,
            toolchain: &toolchain,
            sdk: &sdk,
            deps: &deps,
        };
        let first = tool_flags(Pipeline::Optimize, &ctx, &config, &classpath, &[]).unwrap();
        let second = tool_flags(Pipeline::Optimize, &ctx, &config, &classpath, &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.flags[0], "--no-locals");
        assert_eq!(first.flags[1], "--min-api 30");
        assert_eq!(first.flags[2], "-libraryjars boot/a.jar");
    }
}
