//! Composition of selected tool, derived flags and output layout into build
//! actions.

use crate::action::{ActionKind, BuildAction, Depfile, DepsFormat, ExecStrategy, RemoteExecution};
use crate::align::maybe_align;
use crate::context::{BuildContext, BuildEnv, Classpath, ExtraFlagFile, RemoteConfig};
use crate::error::DexError;
use crate::flags::{filter_extra_flag_files, tool_flags, FlagSet};
use crate::graph::ActionGraph;
use crate::rules::{self, DexLayout, OptimizerLayout, Wrappers, ZipFlags};
use crate::selector::{select, Pipeline, ToolSelection};
use dexer_common::{ArtifactPath, DexerResult};
use dexer_config::{ConfigError, ModuleDexConfig, Toolchain};
use dexer_diagnostics::code::{DROPPED_AAPT_FLAGS, ENV_OVERRIDE, IGNORED_OPTIMIZER_PROPERTY};
use dexer_diagnostics::{Diagnostic, DiagnosticSink};

/// Every path a module's dex actions read or write.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Paths shared by both pipelines.
    pub dex: DexLayout,
    /// Paths declared only by the optimizer pipeline.
    pub optimizer: OptimizerLayout,
    /// Output of the alignment action.
    pub aligned: ArtifactPath,
}

impl OutputLayout {
    /// Lays out a module's outputs under `module_out_dir`.
    ///
    /// The usage report nests under the module's namespace and output name so
    /// that reports from many modules can be merged into one archive.
    pub fn new(
        module_out_dir: &ArtifactPath,
        classes_jar: &ArtifactPath,
        jar_name: &str,
        namespace: &str,
        module_name: &str,
    ) -> Self {
        let out_dir = module_out_dir.join("dex");
        let output = out_dir.join(jar_name);
        let usage_dir = module_out_dir.join("proguard_usage");
        let usage = usage_dir.join(namespace).join(module_name).join("unused.txt");
        Self {
            optimizer: OptimizerLayout {
                dictionary: module_out_dir.join("proguard_dictionary"),
                usage_dir,
                usage,
                usage_zip: module_out_dir.join("proguard_usage.zip"),
                depfile: output.with_suffix(".d"),
            },
            dex: DexLayout {
                input: classes_jar.clone(),
                output,
                out_dir,
                tmp_jar: module_out_dir.join("withres-withoutdex").join(jar_name),
            },
            aligned: module_out_dir.join("aligned").join(jar_name),
        }
    }
}

/// Builds dex action descriptors for one toolchain.
pub struct ActionBuilder<'a> {
    toolchain: &'a Toolchain,
    remote: &'a RemoteConfig,
}

impl<'a> ActionBuilder<'a> {
    /// Creates a builder over `toolchain` using `remote` for remote actions.
    pub fn new(toolchain: &'a Toolchain, remote: &'a RemoteConfig) -> Self {
        Self { toolchain, remote }
    }

    fn remote_execution(
        &self,
        pipeline: Pipeline,
        implicits: &[ArtifactPath],
        layout: &OutputLayout,
    ) -> RemoteExecution {
        let opt = &layout.optimizer;
        let tool = rules::tool_remote_params(
            self.toolchain,
            self.remote,
            pipeline,
            implicits,
            (pipeline == Pipeline::Optimize).then_some(opt),
        );
        let archive = rules::zip_remote_params(
            self.toolchain,
            self.remote,
            pipeline,
            &layout.dex.out_dir,
            &layout.dex.classes_dex_jar(),
        );
        let usage_archive = (pipeline == Pipeline::Optimize).then(|| {
            rules::zip_remote_params(
                self.toolchain,
                self.remote,
                pipeline,
                &opt.usage,
                &opt.usage_zip,
            )
        });
        RemoteExecution {
            tool,
            archive,
            usage_archive,
        }
    }

    /// Builds the dex action for `selection`.
    ///
    /// Both pipelines share the strip, compile, re-archive shape. The optimizer
    /// additionally declares its dictionary, usage archive and depfile; those
    /// outputs exist even when the optimizer writes nothing into them.
    pub fn build(
        &self,
        selection: ToolSelection,
        flags: &FlagSet,
        layout: &OutputLayout,
        zip: &ZipFlags,
    ) -> BuildAction {
        let pipeline = selection.pipeline;
        let (strategy, wrappers) = if selection.remote {
            let remote = self.remote_execution(pipeline, &flags.deps, layout);
            let rewrapper = &self.toolchain.rewrapper_cmd;
            let wrappers = Wrappers {
                tool: remote.tool.wrapper_prefix(rewrapper),
                archive: remote.archive.wrapper_prefix(rewrapper),
                usage_archive: remote
                    .usage_archive
                    .as_ref()
                    .map(|p| p.wrapper_prefix(rewrapper))
                    .unwrap_or_default(),
            };
            (ExecStrategy::Remote(remote), wrappers)
        } else {
            (ExecStrategy::Local, Wrappers::default())
        };

        let joined = flags.joined();
        let opt = &layout.optimizer;
        let (kind, steps, implicit_outputs, depfile) = match pipeline {
            Pipeline::Plain => (
                ActionKind::D8,
                rules::d8_steps(self.toolchain, &layout.dex, &joined, zip, &wrappers),
                Vec::new(),
                None,
            ),
            Pipeline::Optimize => (
                ActionKind::R8,
                rules::r8_steps(self.toolchain, &layout.dex, opt, &joined, zip, &wrappers),
                vec![opt.dictionary.clone(), opt.usage_zip.clone()],
                Some(Depfile {
                    path: opt.depfile.clone(),
                    format: DepsFormat::Gcc,
                }),
            ),
        };

        BuildAction {
            kind,
            description: kind.rule_name().to_string(),
            steps,
            flags: flags.flags.clone(),
            input: layout.dex.input.clone(),
            output: layout.dex.output.clone(),
            implicit_outputs,
            implicit_inputs: flags.deps.clone(),
            tool_deps: rules::tool_deps(self.toolchain, pipeline, selection.remote),
            depfile,
            strategy,
        }
    }
}

/// One module's dexing request.
#[derive(Debug, Clone)]
pub struct DexRequest<'a> {
    /// The module configuration.
    pub config: &'a ModuleDexConfig,
    /// The classpath the module is dexed against.
    pub classpath: &'a Classpath,
    /// The compiled classes archive.
    pub classes_jar: ArtifactPath,
    /// File name of the produced jar, usually `javalib.jar`.
    pub jar_name: String,
    /// The module's private output directory.
    pub module_out_dir: ArtifactPath,
    /// Flag files contributed by collaborators.
    pub extra_flag_files: &'a [ExtraFlagFile],
}

/// The actions and named outputs planned for one module.
#[derive(Debug, Clone)]
pub struct DexPlan {
    /// The selected tool.
    pub selection: ToolSelection,
    /// The derived flags and the files they reference.
    pub flags: FlagSet,
    /// The dex action followed by the alignment action, if any.
    pub actions: Vec<BuildAction>,
    /// The module's externally visible dex jar.
    pub javalib_jar: ArtifactPath,
    /// The mapping dictionary. Optimizer pipeline only.
    pub proguard_dictionary: Option<ArtifactPath>,
    /// The zipped usage report. Optimizer pipeline only.
    pub proguard_usage_zip: Option<ArtifactPath>,
}

impl DexPlan {
    /// Collects the planned actions into a dependency graph.
    pub fn graph(&self) -> DexerResult<ActionGraph> {
        let mut graph = ActionGraph::new();
        for action in &self.actions {
            graph.add(action.clone())?;
        }
        Ok(graph)
    }
}

/// The jar name must be a single non-empty file name, otherwise `dex/<jar>`
/// would name the scratch directory or escape it.
fn check_jar_name(jar_name: &str) -> Result<(), ConfigError> {
    let message = if jar_name.trim().is_empty() {
        "the output jar name is empty"
    } else if jar_name.contains('/') || jar_name == "." || jar_name == ".." {
        "the output jar name must be a plain file name"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidProperty {
        property: "jar_name".to_string(),
        message: message.to_string(),
    })
}

fn report_ignored_properties(config: &ModuleDexConfig, sink: &DiagnosticSink) {
    for property in config.optimize.optimizer_only_properties() {
        sink.emit(
            Diagnostic::warning(
                IGNORED_OPTIMIZER_PROPERTY,
                format!("'{property}' has no effect because the optimizer is disabled"),
            )
            .in_module(&config.name)
            .at_property(property)
            .with_help("set optimize.enabled = true to run the optimizer"),
        );
    }
}

fn report_env_overrides(env: &BuildEnv, config: &ModuleDexConfig, sink: &DiagnosticSink) {
    let overrides = [
        (env.no_optimize_dx, "NO_OPTIMIZE_DX adds --debug"),
        (env.generate_dex_debug, "GENERATE_DEX_DEBUG adds --debug --verbose"),
    ];
    for (_, message) in overrides.iter().filter(|(set, _)| *set) {
        sink.emit(Diagnostic::note(ENV_OVERRIDE, *message).in_module(&config.name));
    }
}

/// Plans the dex actions for one module.
///
/// Warnings about ignored properties and dropped flag files go to `sink`.
/// Configuration errors are returned rather than emitted, so the caller
/// decides how to attribute them; no action is planned when one occurs.
pub fn compile_dex(
    ctx: &BuildContext<'_>,
    request: &DexRequest<'_>,
    sink: &DiagnosticSink,
) -> Result<DexPlan, DexError> {
    let config = request.config;
    check_jar_name(&request.jar_name)?;
    let selection = select(config.effective_optimize_enabled(), ctx.env);
    report_env_overrides(ctx.env, config, sink);

    let mut extra_flag_files = Vec::new();
    match selection.pipeline {
        Pipeline::Plain => report_ignored_properties(config, sink),
        Pipeline::Optimize => {
            let (kept, dropped) = filter_extra_flag_files(
                request.extra_flag_files,
                config.optimize.no_aapt_flags_enabled(),
            );
            if !dropped.is_empty() {
                let mut diag = Diagnostic::warning(
                    DROPPED_AAPT_FLAGS,
                    format!("dropped {} aapt-generated flag file(s)", dropped.len()),
                )
                .in_module(&config.name)
                .at_property("optimize.no_aapt_flags");
                for path in &dropped {
                    diag = diag.with_note(format!("not included: {path}"));
                }
                sink.emit(diag);
            }
            extra_flag_files = kept;
        }
    }

    let flags = tool_flags(
        selection.pipeline,
        ctx,
        config,
        request.classpath,
        &extra_flag_files,
    )?;

    let layout = OutputLayout::new(
        &request.module_out_dir,
        &request.classes_jar,
        &request.jar_name,
        &config.namespace,
        config.output_name(),
    );
    let zip = ZipFlags::new(
        config.uncompress_dex_enabled(),
        config.exclude_kotlinc_generated_files_enabled(),
    );
    let action = ActionBuilder::new(ctx.toolchain, &ctx.env.remote).build(
        selection,
        &flags,
        &layout,
        &zip,
    );

    let aligned = maybe_align(
        ctx.toolchain,
        &action,
        config.uncompress_dex_enabled(),
        layout.aligned.clone(),
    )?;

    let (proguard_dictionary, proguard_usage_zip) = match selection.pipeline {
        Pipeline::Plain => (None, None),
        Pipeline::Optimize => (
            Some(layout.optimizer.dictionary.clone()),
            Some(layout.optimizer.usage_zip.clone()),
        ),
    };

    let mut actions = vec![action];
    actions.extend(aligned.action);
    tracing::info!(
        module = %config.name,
        pipeline = %selection.pipeline,
        remote = selection.remote,
        actions = actions.len(),
        output = %aligned.final_output,
        "planned dex actions"
    );

    Ok(DexPlan {
        selection,
        flags,
        actions,
        javalib_jar: aligned.final_output,
        proguard_dictionary,
        proguard_usage_zip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FlagFileOrigin, PlatformSdk, TaggedDependencies};
    use dexer_config::ModuleKind;
    use dexer_diagnostics::Severity;

    struct Fixture {
        env: BuildEnv,
        toolchain: Toolchain,
        sdk: PlatformSdk,
        deps: TaggedDependencies,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                env: BuildEnv::default(),
                toolchain: Toolchain::default(),
                sdk: PlatformSdk::default(),
                deps: TaggedDependencies::default(),
            }
        }

        fn ctx(&self) -> BuildContext<'_> {
            BuildContext {
                env: &self.env,
                toolchain: &self.toolchain,
                sdk: &self.sdk,
                deps: &self.deps,
            }
        }
    }

    fn request<'a>(
        config: &'a ModuleDexConfig,
        classpath: &'a Classpath,
        extra: &'a [ExtraFlagFile],
    ) -> DexRequest<'a> {
        DexRequest {
            config,
            classpath,
            classes_jar: "out/Calc/classes.jar".into(),
            jar_name: "javalib.jar".into(),
            module_out_dir: "out/Calc".into(),
            extra_flag_files: extra,
        }
    }

    fn config(kind: ModuleKind) -> ModuleDexConfig {
        let mut config = ModuleDexConfig::new("Calc", kind);
        config.min_sdk_version = "21".into();
        config
    }

    #[test]
    fn layout_paths() {
        let layout = OutputLayout::new(
            &"out/Calc".into(),
            &"out/Calc/classes.jar".into(),
            "javalib.jar",
            "",
            "Calc",
        );
        assert_eq!(layout.dex.output.as_str(), "out/Calc/dex/javalib.jar");
        assert_eq!(
            layout.dex.tmp_jar.as_str(),
            "out/Calc/withres-withoutdex/javalib.jar"
        );
        assert_eq!(
            layout.optimizer.usage.as_str(),
            "out/Calc/proguard_usage/Calc/unused.txt"
        );
        assert_eq!(
            layout.optimizer.depfile.as_str(),
            "out/Calc/dex/javalib.jar.d"
        );
        assert_eq!(layout.aligned.as_str(), "out/Calc/aligned/javalib.jar");
    }

    #[test]
    fn usage_path_uses_namespace_and_override() {
        let fx = Fixture::new();
        let mut cfg = config(ModuleKind::App);
        cfg.namespace = "vendor/acme".into();
        cfg.override_name = Some("Calc2".into());
        let classpath = Classpath::default();
        let sink = DiagnosticSink::new();
        let plan = compile_dex(&fx.ctx(), &request(&cfg, &classpath, &[]), &sink).unwrap();
        let r8 = &plan.actions[0];
        assert!(r8
            .command_line()
            .contains("-printusage out/Calc/proguard_usage/vendor/acme/Calc2/unused.txt"));
    }

    #[test]
    fn plain_pipeline_warns_about_optimizer_properties() {
        let fx = Fixture::new();
        let mut cfg = config(ModuleKind::Library);
        cfg.optimize.shrink = Some(true);
        cfg.optimize.proguard_flags = vec!["-keep class A".into()];
        let classpath = Classpath::default();
        let sink = DiagnosticSink::new();
        let plan = compile_dex(&fx.ctx(), &request(&cfg, &classpath, &[]), &sink).unwrap();

        assert_eq!(plan.selection.pipeline, Pipeline::Plain);
        let diags = sink.take_all();
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.severity == Severity::Warning));
        assert_eq!(diags[0].property.as_deref(), Some("optimize.shrink"));
        assert!(!plan.flags.flags.iter().any(|f| f == "-keep class A"));
    }

    #[test]
    fn aapt_flag_files_dropped_with_warning() {
        let fx = Fixture::new();
        let mut cfg = config(ModuleKind::App);
        cfg.optimize.no_aapt_flags = Some(true);
        let extra = vec![
            ExtraFlagFile::new("out/Calc/aapt/proguard.flags", FlagFileOrigin::Aapt),
            ExtraFlagFile::new("out/lib/export.flags", FlagFileOrigin::Library),
        ];
        let classpath = Classpath::default();
        let sink = DiagnosticSink::new();
        let plan = compile_dex(&fx.ctx(), &request(&cfg, &classpath, &extra), &sink).unwrap();

        assert!(plan
            .flags
            .flags
            .iter()
            .any(|f| f == "-include out/lib/export.flags"));
        assert!(!plan.flags.flags.iter().any(|f| f.contains("aapt")));
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DROPPED_AAPT_FLAGS);
        assert_eq!(diags[0].notes.len(), 1);
    }

    #[test]
    fn env_override_noted() {
        let mut fx = Fixture::new();
        fx.env.generate_dex_debug = true;
        let cfg = config(ModuleKind::Library);
        let classpath = Classpath::default();
        let sink = DiagnosticSink::new();
        compile_dex(&fx.ctx(), &request(&cfg, &classpath, &[]), &sink).unwrap();
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Note);
        assert_eq!(diags[0].code, ENV_OVERRIDE);
    }

    #[test]
    fn bad_jar_name_plans_nothing() {
        let fx = Fixture::new();
        let cfg = config(ModuleKind::App);
        let classpath = Classpath::default();
        for jar_name in ["", "  ", "dex/javalib.jar", ".."] {
            let mut req = request(&cfg, &classpath, &[]);
            req.jar_name = jar_name.to_string();
            let sink = DiagnosticSink::new();
            let err = compile_dex(&fx.ctx(), &req, &sink).unwrap_err();
            assert_eq!(err.property(), Some("jar_name"), "{jar_name:?}");
            assert!(sink.diagnostics().is_empty());
        }
    }

    #[test]
    fn unresolved_min_sdk_plans_nothing() {
        let fx = Fixture::new();
        let mut cfg = config(ModuleKind::App);
        cfg.min_sdk_version = "Baklava".into();
        let classpath = Classpath::default();
        let sink = DiagnosticSink::new();
        let err = compile_dex(&fx.ctx(), &request(&cfg, &classpath, &[]), &sink).unwrap_err();
        assert_eq!(err.property(), Some("min_sdk_version"));
    }

    #[test]
    fn remote_and_local_declare_same_outputs() {
        let mut fx = Fixture::new();
        let cfg = config(ModuleKind::App);
        let classpath = Classpath {
            boot: vec!["boot/a.jar".into()],
            dex: vec![],
        };
        let sink = DiagnosticSink::new();
        let local = compile_dex(&fx.ctx(), &request(&cfg, &classpath, &[]), &sink).unwrap();

        fx.env.use_rbe = true;
        fx.env.rbe_r8 = true;
        let remote = compile_dex(&fx.ctx(), &request(&cfg, &classpath, &[]), &sink).unwrap();

        let (l, r) = (&local.actions[0], &remote.actions[0]);
        assert!(!l.strategy.is_remote());
        assert!(r.strategy.is_remote());
        assert_eq!(l.flags, r.flags);
        assert_eq!(l.outputs().collect::<Vec<_>>(), r.outputs().collect::<Vec<_>>());
        assert_eq!(l.implicit_inputs, r.implicit_inputs);

        let ExecStrategy::Remote(exec) = &r.strategy else {
            panic!("expected remote strategy");
        };
        assert!(exec.tool.inputs.contains(&"boot/a.jar".to_string()));
        assert!(exec.usage_archive.is_some());
        assert!(r.command_line().contains("--labels=compiler=r8,type=compile"));
    }

    #[test]
    fn plain_remote_has_no_usage_archive() {
        let mut fx = Fixture::new();
        fx.env.use_rbe = true;
        fx.env.rbe_d8 = true;
        let cfg = config(ModuleKind::Library);
        let classpath = Classpath::default();
        let sink = DiagnosticSink::new();
        let plan = compile_dex(&fx.ctx(), &request(&cfg, &classpath, &[]), &sink).unwrap();
        let ExecStrategy::Remote(exec) = &plan.actions[0].strategy else {
            panic!("expected remote strategy");
        };
        assert!(exec.usage_archive.is_none());
        assert_eq!(exec.archive.output_files, vec!["out/Calc/dex/classes.dex.jar"]);
    }

    #[test]
    fn plan_graph_orders_alignment_last() {
        let fx = Fixture::new();
        let mut cfg = config(ModuleKind::App);
        cfg.uncompress_dex = Some(true);
        let classpath = Classpath::default();
        let sink = DiagnosticSink::new();
        let plan = compile_dex(&fx.ctx(), &request(&cfg, &classpath, &[]), &sink).unwrap();
        let graph = plan.graph().unwrap();
        let kinds: Vec<ActionKind> = graph.ordered().unwrap().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::R8, ActionKind::ZipAlign]);
        assert!(plan.actions[0].command_line().contains("--ignore_missing_files -L 0"));
    }
}
