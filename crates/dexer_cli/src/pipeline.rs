//! Shared planning pipeline for the `plan` and `flags` commands.
//!
//! 1. Load `dex.toml` from the module directory
//! 2. Load the toolchain description, if one was given
//! 3. Skip modules that do not compile dex
//! 4. Run the action compiler
//! 5. Render diagnostics to stderr

use dexer_common::ArtifactPath;
use dexer_config::{load_module_config, load_toolchain, Toolchain};
use dexer_core::{
    compile_dex, BuildContext, BuildEnv, Classpath, DexError, DexPlan, DexRequest, ExtraFlagFile,
    FlagFileOrigin, PlatformSdk, TaggedDependencies,
};
use dexer_diagnostics::{
    Diagnostic, DiagnosticRenderer, DiagnosticSink, JsonRenderer, TerminalRenderer,
};

use crate::{GlobalArgs, ModuleArgs};

/// Result of planning one module.
pub struct PlanOutcome {
    /// Name of the module, or its directory when the configuration did not load.
    pub module: String,
    /// The plan, when the module compiles dex and planning succeeded.
    pub plan: Option<DexPlan>,
    /// Every diagnostic emitted while planning.
    pub diagnostics: Vec<Diagnostic>,
    /// Whether any diagnostic is an error.
    pub has_errors: bool,
}

impl PlanOutcome {
    /// Exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_errors)
    }
}

fn paths(raw: &[String]) -> Vec<ArtifactPath> {
    raw.iter().map(|p| ArtifactPath::new(p.as_str())).collect()
}

/// Collaborator flag files in the order the optimizer includes them: aapt
/// output first, then files exported by libraries, then the rest.
fn extra_flag_files(args: &ModuleArgs) -> Vec<ExtraFlagFile> {
    let tagged = |paths: &[String], origin: FlagFileOrigin| -> Vec<ExtraFlagFile> {
        paths
            .iter()
            .map(|p| ExtraFlagFile::new(p.as_str(), origin))
            .collect()
    };
    let mut files = tagged(&args.aapt_flags_file, FlagFileOrigin::Aapt);
    files.extend(tagged(&args.extra_flags_file, FlagFileOrigin::Library));
    files.extend(tagged(&args.other_flags_file, FlagFileOrigin::Other));
    files
}

/// Plans one module against the given environment.
///
/// Configuration problems become diagnostics in the outcome. Only failures to
/// read the toolchain description are returned as errors.
pub fn plan_module(
    args: &ModuleArgs,
    global: &GlobalArgs,
    env: &BuildEnv,
    sdk: &PlatformSdk,
) -> Result<PlanOutcome, Box<dyn std::error::Error>> {
    let sink = DiagnosticSink::new();
    let module_dir = args.module.display().to_string();

    let toolchain = match &args.toolchain {
        Some(path) => load_toolchain(path)?,
        None => Toolchain::default(),
    };

    let config = match load_module_config(&args.module) {
        Ok(config) => config,
        Err(e) => {
            sink.emit(DexError::from(e).to_diagnostic(&module_dir));
            return Ok(finish(module_dir, None, &sink, global));
        }
    };

    if !config.should_compile_dex() {
        if !global.quiet {
            eprintln!(
                "   Skipping {} (not installable and compile_dex is not set)",
                config.name
            );
        }
        return Ok(finish(config.name, None, &sink, global));
    }

    if !global.quiet {
        eprintln!("   Planning {}", config.name);
    }

    let classpath = Classpath {
        boot: paths(&args.boot_classpath),
        dex: paths(&args.classpath),
    };
    let deps = TaggedDependencies {
        proguard_raise: paths(&args.proguard_raise),
    };
    let extra = extra_flag_files(args);
    let ctx = BuildContext {
        env,
        toolchain: &toolchain,
        sdk,
        deps: &deps,
    };
    let request = DexRequest {
        config: &config,
        classpath: &classpath,
        classes_jar: ArtifactPath::new(args.classes_jar.as_str()),
        jar_name: args.jar_name.clone(),
        module_out_dir: ArtifactPath::new(args.out_dir.as_str()),
        extra_flag_files: &extra,
    };

    let plan = match compile_dex(&ctx, &request, &sink) {
        Ok(plan) => Some(plan),
        Err(e) => {
            sink.emit(e.to_diagnostic(&config.name));
            None
        }
    };
    Ok(finish(config.name, plan, &sink, global))
}

/// Renders the sink's diagnostics and packages the outcome.
fn finish(
    module: String,
    plan: Option<DexPlan>,
    sink: &DiagnosticSink,
    global: &GlobalArgs,
) -> PlanOutcome {
    let has_errors = sink.has_errors();
    let warnings = sink.warning_count();
    let diagnostics = sink.take_all();
    let renderer: Box<dyn DiagnosticRenderer> = if global.json_messages {
        Box::new(JsonRenderer)
    } else {
        Box::new(TerminalRenderer::new(global.color))
    };
    for diag in &diagnostics {
        if global.quiet && !diag.severity.is_error() {
            continue;
        }
        eprintln!("{}", renderer.render(diag));
    }
    if !global.quiet && !global.json_messages && (has_errors || warnings > 0) {
        eprintln!(
            "   {module}: {} error(s), {warnings} warning(s)",
            sink.error_count()
        );
    }
    PlanOutcome {
        module,
        plan,
        diagnostics,
        has_errors,
    }
}
