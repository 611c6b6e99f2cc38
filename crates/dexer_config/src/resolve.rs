//! Module resolution: applying defaults and resolving module-relative paths.

use crate::error::ConfigError;
use crate::types::{ModuleFile, ModuleKind};
use dexer_common::ArtifactPath;

/// An immutable snapshot of one module's dex configuration.
///
/// Created once per module from the parsed `dex.toml`. Paths are already
/// resolved against the module directory; tri-state toggles keep their unset
/// state so that defaults can be applied at the point of use.
#[derive(Debug, Clone)]
pub struct ModuleDexConfig {
    /// The module name.
    pub name: String,
    /// The module type.
    pub kind: ModuleKind,
    /// Namespace path of the module (may be empty).
    pub namespace: String,
    /// Name used instead of `name` when this module overrides another.
    pub override_name: Option<String>,
    /// Whether the module is installed on the device.
    pub installable: bool,
    /// The declared minimum SDK spec, unparsed.
    pub min_sdk_version: String,
    /// Compile dex regardless of `installable`.
    pub compile_dex: Option<bool>,
    /// Extra dexer flags in declared order.
    pub dxflags: Vec<String>,
    /// Main-dex rule files.
    pub main_dex_rules: Vec<ArtifactPath>,
    /// Optimizer settings.
    pub optimize: OptimizeConfig,
    /// Store dex entries uncompressed and align the final jar.
    pub uncompress_dex: Option<bool>,
    /// Strip kotlinc-generated metadata files from the output.
    pub exclude_kotlinc_generated_files: Option<bool>,
}

/// Resolved `[dex.optimize]` settings.
#[derive(Debug, Clone, Default)]
pub struct OptimizeConfig {
    /// Explicit optimizer toggle.
    pub enabled: Option<bool>,
    /// Optimizer default for this module kind.
    pub enabled_by_default: bool,
    /// Keep building when the optimizer emits warnings.
    pub ignore_warnings: Option<bool>,
    /// Proguard compatibility mode.
    pub proguard_compatibility: Option<bool>,
    /// Remove unused code.
    pub shrink: Option<bool>,
    /// Optimize bytecode.
    pub optimize: Option<bool>,
    /// Rename symbols.
    pub obfuscate: Option<bool>,
    /// Drop aapt-generated flag files.
    pub no_aapt_flags: Option<bool>,
    /// Raw optimizer flags in declared order.
    pub proguard_flags: Vec<String>,
    /// Per-module flag files in declared order.
    pub proguard_flags_files: Vec<ArtifactPath>,
}

impl OptimizeConfig {
    /// Whether unused code is removed. Unset means no.
    pub fn shrink_enabled(&self) -> bool {
        self.shrink.unwrap_or(false)
    }

    /// Whether bytecode is optimized. Unset means no.
    pub fn optimize_enabled(&self) -> bool {
        self.optimize.unwrap_or(false)
    }

    /// Whether symbols are renamed. Unset means no.
    pub fn obfuscate_enabled(&self) -> bool {
        self.obfuscate.unwrap_or(false)
    }

    /// Whether proguard compatibility mode is used. Unset means yes.
    pub fn proguard_compatibility_enabled(&self) -> bool {
        self.proguard_compatibility.unwrap_or(true)
    }

    /// Whether optimizer warnings are ignored. Unset means yes.
    ///
    /// This default is a platform-build compromise kept for compatibility
    /// with existing modules that reference classes missing from their
    /// classpath.
    pub fn ignore_warnings_enabled(&self) -> bool {
        self.ignore_warnings.unwrap_or(true)
    }

    /// Whether aapt-generated flag files are dropped. Unset means no.
    pub fn no_aapt_flags_enabled(&self) -> bool {
        self.no_aapt_flags.unwrap_or(false)
    }

    /// Returns the names of optimizer-only properties that are set.
    ///
    /// These have no effect when the plain dexer is selected.
    pub fn optimizer_only_properties(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        if self.shrink.is_some() {
            set.push("optimize.shrink");
        }
        if self.optimize.is_some() {
            set.push("optimize.optimize");
        }
        if self.obfuscate.is_some() {
            set.push("optimize.obfuscate");
        }
        if !self.proguard_flags.is_empty() {
            set.push("optimize.proguard_flags");
        }
        if !self.proguard_flags_files.is_empty() {
            set.push("optimize.proguard_flags_files");
        }
        set
    }
}

impl ModuleDexConfig {
    /// Creates a configuration with every property unset.
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            namespace: String::new(),
            override_name: None,
            installable: false,
            min_sdk_version: "current".to_string(),
            compile_dex: None,
            dxflags: Vec::new(),
            main_dex_rules: Vec::new(),
            optimize: OptimizeConfig {
                enabled_by_default: kind.optimize_enabled_by_default(),
                ..OptimizeConfig::default()
            },
            uncompress_dex: None,
            exclude_kotlinc_generated_files: None,
        }
    }

    /// Returns the explicit `optimize.enabled` value, or the module-kind default.
    pub fn effective_optimize_enabled(&self) -> bool {
        self.optimize
            .enabled
            .unwrap_or(self.optimize.enabled_by_default)
    }

    /// Returns whether this module gets a dex action at all.
    pub fn should_compile_dex(&self) -> bool {
        self.compile_dex.unwrap_or(false) || self.installable
    }

    /// The module name used in output paths, honoring `override_name`.
    pub fn output_name(&self) -> &str {
        self.override_name.as_deref().unwrap_or(&self.name)
    }

    /// Whether dex entries are stored uncompressed.
    pub fn uncompress_dex_enabled(&self) -> bool {
        self.uncompress_dex.unwrap_or(false)
    }

    /// Whether kotlinc-generated files are stripped from the output.
    pub fn exclude_kotlinc_generated_files_enabled(&self) -> bool {
        self.exclude_kotlinc_generated_files.unwrap_or(false)
    }
}

/// Resolves a parsed module file against the directory that holds it.
///
/// Module-relative paths are joined onto `module_dir`. A path listed twice in
/// the same property, or an empty path, is a configuration error.
pub fn resolve_module(
    file: ModuleFile,
    module_dir: &ArtifactPath,
) -> Result<ModuleDexConfig, ConfigError> {
    let main_dex_rules = resolve_paths("main_dex_rules", &file.dex.main_dex_rules, module_dir)?;
    let proguard_flags_files = resolve_paths(
        "optimize.proguard_flags_files",
        &file.dex.optimize.proguard_flags_files,
        module_dir,
    )?;

    let opt = file.dex.optimize;
    Ok(ModuleDexConfig {
        name: file.module.name,
        kind: file.module.kind,
        namespace: file.module.namespace,
        override_name: file.module.override_name,
        installable: file.module.installable,
        min_sdk_version: file.module.min_sdk_version,
        compile_dex: file.dex.compile_dex,
        dxflags: file.dex.dxflags,
        main_dex_rules,
        optimize: OptimizeConfig {
            enabled: opt.enabled,
            enabled_by_default: file.module.kind.optimize_enabled_by_default(),
            ignore_warnings: opt.ignore_warnings,
            proguard_compatibility: opt.proguard_compatibility,
            shrink: opt.shrink,
            optimize: opt.optimize,
            obfuscate: opt.obfuscate,
            no_aapt_flags: opt.no_aapt_flags,
            proguard_flags: opt.proguard_flags,
            proguard_flags_files,
        },
        uncompress_dex: file.dex.uncompress_dex,
        exclude_kotlinc_generated_files: file.dex.exclude_kotlinc_generated_files,
    })
}

fn resolve_paths(
    property: &str,
    paths: &[String],
    module_dir: &ArtifactPath,
) -> Result<Vec<ArtifactPath>, ConfigError> {
    let mut resolved: Vec<ArtifactPath> = Vec::with_capacity(paths.len());
    for raw in paths {
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidProperty {
                property: property.to_string(),
                message: "empty path".to_string(),
            });
        }
        let path = module_dir.join(raw);
        if resolved.contains(&path) {
            return Err(ConfigError::InvalidProperty {
                property: property.to_string(),
                message: format!("'{raw}' is listed more than once"),
            });
        }
        resolved.push(path);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_module_config_from_str;

    #[test]
    fn paths_resolve_against_module_dir() {
        let toml = r#"
[module]
name = "Calc"
kind = "app"

[dex]
main_dex_rules = ["main_dex.flags"]

[dex.optimize]
proguard_flags_files = ["proguard.flags", "extra/more.flags"]
"#;
        let config = load_module_config_from_str(toml, "packages/apps/Calc").unwrap();
        assert_eq!(
            config.main_dex_rules,
            vec![ArtifactPath::new("packages/apps/Calc/main_dex.flags")]
        );
        assert_eq!(
            config.optimize.proguard_flags_files,
            vec![
                ArtifactPath::new("packages/apps/Calc/proguard.flags"),
                ArtifactPath::new("packages/apps/Calc/extra/more.flags"),
            ]
        );
    }

    #[test]
    fn duplicate_flag_file_errors() {
        let toml = r#"
[module]
name = "Calc"
kind = "app"

[dex.optimize]
proguard_flags_files = ["a.flags", "./b.flags", "a.flags"]
"#;
        let err = load_module_config_from_str(toml, "m").unwrap_err();
        assert_eq!(err.property(), Some("optimize.proguard_flags_files"));
    }

    #[test]
    fn dot_slash_repeat_is_duplicate() {
        let toml = r#"
[module]
name = "Calc"
kind = "app"

[dex.optimize]
proguard_flags_files = ["a.flags", "./a.flags"]
"#;
        let err = load_module_config_from_str(toml, "m").unwrap_err();
        assert_eq!(err.property(), Some("optimize.proguard_flags_files"));
    }

    #[test]
    fn dot_slash_path_is_cleaned() {
        let toml = r#"
[module]
name = "Calc"
kind = "app"

[dex]
main_dex_rules = ["./main_dex.flags"]
"#;
        let config = load_module_config_from_str(toml, "m").unwrap();
        assert_eq!(config.main_dex_rules, vec![ArtifactPath::new("m/main_dex.flags")]);
    }

    #[test]
    fn empty_main_dex_rule_errors() {
        let toml = r#"
[module]
name = "Calc"
kind = "app"

[dex]
main_dex_rules = [""]
"#;
        let err = load_module_config_from_str(toml, "m").unwrap_err();
        assert_eq!(err.property(), Some("main_dex_rules"));
    }

    #[test]
    fn effective_optimize_follows_kind_until_set() {
        let mut app = ModuleDexConfig::new("App", ModuleKind::App);
        assert!(app.effective_optimize_enabled());
        app.optimize.enabled = Some(false);
        assert!(!app.effective_optimize_enabled());

        let mut lib = ModuleDexConfig::new("Lib", ModuleKind::Library);
        assert!(!lib.effective_optimize_enabled());
        lib.optimize.enabled = Some(true);
        assert!(lib.effective_optimize_enabled());
    }

    #[test]
    fn optimize_toggle_defaults() {
        let opt = OptimizeConfig::default();
        assert!(!opt.shrink_enabled());
        assert!(!opt.optimize_enabled());
        assert!(!opt.obfuscate_enabled());
        assert!(opt.proguard_compatibility_enabled());
        assert!(opt.ignore_warnings_enabled());
        assert!(!opt.no_aapt_flags_enabled());
        assert!(opt.optimizer_only_properties().is_empty());
    }

    #[test]
    fn optimizer_only_properties_listed_in_order() {
        let opt = OptimizeConfig {
            obfuscate: Some(false),
            proguard_flags: vec!["-dontnote".into()],
            ..OptimizeConfig::default()
        };
        assert_eq!(
            opt.optimizer_only_properties(),
            vec!["optimize.obfuscate", "optimize.proguard_flags"]
        );
    }

    #[test]
    fn compile_dex_and_output_name() {
        let mut config = ModuleDexConfig::new("Calc", ModuleKind::Library);
        assert!(!config.should_compile_dex());
        config.installable = true;
        assert!(config.should_compile_dex());
        config.installable = false;
        config.compile_dex = Some(true);
        assert!(config.should_compile_dex());

        assert_eq!(config.output_name(), "Calc");
        config.override_name = Some("Calc2".into());
        assert_eq!(config.output_name(), "Calc2");
    }
}
