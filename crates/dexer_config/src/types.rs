//! Configuration types deserialized from `dex.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level module file parsed from `dex.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleFile {
    /// Module identity and SDK settings.
    pub module: ModuleMeta,
    /// Dexing properties.
    #[serde(default)]
    pub dex: DexProperties,
}

/// Module identity, as declared by the module definition.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleMeta {
    /// The module name.
    pub name: String,
    /// The module type, which decides the optimizer default.
    pub kind: ModuleKind,
    /// The namespace path of the module, used in usage-report paths.
    #[serde(default)]
    pub namespace: String,
    /// A name that replaces `name` when this module overrides another one.
    #[serde(default)]
    pub override_name: Option<String>,
    /// Whether the module is installed on the device.
    #[serde(default)]
    pub installable: bool,
    /// The minimum SDK spec, e.g. `"21"`, `"current"` or `"system_30"`.
    #[serde(default = "default_min_sdk_version")]
    pub min_sdk_version: String,
}

fn default_min_sdk_version() -> String {
    "current".to_string()
}

/// The module type a dex configuration belongs to.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// An application package.
    App,
    /// A helper application installed alongside tests.
    TestHelperApp,
    /// An instrumentation test package.
    Test,
    /// A device Java library.
    Library,
    /// A device Java test.
    JavaTest,
    /// A host Java library that still needs dexing.
    JavaLibraryHost,
}

impl ModuleKind {
    /// Returns whether the optimizer is used when `optimize.enabled` is unset.
    pub fn optimize_enabled_by_default(self) -> bool {
        matches!(self, ModuleKind::App | ModuleKind::TestHelperApp)
    }
}

/// The `[dex]` section: properties that control dexing.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DexProperties {
    /// Compile dex regardless of `installable`. Defaults to false.
    #[serde(default)]
    pub compile_dex: Option<bool>,
    /// Extra flags passed to the dexer, in order.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub dxflags: Vec<String>,
    /// Files with rules for the classes to keep in the main dex file.
    #[serde(default)]
    pub main_dex_rules: Vec<String>,
    /// Optimizer settings.
    #[serde(default)]
    pub optimize: OptimizeProperties,
    /// Store dex entries uncompressed and align the final jar.
    #[serde(default)]
    pub uncompress_dex: Option<bool>,
    /// Strip `*.kotlin_module` and `*.kotlin_builtins` from the output.
    #[serde(default)]
    pub exclude_kotlinc_generated_files: Option<bool>,
}

/// The `[dex.optimize]` section.
///
/// Every toggle is tri-state: unset, `true` or `false`. Defaults are applied
/// where the value is consumed, not here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizeProperties {
    /// Use the optimizer instead of the plain dexer. Default depends on the module kind.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Keep building when the optimizer emits warnings. Defaults to true.
    #[serde(default)]
    pub ignore_warnings: Option<bool>,
    /// Run the optimizer in proguard compatibility mode. Defaults to true.
    #[serde(default)]
    pub proguard_compatibility: Option<bool>,
    /// Remove unused code. Defaults to false.
    #[serde(default)]
    pub shrink: Option<bool>,
    /// Optimize bytecode. Defaults to false.
    #[serde(default)]
    pub optimize: Option<bool>,
    /// Rename symbols. Defaults to false.
    #[serde(default)]
    pub obfuscate: Option<bool>,
    /// Do not use aapt-generated flag files. Defaults to false.
    #[serde(default)]
    pub no_aapt_flags: Option<bool>,
    /// Raw optimizer flags, appended verbatim.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub proguard_flags: Vec<String>,
    /// Module-relative flag files, each passed with `-include`.
    #[serde(default)]
    pub proguard_flags_files: Vec<String>,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `dxflags = "--no-locals"` as well as `dxflags = ["--no-locals", "--debug"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
