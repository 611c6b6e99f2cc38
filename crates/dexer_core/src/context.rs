//! Read-only collaborators of the action compiler.
//!
//! Everything the compiler would otherwise query ad hoc (environment toggles,
//! the platform SDK, other modules' outputs) is passed in explicitly, so flag
//! derivation stays a pure function of its arguments.

use dexer_common::{ApiLevel, ArtifactPath, SdkSpec, SdkVersion};
use dexer_config::Toolchain;

/// Execution-strategy metadata for remote actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Strategy for plain-dexer actions (`local`, `remote`, `racing`, ...).
    pub d8_exec_strategy: String,
    /// Strategy for optimizer actions.
    pub r8_exec_strategy: String,
    /// Worker pool Java actions are scheduled on.
    pub java_pool: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            d8_exec_strategy: "local".to_string(),
            r8_exec_strategy: "local".to_string(),
            java_pool: "java16".to_string(),
        }
    }
}

/// Environment-sourced build toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    /// `NO_OPTIMIZE_DX`: pass `--debug` to the dexer.
    pub no_optimize_dx: bool,
    /// `GENERATE_DEX_DEBUG`: pass `--debug --verbose` to the dexer.
    pub generate_dex_debug: bool,
    /// Engineering build variant: keep debug info in optimized output.
    pub eng: bool,
    /// Global remote-execution switch (`USE_RBE`).
    pub use_rbe: bool,
    /// Remote execution for plain-dexer actions (`RBE_D8`).
    pub rbe_d8: bool,
    /// Remote execution for optimizer actions (`RBE_R8`).
    pub rbe_r8: bool,
    /// Remote-execution metadata.
    pub remote: RemoteConfig,
}

/// Returns `true` for the values the build system treats as an enabled switch.
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

impl BuildEnv {
    /// Builds the toggles from a key lookup, typically `|k| std::env::var(k).ok()`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).is_some_and(|v| !v.is_empty());
        let truthy = |key: &str| lookup(key).is_some_and(|v| is_truthy(&v));
        let defaults = RemoteConfig::default();
        let or_default = |key: &str, default: String| {
            lookup(key).filter(|v| !v.is_empty()).unwrap_or(default)
        };

        Self {
            no_optimize_dx: non_empty("NO_OPTIMIZE_DX"),
            generate_dex_debug: non_empty("GENERATE_DEX_DEBUG"),
            eng: lookup("TARGET_BUILD_VARIANT").as_deref() == Some("eng"),
            use_rbe: truthy("USE_RBE"),
            rbe_d8: truthy("RBE_D8"),
            rbe_r8: truthy("RBE_R8"),
            remote: RemoteConfig {
                d8_exec_strategy: or_default("RBE_D8_EXEC_STRATEGY", defaults.d8_exec_strategy),
                r8_exec_strategy: or_default("RBE_R8_EXEC_STRATEGY", defaults.r8_exec_strategy),
                java_pool: or_default("RBE_JAVA_POOL", defaults.java_pool),
            },
        }
    }
}

/// Why an SDK spec has no effective API level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// The spec string itself is malformed.
    #[error("invalid sdk version spec '{0}'")]
    Malformed(String),
    /// The codename is not one of the platform's active codenames.
    #[error("unknown sdk codename '{codename}' (active codenames: {active})")]
    UnknownCodename {
        /// The codename that was requested.
        codename: String,
        /// The platform's active codenames, comma-separated.
        active: String,
    },
    /// The spec refers to no SDK, so there is no API level to target.
    #[error("sdk spec '{0}' has no effective version")]
    NoEffectiveVersion(String),
}

/// Resolves a declared SDK spec to an API level.
pub trait SdkResolver {
    /// Returns the effective API level of `spec`.
    fn effective_version(&self, spec: &SdkSpec) -> Result<ApiLevel, SdkError>;
}

/// SDK facts about the platform being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSdk {
    /// The platform's SDK version (the most recent finalized level).
    pub sdk_version: u32,
    /// Whether the in-development SDK has been finalized.
    pub sdk_final: bool,
    /// Codenames of in-development SDKs.
    pub active_codenames: Vec<String>,
}

impl Default for PlatformSdk {
    fn default() -> Self {
        Self {
            sdk_version: 34,
            sdk_final: false,
            active_codenames: vec!["VanillaIceCream".to_string()],
        }
    }
}

impl PlatformSdk {
    /// Builds platform SDK facts from a key lookup.
    ///
    /// Reads `PLATFORM_SDK_VERSION`, `PLATFORM_SDK_FINAL` and the
    /// comma-separated `PLATFORM_VERSION_ACTIVE_CODENAMES`; unset or
    /// unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let sdk_version = lookup("PLATFORM_SDK_VERSION")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.sdk_version);
        let sdk_final = lookup("PLATFORM_SDK_FINAL").is_some_and(|v| is_truthy(&v));
        let active_codenames = match lookup("PLATFORM_VERSION_ACTIVE_CODENAMES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty() && *c != "REL")
                .map(str::to_string)
                .collect(),
            None => defaults.active_codenames,
        };
        Self {
            sdk_version,
            sdk_final,
            active_codenames,
        }
    }
}

impl SdkResolver for PlatformSdk {
    fn effective_version(&self, spec: &SdkSpec) -> Result<ApiLevel, SdkError> {
        if !spec.kind.has_version() {
            return Err(SdkError::NoEffectiveVersion(spec.raw().to_string()));
        }
        match &spec.version {
            SdkVersion::Level(level) => Ok(ApiLevel::Final(*level)),
            SdkVersion::Current if self.sdk_final => Ok(ApiLevel::Final(self.sdk_version)),
            SdkVersion::Current => Ok(ApiLevel::Future),
            SdkVersion::Codename(codename) if self.active_codenames.contains(codename) => {
                Ok(ApiLevel::Future)
            }
            SdkVersion::Codename(codename) => Err(SdkError::UnknownCodename {
                codename: codename.clone(),
                active: self.active_codenames.join(","),
            }),
        }
    }
}

/// Parses and resolves a declared SDK spec string in one step.
pub fn resolve_sdk_spec(resolver: &dyn SdkResolver, raw: &str) -> Result<ApiLevel, SdkError> {
    let spec: SdkSpec = raw
        .parse()
        .map_err(|_| SdkError::Malformed(raw.to_string()))?;
    resolver.effective_version(&spec)
}

/// A dependency edge tag the action compiler asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyTag {
    /// Libraries whose header jars raise the SDK level the optimizer links
    /// against, so symbols added by desugaring or support libraries do not
    /// trigger false-positive warnings.
    ProguardRaise,
}

/// Answers "which artifacts do my dependencies with this tag provide?".
pub trait DependencyResolver {
    /// Returns header-jar outputs of direct dependencies tagged `tag`, in
    /// dependency order.
    fn tagged_dependencies(&self, tag: DependencyTag) -> Vec<ArtifactPath>;
}

/// A fixed table of tagged dependencies.
#[derive(Debug, Clone, Default)]
pub struct TaggedDependencies {
    /// Header jars of `ProguardRaise`-tagged dependencies.
    pub proguard_raise: Vec<ArtifactPath>,
}

impl DependencyResolver for TaggedDependencies {
    fn tagged_dependencies(&self, tag: DependencyTag) -> Vec<ArtifactPath> {
        match tag {
            DependencyTag::ProguardRaise => self.proguard_raise.clone(),
        }
    }
}

/// The ordered classpath a module is dexed against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    /// Boot classpath jars.
    pub boot: Vec<ArtifactPath>,
    /// Extra classpath jars needed to resolve references while dexing.
    pub dex: Vec<ArtifactPath>,
}

/// Who generated an extra optimizer flag file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFileOrigin {
    /// Generated by aapt from the app manifest and resources.
    Aapt,
    /// Exported by a library dependency.
    Library,
    /// Anything else.
    Other,
}

/// A flag file supplied by a collaborator rather than the module itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraFlagFile {
    /// Path of the flag file.
    pub path: ArtifactPath,
    /// Who generated it.
    pub origin: FlagFileOrigin,
}

impl ExtraFlagFile {
    /// Creates an extra flag file entry.
    pub fn new(path: impl Into<ArtifactPath>, origin: FlagFileOrigin) -> Self {
        Self {
            path: path.into(),
            origin,
        }
    }
}

/// Everything shared by all modules of one build.
pub struct BuildContext<'a> {
    /// Environment toggles.
    pub env: &'a BuildEnv,
    /// Tool locations and platform defaults.
    pub toolchain: &'a Toolchain,
    /// SDK spec resolution.
    pub sdk: &'a dyn SdkResolver,
    /// Tagged dependency lookup for the module being planned.
    pub deps: &'a dyn DependencyResolver,
}
