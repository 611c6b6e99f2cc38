//! Tool locations and platform-wide dexing defaults from `toolchain.toml`.

use crate::error::ConfigError;
use dexer_common::ArtifactPath;
use serde::Deserialize;
use std::path::Path;

/// Locations of the tools the dex actions invoke, plus platform-wide defaults.
///
/// Every field has a default, so an empty `toolchain.toml` (or none at all)
/// describes the standard source-tree layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Toolchain {
    /// The plain dex compiler.
    pub d8_cmd: ArtifactPath,
    /// The shrinking/obfuscating optimizer.
    pub r8_cmd: ArtifactPath,
    /// Jar backing `d8_cmd`, shipped to remote workers.
    pub d8_jar: ArtifactPath,
    /// Jar backing `r8_cmd`, shipped to remote workers.
    pub r8_jar: ArtifactPath,
    /// The Java runtime, a toolchain input of remote actions.
    pub java_cmd: ArtifactPath,
    /// Archive filter used to strip stale dex entries from the input.
    pub zip2zip_cmd: ArtifactPath,
    /// Archive writer used to collect dex files and usage reports.
    pub soong_zip_cmd: ArtifactPath,
    /// Archive merger producing the final jar.
    pub merge_zips_cmd: ArtifactPath,
    /// Archive aligner for uncompressed outputs.
    pub zipalign_cmd: ArtifactPath,
    /// Remote-execution wrapper.
    pub rewrapper_cmd: ArtifactPath,
    /// Flags always passed to the plain dex compiler, before module flags.
    pub d8_flags: Vec<String>,
    /// Flags always passed to the optimizer, before module flags.
    pub r8_flags: Vec<String>,
    /// The platform default flag file, always `-include`d first.
    pub proguard_default_flags: ArtifactPath,
    /// A flag file the default flag file includes on its own.
    pub proguard_basic_keeps: ArtifactPath,
    /// Prefix embedded in the source-file template in full optimizer mode.
    pub source_file_prefix: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            d8_cmd: ArtifactPath::new("prebuilts/r8/d8"),
            r8_cmd: ArtifactPath::new("prebuilts/r8/r8-compat-proguard"),
            d8_jar: ArtifactPath::new("prebuilts/r8/r8.jar"),
            r8_jar: ArtifactPath::new("prebuilts/r8/r8.jar"),
            java_cmd: ArtifactPath::new("prebuilts/jdk/bin/java"),
            zip2zip_cmd: ArtifactPath::new("out/host/bin/zip2zip"),
            soong_zip_cmd: ArtifactPath::new("out/host/bin/soong_zip"),
            merge_zips_cmd: ArtifactPath::new("out/host/bin/merge_zips"),
            zipalign_cmd: ArtifactPath::new("out/host/bin/zipalign"),
            rewrapper_cmd: ArtifactPath::new("prebuilts/remoteexecution-client/live/rewrapper"),
            d8_flags: vec![
                "-JXmx4096M".to_string(),
                "-JXX:+TieredCompilation".to_string(),
                "-JXX:TieredStopAtLevel=1".to_string(),
            ],
            r8_flags: vec!["-JXmx2048M".to_string()],
            proguard_default_flags: ArtifactPath::new("build/make/core/proguard.flags"),
            proguard_basic_keeps: ArtifactPath::new("build/make/core/proguard_basic_keeps.flags"),
            source_file_prefix: "go/retraceme ".to_string(),
        }
    }
}

/// Loads a toolchain description from a TOML file.
pub fn load_toolchain(path: &Path) -> Result<Toolchain, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_toolchain_from_str(&content)
}

/// Parses a toolchain description from a string.
pub fn load_toolchain_from_str(content: &str) -> Result<Toolchain, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}
