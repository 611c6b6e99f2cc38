//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::resolve::{resolve_module, ModuleDexConfig};
use crate::types::ModuleFile;
use dexer_common::ArtifactPath;
use std::path::Path;

/// Name of the module configuration file within a module directory.
pub const MODULE_CONFIG_FILE: &str = "dex.toml";

/// Loads and validates a `dex.toml` configuration from a module directory.
///
/// Reads `<module_dir>/dex.toml`, parses it, validates required fields, and
/// resolves module-relative paths against `module_dir`.
pub fn load_module_config(module_dir: &Path) -> Result<ModuleDexConfig, ConfigError> {
    let config_path = module_dir.join(MODULE_CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_module_config_from_str(&content, &module_dir.to_string_lossy())
}

/// Parses and validates a `dex.toml` configuration from a string.
///
/// `module_dir` is the directory module-relative paths are resolved against.
pub fn load_module_config_from_str(
    content: &str,
    module_dir: &str,
) -> Result<ModuleDexConfig, ConfigError> {
    let file: ModuleFile =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_module(&file)?;
    resolve_module(file, &ArtifactPath::new(module_dir))
}

/// Validates that required fields are present.
fn validate_module(file: &ModuleFile) -> Result<(), ConfigError> {
    if file.module.name.trim().is_empty() {
        return Err(ConfigError::MissingField("module.name".to_string()));
    }
    if let Some(name) = &file.module.override_name {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidProperty {
                property: "module.override_name".to_string(),
                message: "must not be empty when set".to_string(),
            });
        }
    }
    Ok(())
}
