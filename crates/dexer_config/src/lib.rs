//! Parsing and validation of `dex.toml` module configuration files.
//!
//! This crate reads a module's dex properties and produces an immutable
//! [`ModuleDexConfig`] snapshot with module-relative paths resolved. It also
//! loads the optional `toolchain.toml` describing tool locations.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod toolchain;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_module_config, load_module_config_from_str, MODULE_CONFIG_FILE};
pub use resolve::{resolve_module, ModuleDexConfig, OptimizeConfig};
pub use toolchain::{load_toolchain, load_toolchain_from_str, Toolchain};
pub use types::*;
