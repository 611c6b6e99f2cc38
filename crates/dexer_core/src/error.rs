//! Error types for action planning.

use crate::context::SdkError;
use dexer_common::InternalError;
use dexer_config::ConfigError;
use dexer_diagnostics::code::{INTERNAL, INVALID_CONFIG, UNRESOLVED_MIN_SDK};
use dexer_diagnostics::Diagnostic;

/// Errors that prevent a module's dex actions from being emitted.
///
/// All of these are detected while planning, before any descriptor reaches
/// the build-graph engine. Tool failures at execution time are the engine's
/// concern and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum DexError {
    /// `min_sdk_version` could not be resolved to an API level.
    #[error("min_sdk_version: {0}")]
    MinSdk(#[from] SdkError),

    /// The module configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A bug in the action compiler.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl DexError {
    /// Returns the module property this error is attributed to, if any.
    pub fn property(&self) -> Option<&str> {
        match self {
            DexError::MinSdk(_) => Some("min_sdk_version"),
            DexError::Config(err) => err.property(),
            DexError::Internal(_) => None,
        }
    }

    /// Converts this error into a diagnostic attributed to `module`.
    pub fn to_diagnostic(&self, module: &str) -> Diagnostic {
        let (code, message) = match self {
            DexError::MinSdk(err) => (UNRESOLVED_MIN_SDK, err.to_string()),
            DexError::Config(err) => (INVALID_CONFIG, err.to_string()),
            DexError::Internal(err) => (INTERNAL, err.to_string()),
        };
        let mut diag = Diagnostic::new(code, message).in_module(module);
        if let Some(property) = self.property() {
            diag = diag.at_property(property);
        }
        if let DexError::MinSdk(SdkError::UnknownCodename { .. }) = self {
            diag = diag.with_help("use a numbered API level or one of the active codenames");
        }
        diag
    }
}
