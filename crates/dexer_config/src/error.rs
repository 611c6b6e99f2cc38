//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `dex.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A property value failed validation.
    #[error("invalid property '{property}': {message}")]
    InvalidProperty {
        /// The offending property, e.g. `optimize.proguard_flags_files`.
        property: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Returns the property this error is attributed to, if any.
    pub fn property(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField(field) => Some(field),
            ConfigError::InvalidProperty { property, .. } => Some(property),
            ConfigError::IoError(_) | ConfigError::ParseError(_) => None,
        }
    }
}
