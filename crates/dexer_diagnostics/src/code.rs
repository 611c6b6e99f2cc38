//! Diagnostic codes with category prefixes for structured error identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
///
/// Each category maps to a single-character prefix used in diagnostic code
/// display (e.g., `E101` for an error, `N101` for a note).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Error diagnostics, prefixed with `E`.
    Error,
    /// Warning diagnostics, prefixed with `W`.
    Warning,
    /// Notes about environment overrides, prefixed with `N`.
    Note,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Note => 'N',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g., `E101`, `W102`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

/// `min_sdk_version` cannot be resolved to an API level.
pub const UNRESOLVED_MIN_SDK: DiagnosticCode = DiagnosticCode::new(Category::Error, 101);
/// The module configuration failed validation.
pub const INVALID_CONFIG: DiagnosticCode = DiagnosticCode::new(Category::Error, 102);
/// An internal error occurred while assembling the action graph.
pub const INTERNAL: DiagnosticCode = DiagnosticCode::new(Category::Error, 199);
/// Optimizer-only properties are set but the plain dexer was selected.
pub const IGNORED_OPTIMIZER_PROPERTY: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);
/// aapt-generated flag files were dropped because of `no_aapt_flags`.
pub const DROPPED_AAPT_FLAGS: DiagnosticCode = DiagnosticCode::new(Category::Warning, 102);
/// An environment override changed the derived flags.
pub const ENV_OVERRIDE: DiagnosticCode = DiagnosticCode::new(Category::Note, 101);

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_codes_render() {
        let rendered: Vec<String> = [
            UNRESOLVED_MIN_SDK,
            INVALID_CONFIG,
            INTERNAL,
            IGNORED_OPTIMIZER_PROPERTY,
            DROPPED_AAPT_FLAGS,
            ENV_OVERRIDE,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(rendered, ["E101", "E102", "E199", "W101", "W102", "N101"]);
    }

    #[test]
    fn number_is_zero_padded() {
        assert_eq!(DiagnosticCode::new(Category::Warning, 3).to_string(), "W003");
    }

    #[test]
    fn serializes_as_struct() {
        let value = serde_json::to_value(ENV_OVERRIDE).unwrap();
        assert_eq!(value, serde_json::json!({"category": "Note", "number": 101}));
    }
}
