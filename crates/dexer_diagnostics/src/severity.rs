//! How serious a diagnostic is.

use crate::code::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity of a diagnostic, least severe first.
///
/// Only errors stop a module's actions from being emitted. Warnings mark
/// properties that were ignored; notes mark environment overrides.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// An environment override changed the derived flags.
    Note,
    /// A property was ignored; the action is still emitted.
    Warning,
    /// A configuration problem; no action is emitted.
    Error,
}

impl Severity {
    /// Returns `true` if this severity is [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// The lowercase label used in rendered headers.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// SGR parameters for the rendered header.
    pub(crate) fn ansi_style(self) -> &'static str {
        match self {
            Severity::Note => "1;36",
            Severity::Warning => "1;33",
            Severity::Error => "1;31",
        }
    }
}

impl From<Category> for Severity {
    fn from(category: Category) -> Self {
        match category {
            Category::Note => Severity::Note,
            Category::Warning => Severity::Warning,
            Category::Error => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_rank_highest() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
    }

    #[test]
    fn follows_code_category() {
        assert_eq!(Severity::from(Category::Error), Severity::Error);
        assert_eq!(Severity::from(Category::Note), Severity::Note);
    }

    #[test]
    fn labels() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(
            serde_json::to_value(Severity::Error).unwrap(),
            serde_json::json!("error")
        );
    }
}
