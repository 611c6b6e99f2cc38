//! SDK version specs and API levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The integer used on command lines for an API level that is not finalized yet.
pub const FUTURE_API_LEVEL: u32 = 10_000;

/// The SDK surface a spec refers to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdkKind {
    /// The public SDK (`current`, `30`, `Tiramisu`).
    Public,
    /// The system SDK (`system_current`, `system_30`).
    System,
    /// The test SDK (`test_current`).
    Test,
    /// The core SDK (`core_current`).
    Core,
    /// The module-lib SDK (`module_current`).
    ModuleLib,
    /// The system-server SDK (`system_server_current`).
    SystemServer,
    /// The core platform API (`core_platform`).
    CorePlatform,
    /// No SDK at all (`none`).
    None,
}

impl SdkKind {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "system" => Some(SdkKind::System),
            "test" => Some(SdkKind::Test),
            "core" => Some(SdkKind::Core),
            "module" => Some(SdkKind::ModuleLib),
            "system_server" => Some(SdkKind::SystemServer),
            _ => None,
        }
    }

    fn prefix(self) -> Option<&'static str> {
        match self {
            SdkKind::Public => None,
            SdkKind::System => Some("system"),
            SdkKind::Test => Some("test"),
            SdkKind::Core => Some("core"),
            SdkKind::ModuleLib => Some("module"),
            SdkKind::SystemServer => Some("system_server"),
            SdkKind::CorePlatform => Some("core_platform"),
            SdkKind::None => Some("none"),
        }
    }

    /// Returns `true` if specs of this kind carry a version at all.
    pub fn has_version(self) -> bool {
        !matches!(self, SdkKind::CorePlatform | SdkKind::None)
    }
}

/// The version part of an SDK spec, before resolution against a platform.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SdkVersion {
    /// A numbered, finalized API level.
    Level(u32),
    /// The in-development SDK of the platform being built.
    Current,
    /// A preview codename such as `UpsideDownCake`.
    Codename(String),
}

/// A declared SDK spec such as `21`, `current`, `system_30` or `Tiramisu`.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SdkSpec {
    /// The SDK surface.
    pub kind: SdkKind,
    /// The requested version. Meaningless for [`SdkKind::None`] and
    /// [`SdkKind::CorePlatform`], which parse with [`SdkVersion::Current`].
    pub version: SdkVersion,
    raw: String,
}

impl SdkSpec {
    /// Returns the spec string exactly as it was declared.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for SdkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Error type for parsing SDK spec strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSdkSpecError {
    /// The input string that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseSdkSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid sdk version spec: '{}'", self.input)
    }
}

impl std::error::Error for ParseSdkSpecError {}

fn parse_version(s: &str) -> Option<SdkVersion> {
    if s == "current" {
        return Some(SdkVersion::Current);
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return match s.parse::<u32>() {
            Ok(0) | Err(_) => None,
            Ok(level) => Some(SdkVersion::Level(level)),
        };
    }
    let mut chars = s.chars();
    let first = chars.next()?;
    if first.is_ascii_uppercase() && chars.all(|c| c.is_ascii_alphanumeric()) {
        return Some(SdkVersion::Codename(s.to_string()));
    }
    None
}

impl FromStr for SdkSpec {
    type Err = ParseSdkSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseSdkSpecError {
            input: s.to_string(),
        };
        let spec = |kind, version| SdkSpec {
            kind,
            version,
            raw: s.to_string(),
        };

        match s {
            "" => return Err(err()),
            "none" => return Ok(spec(SdkKind::None, SdkVersion::Current)),
            "core_platform" => return Ok(spec(SdkKind::CorePlatform, SdkVersion::Current)),
            _ => {}
        }

        if let Some(version) = parse_version(s) {
            return Ok(spec(SdkKind::Public, version));
        }

        // `<kind>_<version>`; the kind itself may contain an underscore
        // (`system_server_current`), so split at the last one.
        let (prefix, version) = s.rsplit_once('_').ok_or_else(err)?;
        let kind = SdkKind::from_prefix(prefix).ok_or_else(err)?;
        match parse_version(version) {
            Some(v @ (SdkVersion::Current | SdkVersion::Level(_))) => Ok(spec(kind, v)),
            _ => Err(err()),
        }
    }
}

/// A resolved API level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ApiLevel {
    /// A finalized, numbered API level.
    Final(u32),
    /// An API level that is still in development.
    Future,
}

impl ApiLevel {
    /// Returns the numeric level, mapping in-development levels to
    /// [`FUTURE_API_LEVEL`].
    pub fn final_or_future_int(self) -> u32 {
        match self {
            ApiLevel::Final(level) => level,
            ApiLevel::Future => FUTURE_API_LEVEL,
        }
    }

    /// Returns `true` if this level is still in development.
    pub fn is_preview(self) -> bool {
        matches!(self, ApiLevel::Future)
    }
}

impl fmt::Display for ApiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiLevel::Final(level) => write!(f, "{level}"),
            ApiLevel::Future => write!(f, "current"),
        }
    }
}

impl fmt::Display for SdkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().unwrap_or("public"))
    }
}
