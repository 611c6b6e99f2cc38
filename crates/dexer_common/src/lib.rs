//! Shared foundational types used across the dexer toolchain.
//!
//! This crate provides build-graph artifact paths, SDK version specs and API
//! levels, content hashing for action fingerprints, and common result types.

#![warn(missing_docs)]

pub mod hash;
pub mod path;
pub mod result;
pub mod sdk;

pub use hash::ContentHash;
pub use path::ArtifactPath;
pub use result::{DexerResult, InternalError};
pub use sdk::{ApiLevel, ParseSdkSpecError, SdkKind, SdkSpec, SdkVersion, FUTURE_API_LEVEL};
