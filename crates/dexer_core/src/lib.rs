//! Build-action compiler for dexing Java bytecode.
//!
//! Given a module's [`ModuleDexConfig`](dexer_config::ModuleDexConfig), its
//! classpath and an SDK target, this crate decides which tool runs (the plain
//! dexer or the shrinking optimizer), derives the exact flags that tool needs,
//! and emits [`BuildAction`] descriptors with every input and output declared.
//!
//! The pipeline is:
//! 1. [`selector::select`] picks the pipeline and execution strategy
//! 2. [`flags`] derives the ordered flag list and the files the flags read
//! 3. [`builder::ActionBuilder`] composes the dex action
//! 4. [`align::maybe_align`] chains an alignment action for uncompressed output
//!
//! Nothing here executes a command. Execution, caching and scheduling belong
//! to the build-graph engine that consumes the descriptors.

#![warn(missing_docs)]

pub mod action;
pub mod align;
pub mod builder;
pub mod context;
pub mod error;
pub mod flags;
pub mod graph;
pub mod ninja;
pub mod rules;
pub mod selector;

pub use action::{
    ActionKind, BuildAction, Depfile, DepsFormat, ExecStrategy, RemoteExecution, RemoteParams,
};
pub use align::{maybe_align, AlignResult};
pub use builder::{compile_dex, ActionBuilder, DexPlan, DexRequest, OutputLayout};
pub use context::{
    BuildContext, BuildEnv, Classpath, DependencyResolver, DependencyTag, ExtraFlagFile,
    FlagFileOrigin, PlatformSdk, RemoteConfig, SdkError, SdkResolver, TaggedDependencies,
};
pub use error::DexError;
pub use flags::FlagSet;
pub use graph::ActionGraph;
pub use ninja::NinjaWriter;
pub use selector::{select, Pipeline, ToolSelection};
