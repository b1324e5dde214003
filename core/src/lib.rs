//! Manifold core - declarative module assembly and command dispatch.
//!
//! # Architecture
//!
//! Packages are described by JSON descriptors naming a source module and its
//! dependencies, built through a three-stage factory convention (inject
//! dependencies, apply settings, produce the module), registered under string
//! identifiers, and invoked by sending a named command with a data payload.
//!
//! - [`Runtime`] - registration state machine, dependency resolution, and the
//!   execute/fallback/batch surface
//! - [`Registry`] - per-instance lookup tables: built modules, builders, and
//!   loaded descriptors
//! - [`Builder`] - reusable construction pipeline around a factory
//! - [`Module`] - a capability map from command name to async handler
//! - [`DescriptorLoader`] / [`SourceLoader`] - the ports behind which
//!   descriptor storage and code loading live
//!
//! Control flow: `execute` auto-registers the target, registration loads the
//! descriptor and resolves its dependency graph depth-first (recursing
//! through `register` for package dependencies, importing directly for
//! source dependencies), the builder produces the module, the registry stores
//! it, and the executor dispatches the named command.

pub mod builder;
pub mod config;
pub mod factory;
pub mod loader;
pub mod module;
pub mod registry;
mod resolver;
pub mod runtime;

pub use builder::{Builder, SharedBuilder};
pub use config::RuntimeConfig;
pub use factory::{Constructor, Dependencies, Dependency, ExportFn, FactoryFn, SourceModule};
pub use loader::{DescriptorLoader, FsDescriptorLoader, LoadFut, SourceCatalog, SourceLoader};
pub use module::{CommandFn, CommandFuture, Module};
pub use registry::{Registered, Registry};
pub use runtime::Runtime;

pub use manifold_types as types;
