//! Core domain types for Manifold.
//!
//! This crate contains pure domain types with no IO and no async: the package
//! descriptor model, dependency specs and their normalization, the error
//! taxonomy, and batch run items. Everything here can be used from any layer
//! of the runtime.

mod descriptor;
mod error;

pub use descriptor::{
    BuilderRefDescriptor, DependencyLists, DescriptorParseError, PackageBinding, PackageDep,
    PackageDescriptor, SourceBinding, SourceDep, SourceDescriptor,
};
pub use error::{ManifoldError, require_identifier};

use serde::Deserialize;
use serde_json::Value;

/// One entry in a sequential batch run: execute `cmd` on package `pkg` with
/// `data` as the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RunItem {
    pub pkg: String,
    pub cmd: String,
    #[serde(default)]
    pub data: Value,
}
