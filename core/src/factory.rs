//! The three-stage factory convention and source module exports.
//!
//! A factory is a curried construction contract: inject dependencies to get a
//! settings-consuming constructor, apply settings to get the module. Keeping
//! the stages separate lets one builder stamp out many module instances that
//! share dependencies but differ in configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use manifold_types::ManifoldError;
use serde_json::Value;

use crate::builder::SharedBuilder;
use crate::module::Module;

/// Settings-consuming constructor returned by a factory's first stage.
pub type Constructor = Box<dyn Fn(&Value) -> Result<Module, ManifoldError> + Send + Sync>;

/// First stage of the factory convention: consume a dependency map, yield a
/// [`Constructor`].
pub type FactoryFn =
    Arc<dyn Fn(&Dependencies) -> Result<Constructor, ManifoldError> + Send + Sync>;

/// A plain callable exported by a source module.
pub type ExportFn = Arc<dyn Fn(Value) -> Result<Value, ManifoldError> + Send + Sync>;

/// One resolved dependency, bound under a name in a factory's dependency map.
#[derive(Clone)]
pub enum Dependency {
    /// A built module from a package registered with `build = true`.
    Module(Arc<Module>),
    /// A reusable builder from a package registered with `build = false`.
    Builder(SharedBuilder),
    /// A callable export from a source module.
    Export(ExportFn),
}

impl Dependency {
    fn shape(&self) -> &'static str {
        match self {
            Self::Module(_) => "a built module",
            Self::Builder(_) => "a builder",
            Self::Export(_) => "a source export",
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shape())
    }
}

/// Named dependency map handed to a factory's first stage.
///
/// The typed accessors fail with a [`ManifoldError::Construction`] when a
/// factory asks for a binding that is absent or of the wrong shape, so a
/// misdeclared descriptor surfaces at build time with the binding name.
#[derive(Default, Clone)]
pub struct Dependencies {
    entries: HashMap<String, Dependency>,
}

impl Dependencies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, dependency: Dependency) {
        self.entries.insert(name.into(), dependency);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted snapshot of the binding names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn module(&self, name: &str) -> Result<Arc<Module>, ManifoldError> {
        match self.entries.get(name) {
            Some(Dependency::Module(module)) => Ok(module.clone()),
            Some(other) => Err(wrong_shape(name, "a built module", other)),
            None => Err(missing(name)),
        }
    }

    pub fn builder(&self, name: &str) -> Result<SharedBuilder, ManifoldError> {
        match self.entries.get(name) {
            Some(Dependency::Builder(builder)) => Ok(builder.clone()),
            Some(other) => Err(wrong_shape(name, "a builder", other)),
            None => Err(missing(name)),
        }
    }

    pub fn export(&self, name: &str) -> Result<ExportFn, ManifoldError> {
        match self.entries.get(name) {
            Some(Dependency::Export(export)) => Ok(export.clone()),
            Some(other) => Err(wrong_shape(name, "a source export", other)),
            None => Err(missing(name)),
        }
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v.shape())))
            .finish()
    }
}

fn missing(name: &str) -> ManifoldError {
    ManifoldError::construction(format!("missing dependency {name}"))
}

fn wrong_shape(name: &str, wanted: &str, got: &Dependency) -> ManifoldError {
    ManifoldError::construction(format!(
        "dependency {name} is {}, not {wanted}",
        got.shape()
    ))
}

/// What the source loader yields for a source identifier: an optional
/// three-stage factory plus plain named exports.
#[derive(Default, Clone)]
pub struct SourceModule {
    factory: Option<FactoryFn>,
    exports: HashMap<String, ExportFn>,
    default_export: Option<ExportFn>,
}

impl SourceModule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the factory export.
    #[must_use]
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Dependencies) -> Result<Constructor, ManifoldError> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Attach a named export.
    #[must_use]
    pub fn with_export<F>(mut self, name: impl Into<String>, export: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ManifoldError> + Send + Sync + 'static,
    {
        self.exports.insert(name.into(), Arc::new(export));
        self
    }

    /// Attach the default export.
    #[must_use]
    pub fn with_default_export<F>(mut self, export: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ManifoldError> + Send + Sync + 'static,
    {
        self.default_export = Some(Arc::new(export));
        self
    }

    #[must_use]
    pub fn factory(&self) -> Option<FactoryFn> {
        self.factory.clone()
    }

    #[must_use]
    pub fn export_named(&self, name: &str) -> Option<ExportFn> {
        self.exports.get(name).cloned()
    }

    #[must_use]
    pub fn default_export(&self) -> Option<ExportFn> {
        self.default_export.clone()
    }
}

impl fmt::Debug for SourceModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exports: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        exports.sort_unstable();
        f.debug_struct("SourceModule")
            .field("factory", &self.factory.is_some())
            .field("exports", &exports)
            .field("default_export", &self.default_export.is_some())
            .finish()
    }
}
