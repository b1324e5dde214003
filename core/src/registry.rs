//! Registration bookkeeping: built modules, builders, loaded descriptors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use manifold_types::ManifoldError;

use crate::builder::SharedBuilder;
use crate::module::Module;

/// Either outcome of a registration: a built module or a reusable builder.
#[derive(Debug, Clone)]
pub enum Registered {
    Module(Arc<Module>),
    Builder(SharedBuilder),
}

impl Registered {
    pub fn into_module(self) -> Result<Arc<Module>, ManifoldError> {
        match self {
            Self::Module(module) => Ok(module),
            Self::Builder(_) => Err(ManifoldError::construction(
                "registration yielded a builder, not a built module",
            )),
        }
    }

    pub fn into_builder(self) -> Result<SharedBuilder, ManifoldError> {
        match self {
            Self::Builder(builder) => Ok(builder),
            Self::Module(_) => Err(ManifoldError::construction(
                "registration yielded a built module, not a builder",
            )),
        }
    }
}

/// Three independent lookup tables owned by one runtime instance.
///
/// An id in `loaded` means its descriptor has been fetched at least once; an
/// id may appear in `builders` without ever appearing in `modules` (registered
/// with `build = false`). There is no removal: the registry only grows for the
/// lifetime of the owning instance, and re-registration overwrites in place
/// (last write wins).
#[derive(Debug, Default)]
pub struct Registry {
    modules: IndexMap<String, Arc<Module>>,
    builders: HashMap<String, SharedBuilder>,
    loaded: HashSet<String>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_module(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    #[must_use]
    pub fn module(&self, id: &str) -> Option<Arc<Module>> {
        self.modules.get(id).cloned()
    }

    /// Stable snapshot of the built module ids, in insertion order.
    #[must_use]
    pub fn list_modules(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    #[must_use]
    pub fn builder(&self, id: &str) -> Option<SharedBuilder> {
        self.builders.get(id).cloned()
    }

    #[must_use]
    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.contains(id)
    }

    /// Completing path of a source registration: remember the descriptor was
    /// fetched and store its builder.
    pub fn insert_builder(&mut self, id: &str, builder: SharedBuilder) {
        self.loaded.insert(id.to_string());
        self.builders.insert(id.to_string(), builder);
    }

    /// Completing path of a build: remember the descriptor was fetched and
    /// store the built module.
    pub fn insert_module(&mut self, id: &str, module: Arc<Module>) {
        self.loaded.insert(id.to_string());
        self.modules.insert(id.to_string(), module);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_modules_preserves_insertion_order() {
        let mut registry = Registry::new();
        registry.insert_module("zeta", Arc::new(Module::new()));
        registry.insert_module("alpha", Arc::new(Module::new()));
        registry.insert_module("mid", Arc::new(Module::new()));
        assert_eq!(registry.list_modules(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn inserting_a_module_marks_the_id_loaded() {
        let mut registry = Registry::new();
        assert!(!registry.is_loaded("app"));
        registry.insert_module("app", Arc::new(Module::new()));
        assert!(registry.is_loaded("app"));
        assert!(registry.has_module("app"));
        assert!(registry.builder("app").is_none());
    }

    #[test]
    fn reinsertion_overwrites_in_place() {
        let mut registry = Registry::new();
        let first = Arc::new(Module::new());
        let second = Arc::new(Module::new().sync_command("x", Ok));
        registry.insert_module("app", first);
        registry.insert_module("app", second.clone());
        assert!(Arc::ptr_eq(&registry.module("app").unwrap(), &second));
        assert_eq!(registry.list_modules(), vec!["app"]);
    }
}
