//! Loader ports: descriptor loading and source import.
//!
//! The runtime depends only on these signatures, never on how descriptors are
//! stored or how source code is located. Paths handed to a loader are already
//! resolved against the owning runtime's directories.

use std::collections::HashMap;
use std::future::{Future, ready};
use std::pin::Pin;
use std::sync::Arc;

use manifold_types::{DescriptorParseError, ManifoldError, PackageDescriptor};
use tokio::fs;

use crate::factory::SourceModule;

/// Future returned by loader ports and the registration state machine.
pub type LoadFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, ManifoldError>> + Send + 'a>>;

/// Resolves a package identifier's descriptor from storage.
pub trait DescriptorLoader: Send + Sync {
    fn load<'a>(&'a self, path: &'a str) -> LoadFut<'a, PackageDescriptor>;
}

/// Resolves the factory/export bundle for a source identifier.
pub trait SourceLoader: Send + Sync {
    fn import<'a>(&'a self, path: &'a str) -> LoadFut<'a, Arc<SourceModule>>;
}

/// Reads package descriptors as JSON files on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDescriptorLoader;

impl DescriptorLoader for FsDescriptorLoader {
    fn load<'a>(&'a self, path: &'a str) -> LoadFut<'a, PackageDescriptor> {
        Box::pin(async move {
            let text = fs::read_to_string(path)
                .await
                .map_err(|e| ManifoldError::PackageLoad {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;
            PackageDescriptor::from_json_str(&text).map_err(|e| match e {
                DescriptorParseError::Json(err) => ManifoldError::PackageLoad {
                    path: path.to_string(),
                    message: err.to_string(),
                },
                DescriptorParseError::Shape { package, detail } => {
                    ManifoldError::descriptor(package, detail)
                }
            })
        })
    }
}

/// In-memory table of native source modules, keyed by resolved source path.
///
/// Stands in for dynamic code loading: sources are registered up front and
/// imported by identifier.
#[derive(Debug, Default, Clone)]
pub struct SourceCatalog {
    sources: HashMap<String, Arc<SourceModule>>,
}

impl SourceCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(mut self, path: impl Into<String>, source: SourceModule) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, source: SourceModule) {
        self.sources.insert(path.into(), Arc::new(source));
    }
}

impl SourceLoader for SourceCatalog {
    fn import<'a>(&'a self, path: &'a str) -> LoadFut<'a, Arc<SourceModule>> {
        Box::pin(ready(self.sources.get(path).cloned().ok_or_else(|| {
            ManifoldError::SourceImport {
                path: path.to_string(),
                message: "no source registered under this path".to_string(),
            }
        })))
    }
}
