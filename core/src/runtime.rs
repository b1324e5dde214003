//! The Manifold runtime: registration state machine and command dispatch.
//!
//! One `Runtime` owns one registry, one source cache, and one optional
//! fallback triple; there is no ambient or cross-instance state. All
//! operations are asynchronous and suspend only at the loader ports.
//! Concurrent duplicate registrations for the same id are not deduplicated:
//! both callers load and build independently and the second completion
//! overwrites the first (last write wins).

use std::collections::HashMap;
use std::sync::Arc;

use manifold_types::{
    BuilderRefDescriptor, ManifoldError, PackageDescriptor, RunItem, SourceDescriptor,
    require_identifier,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::builder::{Builder, SharedBuilder};
use crate::config::RuntimeConfig;
use crate::factory::SourceModule;
use crate::loader::{DescriptorLoader, LoadFut, SourceLoader};
use crate::module::Module;
use crate::registry::{Registered, Registry};

#[derive(Debug, Clone)]
struct FallbackTriple {
    app: String,
    cmd: String,
    data: Value,
}

/// The assembled runtime: registration, dependency resolution, and
/// command dispatch over a per-instance registry.
pub struct Runtime {
    root_directory: String,
    sources_directory: String,
    packages_directory: String,
    fallback: Option<FallbackTriple>,
    descriptors: Arc<dyn DescriptorLoader>,
    sources: Arc<dyn SourceLoader>,
    pub(crate) registry: Mutex<Registry>,
    source_cache: Mutex<HashMap<String, Arc<SourceModule>>>,
}

impl Runtime {
    /// Build a runtime from configuration and the two loader ports.
    ///
    /// Fails with a validation error when a default triple is supplied with
    /// an empty `default_app` or `default_cmd`.
    pub fn new(
        config: RuntimeConfig,
        descriptors: Arc<dyn DescriptorLoader>,
        sources: Arc<dyn SourceLoader>,
    ) -> Result<Self, ManifoldError> {
        let fallback = match (&config.default_app, &config.default_cmd) {
            (None, None) => None,
            (app, cmd) => {
                let app = app.clone().unwrap_or_default();
                let cmd = cmd.clone().unwrap_or_default();
                require_identifier("default_app", &app)?;
                require_identifier("default_cmd", &cmd)?;
                Some(FallbackTriple {
                    app,
                    cmd,
                    data: config.default_data.clone().unwrap_or(Value::Null),
                })
            }
        };

        Ok(Self {
            root_directory: config.root_directory,
            sources_directory: config.sources_directory,
            packages_directory: config.packages_directory,
            fallback,
            descriptors,
            sources,
            registry: Mutex::new(Registry::new()),
            source_cache: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn root_directory(&self) -> &str {
        &self.root_directory
    }

    #[must_use]
    pub fn sources_directory(&self) -> &str {
        &self.sources_directory
    }

    #[must_use]
    pub fn packages_directory(&self) -> &str {
        &self.packages_directory
    }

    pub async fn has_module(&self, id: &str) -> bool {
        self.registry.lock().await.has_module(id)
    }

    pub async fn module(&self, id: &str) -> Option<Arc<Module>> {
        self.registry.lock().await.module(id)
    }

    /// Snapshot of the built module ids, in registration order.
    pub async fn list_modules(&self) -> Vec<String> {
        self.registry.lock().await.list_modules()
    }

    pub(crate) async fn builder_handle(&self, id: &str) -> Option<SharedBuilder> {
        self.registry.lock().await.builder(id)
    }

    fn resolve_package_path(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}.json", self.packages_directory)
        } else {
            format!("{}/{path}.json", self.packages_directory)
        }
    }

    fn resolve_source_path(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.sources_directory)
        } else {
            format!("{}/{path}", self.sources_directory)
        }
    }

    /// Fetch and parse the descriptor for a package path.
    pub async fn load_package(&self, path: &str) -> Result<PackageDescriptor, ManifoldError> {
        require_identifier("package path", path)?;
        let resolved = self.resolve_package_path(path);
        self.descriptors.load(&resolved).await
    }

    /// Import a source module, caching the result by the given source path.
    pub async fn import(&self, source_path: &str) -> Result<Arc<SourceModule>, ManifoldError> {
        require_identifier("source path", source_path)?;
        if let Some(cached) = self.source_cache.lock().await.get(source_path) {
            return Ok(cached.clone());
        }
        let resolved = self.resolve_source_path(source_path);
        let source = self.sources.import(&resolved).await?;
        self.source_cache
            .lock()
            .await
            .insert(source_path.to_string(), source.clone());
        Ok(source)
    }

    /// Register `id`: load its descriptor, resolve its dependency graph
    /// depth-first, and build it (or stop at the builder when `build` is
    /// false).
    ///
    /// Repeated registration of an id with the same `build` flag is
    /// side-effect-free after the first call and returns the cached value.
    /// Boxed future because package dependencies recurse back into
    /// `register`.
    pub fn register<'a>(&'a self, id: &'a str, build: bool) -> LoadFut<'a, Registered> {
        Box::pin(async move {
            require_identifier("package id", id)?;

            {
                let registry = self.registry.lock().await;
                if registry.is_loaded(id) {
                    if build {
                        if let Some(module) = registry.module(id) {
                            debug!(id, "register: returning cached module");
                            return Ok(Registered::Module(module));
                        }
                    } else if let Some(builder) = registry.builder(id) {
                        debug!(id, "register: returning cached builder");
                        return Ok(Registered::Builder(builder));
                    }
                }
            }

            match self.load_package(id).await? {
                PackageDescriptor::Source(descriptor) => {
                    self.register_source(id, &descriptor, build).await
                }
                PackageDescriptor::BuilderRef(descriptor) => {
                    self.register_builder_ref(id, &descriptor).await
                }
            }
        })
    }

    async fn register_source(
        &self,
        id: &str,
        descriptor: &SourceDescriptor,
        build: bool,
    ) -> Result<Registered, ManifoldError> {
        let dependencies = self.resolve_dependencies(descriptor).await?;
        let source = self.import(&descriptor.source).await?;
        let factory = source.factory().ok_or_else(|| {
            ManifoldError::construction(format!(
                "source {} does not export a factory",
                descriptor.source
            ))
        })?;

        let mut builder = Builder::new(factory);
        builder.inject(dependencies);
        let shared = builder.into_shared();
        self.registry
            .lock()
            .await
            .insert_builder(id, shared.clone());
        debug!(id, source = %descriptor.source, "registered builder");

        if !build {
            return Ok(Registered::Builder(shared));
        }

        let module = {
            let mut guard = shared.lock().await;
            guard.apply_settings(descriptor.factory_settings.clone());
            Arc::new(guard.build()?)
        };
        self.registry.lock().await.insert_module(id, module.clone());
        debug!(id, "registered module");
        Ok(Registered::Module(module))
    }

    /// The builder-reference path applies this descriptor's settings to the
    /// referenced builder and always builds, regardless of the caller's
    /// `build` flag. Inherited behavior, kept as-is.
    async fn register_builder_ref(
        &self,
        id: &str,
        descriptor: &BuilderRefDescriptor,
    ) -> Result<Registered, ManifoldError> {
        let referenced = &descriptor.builder;
        let shared = match self.builder_handle(referenced).await {
            Some(shared) => shared,
            None => self
                .register(referenced, false)
                .await?
                .into_builder()
                .map_err(|_| {
                    ManifoldError::descriptor(
                        id,
                        format!("references {referenced}, which has no reusable builder"),
                    )
                })?,
        };

        let module = {
            let mut guard = shared.lock().await;
            guard.apply_settings(descriptor.factory_settings.clone());
            Arc::new(guard.build()?)
        };
        self.registry.lock().await.insert_module(id, module.clone());
        debug!(id, builder = %referenced, "registered module from referenced builder");
        Ok(Registered::Module(module))
    }

    async fn resolved_module(&self, app: &str) -> Result<Arc<Module>, ManifoldError> {
        if let Some(module) = self.module(app).await {
            return Ok(module);
        }
        self.register(app, true).await?.into_module()
    }

    async fn dispatch(
        &self,
        module: &Module,
        app: &str,
        cmd: &str,
        data: Value,
    ) -> Result<Value, ManifoldError> {
        let handler = module.handler(cmd).ok_or_else(|| ManifoldError::Execution {
            app: app.to_string(),
            command: cmd.to_string(),
        })?;
        handler(data).await
    }

    /// Execute the command named `cmd` on package `app`, auto-registering the
    /// package when it is not yet a built module.
    pub async fn execute(&self, app: &str, cmd: &str, data: Value) -> Result<Value, ManifoldError> {
        require_identifier("app", app)?;
        require_identifier("cmd", cmd)?;
        let module = self.resolved_module(app).await?;
        self.dispatch(&module, app, cmd, data).await
    }

    /// Like [`execute`](Runtime::execute), but a registration failure for the
    /// primary target is caught, logged, and retried once with the configured
    /// default triple in place of the original arguments. The retry's own
    /// failure propagates; dispatch failures on a registered module never
    /// fall back.
    pub async fn execute_with_fallback(
        &self,
        app: &str,
        cmd: &str,
        data: Value,
    ) -> Result<Value, ManifoldError> {
        let fallback = self
            .fallback
            .clone()
            .ok_or(ManifoldError::FallbackUnavailable)?;
        require_identifier("app", app)?;
        require_identifier("cmd", cmd)?;

        let module = match self.resolved_module(app).await {
            Ok(module) => module,
            Err(error) => {
                warn!(app, %error, "registration failed; substituting the default target");
                return self
                    .execute(&fallback.app, &fallback.cmd, fallback.data.clone())
                    .await;
            }
        };
        self.dispatch(&module, app, cmd, data).await
    }

    /// Execute a batch sequentially, awaiting each entry before starting the
    /// next. The first failure halts the batch; remaining entries are never
    /// invoked.
    pub async fn run(&self, items: &[RunItem]) -> Result<Vec<Value>, ManifoldError> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(self.execute(&item.pkg, &item.cmd, item.data.clone()).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{FsDescriptorLoader, SourceCatalog};

    fn runtime_with(config: RuntimeConfig) -> Runtime {
        Runtime::new(
            config,
            Arc::new(FsDescriptorLoader),
            Arc::new(SourceCatalog::new()),
        )
        .unwrap()
    }

    #[test]
    fn package_paths_resolve_under_the_packages_directory() {
        let runtime = runtime_with(RuntimeConfig {
            packages_directory: "./packages".to_string(),
            ..RuntimeConfig::default()
        });
        assert_eq!(runtime.resolve_package_path("test"), "./packages/test.json");
        assert_eq!(
            runtime.resolve_package_path("/subfolder/test"),
            "./packages/subfolder/test.json"
        );
    }

    #[test]
    fn source_paths_resolve_under_the_sources_directory() {
        let runtime = runtime_with(RuntimeConfig::default());
        assert_eq!(runtime.resolve_source_path("greeter"), "./sources/greeter");
        assert_eq!(runtime.resolve_source_path("/util/text"), "./sources/util/text");
    }

    #[test]
    fn default_triple_requires_both_app_and_cmd() {
        let missing_cmd = Runtime::new(
            RuntimeConfig {
                default_app: Some("greeter".to_string()),
                ..RuntimeConfig::default()
            },
            Arc::new(FsDescriptorLoader),
            Arc::new(SourceCatalog::new()),
        );
        assert!(matches!(
            missing_cmd,
            Err(ManifoldError::Validation { field }) if field == "default_cmd"
        ));

        let blank_app = Runtime::new(
            RuntimeConfig {
                default_app: Some("  ".to_string()),
                default_cmd: Some("greet".to_string()),
                ..RuntimeConfig::default()
            },
            Arc::new(FsDescriptorLoader),
            Arc::new(SourceCatalog::new()),
        );
        assert!(matches!(
            blank_app,
            Err(ManifoldError::Validation { field }) if field == "default_app"
        ));
    }

    #[tokio::test]
    async fn execute_validates_identifiers_before_touching_loaders() {
        let runtime = runtime_with(RuntimeConfig::default());
        assert!(matches!(
            runtime.execute("", "greet", Value::Null).await,
            Err(ManifoldError::Validation { field }) if field == "app"
        ));
        assert!(matches!(
            runtime.execute("greeter", " ", Value::Null).await,
            Err(ManifoldError::Validation { field }) if field == "cmd"
        ));
    }

    #[tokio::test]
    async fn fallback_requires_a_configured_triple() {
        let runtime = runtime_with(RuntimeConfig::default());
        assert!(matches!(
            runtime
                .execute_with_fallback("greeter", "greet", Value::Null)
                .await,
            Err(ManifoldError::FallbackUnavailable)
        ));
    }
}
