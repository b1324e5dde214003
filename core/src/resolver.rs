//! Dependency resolution for source descriptors.

use manifold_types::{ManifoldError, SourceDescriptor};

use crate::factory::{Dependencies, Dependency};
use crate::runtime::Runtime;

impl Runtime {
    /// Assemble the named dependency map for a source descriptor.
    ///
    /// Package dependencies resolve depth-first and lazily through
    /// [`register`](Runtime::register); an id that is already a built module
    /// is not re-fetched. Source dependencies bypass the package machinery
    /// entirely and import directly. Any failure aborts the whole resolution,
    /// so a partial map never reaches a builder.
    pub(crate) async fn resolve_dependencies(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<Dependencies, ManifoldError> {
        let mut resolved = Dependencies::new();

        for dep in &descriptor.dependencies.packages {
            let binding = dep.normalize(&descriptor.name)?;
            if !self.has_module(&binding.id).await {
                self.register(&binding.id, binding.build).await?;
            }
            let dependency = if binding.build {
                let module = self.module(&binding.id).await.ok_or_else(|| {
                    ManifoldError::descriptor(
                        &descriptor.name,
                        format!("dependency {} did not produce a built module", binding.id),
                    )
                })?;
                Dependency::Module(module)
            } else {
                let builder = self.builder_handle(&binding.id).await.ok_or_else(|| {
                    ManifoldError::descriptor(
                        &descriptor.name,
                        format!("dependency {} did not produce a reusable builder", binding.id),
                    )
                })?;
                Dependency::Builder(builder)
            };
            resolved.insert(binding.name, dependency);
        }

        for dep in &descriptor.dependencies.sources {
            let binding = dep.normalize();
            let name = binding
                .binding_name()
                .ok_or_else(|| {
                    ManifoldError::descriptor(
                        &descriptor.name,
                        format!(
                            "source dependency {} has neither a binding name nor a method",
                            binding.id
                        ),
                    )
                })?
                .to_string();

            let source = self.import(&binding.id).await?;
            let export = match &binding.method {
                Some(method) => source.export_named(method).ok_or_else(|| {
                    ManifoldError::SourceImport {
                        path: binding.id.clone(),
                        message: format!("no export named {method}"),
                    }
                })?,
                None => {
                    source
                        .default_export()
                        .ok_or_else(|| ManifoldError::SourceImport {
                            path: binding.id.clone(),
                            message: "no default export".to_string(),
                        })?
                }
            };
            resolved.insert(name, Dependency::Export(export));
        }

        Ok(resolved)
    }
}
