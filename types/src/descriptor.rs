//! Package descriptor model.
//!
//! A descriptor is the persisted JSON record describing how to build or
//! locate a module. The on-disk shape is duck-typed (`source` XOR `builder`);
//! parsing discriminates it into an explicit tagged variant so the rest of
//! the runtime never presence-checks optional fields.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::ManifoldError;

/// Parsed, shape-validated package descriptor.
#[derive(Debug, Clone)]
pub enum PackageDescriptor {
    /// Built from a source module's factory export.
    Source(SourceDescriptor),
    /// Built by re-settling another package's registered builder.
    BuilderRef(BuilderRefDescriptor),
}

impl PackageDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Source(d) => &d.name,
            Self::BuilderRef(d) => &d.name,
        }
    }

    /// Parse and shape-check a descriptor from its persisted JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, DescriptorParseError> {
        let raw: RawDescriptor = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDescriptor) -> Result<Self, DescriptorParseError> {
        match (raw.source, raw.builder) {
            (Some(source), None) => Ok(Self::Source(SourceDescriptor {
                name: raw.name,
                source,
                factory_settings: raw.factory_settings,
                dependencies: raw.dependencies,
            })),
            (None, Some(builder)) => Ok(Self::BuilderRef(BuilderRefDescriptor {
                name: raw.name,
                builder,
                factory_settings: raw.factory_settings,
            })),
            (Some(_), Some(_)) => Err(DescriptorParseError::Shape {
                package: raw.name,
                detail: "declares both source and builder",
            }),
            (None, None) => Err(DescriptorParseError::Shape {
                package: raw.name,
                detail: "has no source or builder",
            }),
        }
    }
}

/// A package built through a source module's three-stage factory.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub name: String,
    /// Path of the source module, relative to the sources directory.
    pub source: String,
    /// Settings applied before building; `Null` when the descriptor omits them.
    pub factory_settings: Value,
    pub dependencies: DependencyLists,
}

/// A package built by applying settings to another package's builder.
///
/// Dependency lists are not carried here: the referenced builder already owns
/// its injected dependencies.
#[derive(Debug, Clone)]
pub struct BuilderRefDescriptor {
    pub name: String,
    /// Identifier of the package whose registered builder is reused.
    pub builder: String,
    pub factory_settings: Value,
}

/// Failure to turn persisted JSON into a [`PackageDescriptor`].
#[derive(Debug, Error)]
pub enum DescriptorParseError {
    #[error("invalid descriptor JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("package {package} {detail}")]
    Shape {
        package: String,
        detail: &'static str,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    name: String,
    source: Option<String>,
    builder: Option<String>,
    #[serde(default)]
    factory_settings: Value,
    #[serde(default)]
    dependencies: DependencyLists,
}

/// The two optional dependency lists of a source descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependencyLists {
    #[serde(default)]
    pub packages: Vec<PackageDep>,
    #[serde(default)]
    pub sources: Vec<SourceDep>,
}

impl DependencyLists {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.sources.is_empty()
    }
}

/// A package dependency spec: either a bare identifier (used as both id and
/// binding name) or an object form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PackageDep {
    Id(String),
    Spec {
        pkg: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        build: Option<bool>,
    },
}

/// Normalized package dependency: which package to register and the name it
/// binds to in the factory's dependency map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageBinding {
    pub id: String,
    pub name: String,
    pub build: bool,
}

impl PackageDep {
    /// Normalize to `{id, name, build}`. The object form requires an explicit
    /// binding name; its absence is a hard error naming the parent package
    /// and the offending dependency.
    pub fn normalize(&self, package: &str) -> Result<PackageBinding, ManifoldError> {
        match self {
            Self::Id(id) => Ok(PackageBinding {
                id: id.clone(),
                name: id.clone(),
                build: true,
            }),
            Self::Spec { pkg, name, build } => {
                let name = name.clone().ok_or_else(|| {
                    ManifoldError::descriptor(
                        package,
                        format!("dependency {pkg} is missing a binding name"),
                    )
                })?;
                Ok(PackageBinding {
                    id: pkg.clone(),
                    name,
                    build: build.unwrap_or(true),
                })
            }
        }
    }
}

/// A source dependency spec: a plain code module imported outside the
/// package/descriptor machinery.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceDep {
    Id(String),
    Spec {
        source: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        method: Option<String>,
    },
}

/// Normalized source dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBinding {
    pub id: String,
    pub name: Option<String>,
    pub method: Option<String>,
}

impl SourceBinding {
    /// The key this dependency binds under: `name` when present, else the
    /// export `method` name.
    #[must_use]
    pub fn binding_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.method.as_deref())
    }
}

impl SourceDep {
    #[must_use]
    pub fn normalize(&self) -> SourceBinding {
        match self {
            Self::Id(id) => SourceBinding {
                id: id.clone(),
                name: Some(id.clone()),
                method: None,
            },
            Self::Spec {
                source,
                name,
                method,
            } => SourceBinding {
                id: source.clone(),
                name: name.clone(),
                method: method.clone(),
            },
        }
    }
}
