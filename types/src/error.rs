use thiserror::Error;

/// Error taxonomy for the Manifold runtime.
///
/// Every failure surfaces to the immediate caller; nothing is swallowed
/// except inside fallback execution, where a registration failure for the
/// primary target is logged and converted into a retry with the default
/// triple.
#[derive(Debug, Error)]
pub enum ManifoldError {
    /// An identifier-like field was empty or blank.
    #[error("{field} must be a non-empty string")]
    Validation { field: String },

    /// The package descriptor could not be read or parsed.
    #[error("failed to load package descriptor from {path}: {message}")]
    PackageLoad { path: String, message: String },

    /// The source module could not be imported, or lacked a requested export.
    #[error("failed to import source module {path}: {message}")]
    SourceImport { path: String, message: String },

    /// The descriptor is structurally unusable: no source or builder, or a
    /// dependency spec with no resolvable binding name.
    #[error("package {package} {message}")]
    Descriptor { package: String, message: String },

    /// A factory invocation failed or did not yield a usable constructor.
    #[error("construction failed: {message}")]
    Construction { message: String },

    /// The resolved module has no command matching the requested name.
    #[error("module {app} has no command named {command}")]
    Execution { app: String, command: String },

    /// Fallback execution was requested on an instance constructed without a
    /// default app/cmd/data triple.
    #[error("no default app/cmd configured for fallback execution")]
    FallbackUnavailable,
}

impl ManifoldError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    pub fn descriptor(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Descriptor {
            package: package.into(),
            message: message.into(),
        }
    }

    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }
}

/// Validate that an identifier-like value is a non-empty string.
pub fn require_identifier(field: &str, value: &str) -> Result<(), ManifoldError> {
    if value.trim().is_empty() {
        return Err(ManifoldError::validation(field));
    }
    Ok(())
}
