//! Runtime construction configuration.

use serde::Deserialize;
use serde_json::Value;

/// Construction configuration for a [`Runtime`](crate::Runtime).
///
/// All fields are optional in the persisted form. Supplying a default app
/// enables fallback execution; `default_app` and `default_cmd` are then
/// validated as non-empty strings at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub root_directory: String,
    pub sources_directory: String,
    pub packages_directory: String,
    pub default_app: Option<String>,
    pub default_cmd: Option<String>,
    pub default_data: Option<Value>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_directory: String::new(),
            sources_directory: "./sources".to_string(),
            packages_directory: "./packages".to_string(),
            default_app: None,
            default_cmd: None,
            default_data: None,
        }
    }
}
