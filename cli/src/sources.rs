//! Built-in source modules.
//!
//! The binary has no dynamic code loading, so the source modules a descriptor
//! can reference are compiled in and published through a [`SourceCatalog`]
//! keyed under the configured sources directory. A descriptor with
//! `"source": "greeter"` therefore resolves to the built-in greeter below.

use serde_json::Value;

use manifold_core::{Constructor, Module, RuntimeConfig, SourceCatalog, SourceModule};

pub fn builtin_catalog(config: &RuntimeConfig) -> SourceCatalog {
    let dir = &config.sources_directory;
    SourceCatalog::new()
        .with_source(format!("{dir}/greeter"), greeter())
        .with_source(format!("{dir}/text"), text())
}

/// Greeter factory: the `greeting` setting picks the salutation, the `greet`
/// command appends the payload.
fn greeter() -> SourceModule {
    SourceModule::new().with_factory(|_deps| {
        Ok(Box::new(|settings: &Value| {
            let greeting = settings
                .get("greeting")
                .and_then(Value::as_str)
                .unwrap_or("Hello")
                .to_string();
            Ok(Module::new().sync_command("greet", move |data| {
                let name = data.as_str().unwrap_or("world").to_string();
                Ok(Value::String(format!("{greeting} {name}")))
            }))
        }) as Constructor)
    })
}

/// Plain export bundle for source dependencies: an `upper` method plus an
/// identity default export.
fn text() -> SourceModule {
    SourceModule::new()
        .with_export("upper", |value| {
            let text = value.as_str().unwrap_or_default().to_uppercase();
            Ok(Value::String(text))
        })
        .with_default_export(Ok)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{greeter, text};

    #[tokio::test]
    async fn greeter_uses_the_greeting_setting() {
        let factory = greeter().factory().unwrap();
        let deps = manifold_core::Dependencies::new();
        let constructor = factory(&deps).unwrap();
        let module = constructor(&json!({"greeting": "Howdy"})).unwrap();
        let result = module.handler("greet").unwrap()(json!("Ada")).await.unwrap();
        assert_eq!(result, json!("Howdy Ada"));
    }

    #[tokio::test]
    async fn greeter_defaults_when_unsettled() {
        let factory = greeter().factory().unwrap();
        let deps = manifold_core::Dependencies::new();
        let constructor = factory(&deps).unwrap();
        let module = constructor(&serde_json::Value::Null).unwrap();
        let result = module.handler("greet").unwrap()(json!("Ada")).await.unwrap();
        assert_eq!(result, json!("Hello Ada"));
    }

    #[test]
    fn text_exports_upper_and_a_default() {
        let source = text();
        let upper = source.export_named("upper").unwrap();
        assert_eq!(upper(json!("hey")).unwrap(), json!("HEY"));
        let default = source.default_export().unwrap();
        assert_eq!(default(json!("hey")).unwrap(), json!("hey"));
    }
}
