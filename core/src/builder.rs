//! Builder: a reusable construction pipeline around a three-stage factory.

use std::fmt;
use std::sync::Arc;

use manifold_types::ManifoldError;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::factory::{Dependencies, FactoryFn};
use crate::module::Module;

/// Shared handle to a registered builder.
///
/// Builders stay mutable after registration so callers can re-settle and
/// rebuild them; modules, by contrast, are frozen once stored.
pub type SharedBuilder = Arc<Mutex<Builder>>;

/// A mutable construction pipeline: a factory plus the two slots it consumes.
///
/// [`inject`](Builder::inject) and [`apply_settings`](Builder::apply_settings)
/// each overwrite their slot — no merging — and return the builder for
/// chaining. [`build`](Builder::build) is pure given the current slots and may
/// be called repeatedly to produce independent module instances.
pub struct Builder {
    factory: FactoryFn,
    dependencies: Dependencies,
    settings: Value,
}

impl Builder {
    #[must_use]
    pub fn new(factory: FactoryFn) -> Self {
        Self {
            factory,
            dependencies: Dependencies::new(),
            settings: Value::Null,
        }
    }

    /// Replace the dependency slot.
    pub fn inject(&mut self, dependencies: Dependencies) -> &mut Self {
        self.dependencies = dependencies;
        self
    }

    /// Replace the settings slot.
    pub fn apply_settings(&mut self, settings: Value) -> &mut Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Value {
        &self.settings
    }

    /// Run both factory stages against the current slots.
    ///
    /// Never touches the registry; failures from either stage surface as
    /// construction errors authored by the factory.
    pub fn build(&self) -> Result<Module, ManifoldError> {
        let constructor = (self.factory)(&self.dependencies)?;
        constructor(&self.settings)
    }

    #[must_use]
    pub fn into_shared(self) -> SharedBuilder {
        Arc::new(Mutex::new(self))
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("dependencies", &self.dependencies)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Constructor;
    use serde_json::json;

    fn message_factory() -> FactoryFn {
        Arc::new(|_deps| {
            Ok(Box::new(|settings: &Value| {
                let message = settings
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("default")
                    .to_string();
                Ok(Module::new()
                    .sync_command("say", move |_| Ok(Value::String(message.clone()))))
            }) as Constructor)
        })
    }

    #[tokio::test]
    async fn builds_with_the_current_settings() {
        let mut builder = Builder::new(message_factory());
        builder.apply_settings(json!({"message": "X"}));
        let module = builder.build().unwrap();
        let handler = module.handler("say").unwrap();
        assert_eq!(handler(Value::Null).await.unwrap(), json!("X"));
    }

    #[tokio::test]
    async fn rebuilds_reflect_only_the_settings_at_build_time() {
        let mut builder = Builder::new(message_factory());
        builder.apply_settings(json!({"message": "first"}));
        let first = builder.build().unwrap();
        builder.apply_settings(json!({"message": "second"}));
        let second = builder.build().unwrap();

        let first_out = first.handler("say").unwrap()(Value::Null).await.unwrap();
        let second_out = second.handler("say").unwrap()(Value::Null).await.unwrap();
        assert_eq!(first_out, json!("first"));
        assert_eq!(second_out, json!("second"));
    }

    #[test]
    fn apply_settings_overwrites_rather_than_merges() {
        let mut builder = Builder::new(message_factory());
        builder.apply_settings(json!({"message": "a", "extra": 1}));
        builder.apply_settings(json!({"message": "b"}));
        assert_eq!(builder.settings(), &json!({"message": "b"}));
    }
}
