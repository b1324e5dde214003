//! Module values and their command tables.
//!
//! A module is the constructed runtime object a package registers under its
//! identifier. Rather than dynamic property lookup, commands live in an
//! explicit capability map: command name to handler. The executor validates a
//! command exists before invoking it.

use std::collections::HashMap;
use std::fmt;
use std::future::{Future, ready};
use std::pin::Pin;
use std::sync::Arc;

use manifold_types::ManifoldError;
use serde_json::Value;

/// Future returned by a module command.
pub type CommandFuture = Pin<Box<dyn Future<Output = Result<Value, ManifoldError>> + Send>>;

/// A named command handler on a module.
pub type CommandFn = Arc<dyn Fn(Value) -> CommandFuture + Send + Sync>;

/// A constructed module: a capability map from command name to handler.
///
/// Produced by a [`Builder`](crate::Builder); treated as immutable once the
/// registry stores it.
#[derive(Default, Clone)]
pub struct Module {
    commands: HashMap<String, CommandFn>,
}

impl Module {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an async command under `name`, replacing any previous handler.
    #[must_use]
    pub fn command<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> CommandFuture + Send + Sync + 'static,
    {
        self.commands.insert(name.into(), Arc::new(handler));
        self
    }

    /// Add a synchronous command, wrapped in an immediately-ready future.
    #[must_use]
    pub fn sync_command<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ManifoldError> + Send + Sync + 'static,
    {
        self.command(name, move |data| -> CommandFuture {
            Box::pin(ready(handler(data)))
        })
    }

    /// Look up the handler for a command, if the module exposes it.
    #[must_use]
    pub fn handler(&self, name: &str) -> Option<CommandFn> {
        self.commands.get(name).cloned()
    }

    #[must_use]
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Sorted snapshot of the command names this module exposes.
    #[must_use]
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("commands", &self.command_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sync_commands_run_to_completion() {
        let module = Module::new().sync_command("echo", Ok);
        let handler = module.handler("echo").unwrap();
        assert_eq!(handler(json!("hi")).await.unwrap(), json!("hi"));
    }

    #[test]
    fn unknown_commands_are_absent() {
        let module = Module::new().sync_command("echo", Ok);
        assert!(module.has_command("echo"));
        assert!(!module.has_command("shout"));
        assert!(module.handler("shout").is_none());
    }

    #[test]
    fn command_names_are_sorted() {
        let module = Module::new()
            .sync_command("zeta", Ok)
            .sync_command("alpha", Ok);
        assert_eq!(module.command_names(), vec!["alpha", "zeta"]);
    }
}
