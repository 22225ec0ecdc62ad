//! Named-command table the host interpreter dispatches through.
//!
//! Simulators keep their own tables (the CFC loader reads a static array,
//! for example); [`CommandRegistry`] is the seam those hosts implement.
//! [`HandlerTable`] is the in-process version used by the probe binary and
//! by tests.

use crate::error::RegistryError;
use std::collections::HashMap;

/// A registered command. Receives the argument tokens, returns nothing.
pub type CommandHandler = Box<dyn FnMut(&[String]) + Send>;

pub trait CommandRegistry {
    fn register_command(&mut self, name: &str, handler: CommandHandler)
    -> Result<(), RegistryError>;
}

#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<String, CommandHandler>,
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("commands", &self.names())
            .finish()
    }
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn invoke(&mut self, name: &str, args: &[String]) -> Result<(), RegistryError> {
        let handler = self
            .handlers
            .get_mut(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))?;
        tracing::debug!(command = name, args = args.len(), "invoking registered command");
        handler(args);
        Ok(())
    }
}

impl CommandRegistry for HandlerTable {
    fn register_command(
        &mut self,
        name: &str,
        handler: CommandHandler,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.handlers.insert(name.to_string(), handler);
        tracing::info!(command = name, "command registered");
        Ok(())
    }
}
