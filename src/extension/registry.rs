//! Name-to-extension registry
//!
//! Replaces type lookup from configuration strings: behaviors are registered
//! under a name and created on demand.

use eyre::Result;
use indexmap::IndexMap;
use std::sync::Arc;

use super::{BehaviorExtension, MessageLoggerExtension};
use crate::broadcast::Broadcaster;
use crate::host::ServiceBehavior;

/// Registered behavior extensions, in registration order
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: IndexMap<String, Box<dyn BehaviorExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in extensions bound to `broadcaster`
    pub fn with_defaults(broadcaster: Arc<Broadcaster>) -> Self {
        let mut registry = Self::new();
        registry.register(MessageLoggerExtension::new(broadcaster));
        registry
    }

    /// Register an extension, replacing any previous one with the same name
    pub fn register<E>(&mut self, extension: E)
    where
        E: BehaviorExtension + 'static,
    {
        let name = extension.name().to_string();
        if self.extensions.insert(name.clone(), Box::new(extension)).is_some() {
            log::warn!("Behavior extension '{}' was registered twice, keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn BehaviorExtension> {
        self.extensions.get(name).map(|e| e.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(|k| k.as_str())
    }

    pub fn list(&self) -> impl Iterator<Item = &dyn BehaviorExtension> {
        self.extensions.values().map(|e| e.as_ref())
    }

    /// Create a behavior by its configured name
    pub fn create(&self, name: &str) -> Result<Box<dyn ServiceBehavior>> {
        match self.extensions.get(name) {
            Some(extension) => {
                log::debug!("Creating behavior '{}' ({})", name, extension.behavior_type());
                Ok(extension.create_behavior())
            }
            None => {
                let known: Vec<&str> = self.names().collect();
                eyre::bail!("Unknown behavior extension '{}' (registered: {})", name, known.join(", "))
            }
        }
    }

    /// Create every named behavior, in the given order
    pub fn create_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Box<dyn ServiceBehavior>>> {
        names.iter().map(|name| self.create(name.as_ref())).collect()
    }

    /// Search extensions by name or behavior type
    pub fn search(&self, query: &str) -> Vec<&dyn BehaviorExtension> {
        let query_lower = query.to_lowercase();
        self.extensions
            .values()
            .filter(|e| {
                e.name().to_lowercase().contains(&query_lower)
                    || e.behavior_type().to_lowercase().contains(&query_lower)
            })
            .map(|e| e.as_ref())
            .collect()
    }
}
