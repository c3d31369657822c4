//! Builder registry.
//!
//! Maps message type names to [`MessageBuilder`] implementations. Populated
//! once at startup and read concurrently afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::message::builder::{JsonBuilder, MessageBuilder, TextBuilder};

/// Registry for looking up message builders by type name.
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct BuilderRegistry {
    builders: HashMap<String, Arc<dyn MessageBuilder>>,
}

impl BuilderRegistry {
    /// Create a new empty builder registry
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registry with the JSON and TEXT builders.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonBuilder));
        registry.register(Arc::new(TextBuilder));
        registry
    }

    /// Register a builder under its own name, replacing any earlier one.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use msgscenario::message::{BuilderRegistry, JsonBuilder};
    ///
    /// let mut registry = BuilderRegistry::new();
    /// registry.register(Arc::new(JsonBuilder));
    /// assert!(registry.has_builder("json"));
    /// ```
    pub fn register(&mut self, builder: Arc<dyn MessageBuilder>) {
        self.builders
            .insert(builder.name().to_uppercase(), builder);
    }

    /// Look up a builder by type name
    ///
    /// # Returns
    ///
    /// * `Ok(builder)` - a builder is registered under `name`
    /// * `Err(ConfigError::UnknownMessageType)` - nothing is
    pub fn get(&self, name: &str) -> Result<Arc<dyn MessageBuilder>, ConfigError> {
        self.builders
            .get(&name.to_uppercase())
            .cloned()
            .ok_or_else(|| ConfigError::UnknownMessageType(name.to_string()))
    }

    /// Check if a builder is registered
    pub fn has_builder(&self, name: &str) -> bool {
        self.builders.contains_key(&name.to_uppercase())
    }

    /// Sorted list of registered type names
    pub fn list_builders(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builders.keys().cloned().collect();
        names.sort();
        names
    }
}
