//! Scenario context store.
//!
//! Holds the symbolic values a scenario accumulates (identifiers read from
//! responses, seeded environment values, generated keys) so later steps can
//! reference them as `[name]`.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

/// Value shown in place of sensitive entries by [`ScenarioContext::snapshot`].
pub const MASK: &str = "xxxxxxxxxxxx";

/// Key/value store scoped to a single scenario worker.
///
/// Every value set in a scope stays visible to later reads in the same scope
/// until it is overwritten or the scope ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioContext {
    /// Symbolic name -> value
    #[serde(default)]
    values: HashMap<String, String>,

    /// Key fragments whose values are masked in snapshots
    #[serde(default = "default_sensitive_markers")]
    sensitive_markers: Vec<String>,
}

fn default_sensitive_markers() -> Vec<String> {
    vec!["password".to_string()]
}

impl ScenarioContext {
    /// Create a context seeded with initial values.
    ///
    /// # Arguments
    /// * `seed` - Values available to every step (e.g., environment, tenant)
    ///
    /// # Example
    /// ```
    /// use std::collections::HashMap;
    /// use msgscenario::context::ScenarioContext;
    ///
    /// let mut seed = HashMap::new();
    /// seed.insert("env".to_string(), "qa".to_string());
    ///
    /// let ctx = ScenarioContext::new(seed);
    /// assert_eq!(ctx.get("env"), Some("qa"));
    /// ```
    pub fn new(seed: HashMap<String, String>) -> Self {
        Self {
            values: seed,
            sensitive_markers: default_sensitive_markers(),
        }
    }

    /// Create an empty context.
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Replace the key fragments that mark a value as sensitive.
    ///
    /// Matching is case-insensitive and by substring, so `"password"` also
    /// masks `db.password` and `PasswordHash`.
    pub fn with_sensitive_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitive_markers = markers
            .into_iter()
            .map(|m| m.into().to_lowercase())
            .collect();
        self
    }

    /// Set a single value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Merge a mapping into the context. Existing keys are overwritten.
    pub fn set_all<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in values {
            self.set(key, value);
        }
    }

    /// Get a value by name.
    ///
    /// # Returns
    /// `Some(value)` if the key was set in this scope, `None` otherwise
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check if a key has been set.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Drop every value in this scope.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the context safe for external exposure.
    ///
    /// Values whose key contains a sensitivity marker are replaced by [`MASK`].
    ///
    /// # Example
    /// ```
    /// use msgscenario::context::{ScenarioContext, MASK};
    ///
    /// let mut ctx = ScenarioContext::empty();
    /// ctx.set("db.password", "hunter2");
    /// ctx.set("user", "alice");
    ///
    /// let snapshot = ctx.snapshot();
    /// assert_eq!(snapshot["db.password"], MASK);
    /// assert_eq!(snapshot["user"], "alice");
    /// ```
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .map(|(key, value)| {
                let shown = if self.is_sensitive(key) {
                    MASK.to_string()
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect()
    }

    fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.sensitive_markers
            .iter()
            .any(|marker| key.contains(marker.as_str()))
    }

    /// Iterate over stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::empty()
    }
}
