//! Worker-scoped context registry.
//!
//! Parallel scenarios each own one [`ScenarioContext`], keyed by the identity
//! of the worker running them. A worker only ever reads and writes its own
//! entry, so values never leak between concurrently running scenarios.

use std::collections::HashMap;
use std::fmt;

use dashmap::DashMap;

use crate::context::store::ScenarioContext;

/// Identity of the worker running a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity of the calling OS thread.
    ///
    /// Async runners that move scenarios between threads should name workers
    /// explicitly (e.g., by scenario name) instead.
    pub fn current() -> Self {
        Self(format!("{:?}", std::thread::current().id()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of per-worker scenario contexts.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    scopes: DashMap<WorkerId, ScenarioContext>,
    seed: HashMap<String, String>,
    sensitive_markers: Vec<String>,
}

impl ContextRegistry {
    /// Create a registry whose scopes start with `seed`.
    ///
    /// # Arguments
    /// * `seed` - Values copied into every new scope
    /// * `sensitive_markers` - Key fragments masked in snapshots
    pub fn new(seed: HashMap<String, String>, sensitive_markers: Vec<String>) -> Self {
        Self {
            scopes: DashMap::new(),
            seed,
            sensitive_markers,
        }
    }

    fn fresh_scope(&self) -> ScenarioContext {
        let ctx = ScenarioContext::new(self.seed.clone());
        if self.sensitive_markers.is_empty() {
            ctx
        } else {
            ctx.with_sensitive_markers(self.sensitive_markers.iter().cloned())
        }
    }

    /// Start a scenario on `worker`, replacing any scope it left behind.
    pub fn begin(&self, worker: &WorkerId) {
        tracing::debug!("Starting context scope for worker {}", worker);
        self.scopes.insert(worker.clone(), self.fresh_scope());
    }

    /// Run `f` against the worker's scope, creating it if needed.
    ///
    /// # Example
    /// ```
    /// use msgscenario::context::{ContextRegistry, WorkerId};
    ///
    /// let registry = ContextRegistry::default();
    /// let worker = WorkerId::new("scenario-1");
    /// registry.with_scope(&worker, |ctx| ctx.set("order_id", "7"));
    ///
    /// let value = registry.with_scope(&worker, |ctx| ctx.get("order_id").map(str::to_string));
    /// assert_eq!(value.as_deref(), Some("7"));
    /// ```
    pub fn with_scope<R>(&self, worker: &WorkerId, f: impl FnOnce(&mut ScenarioContext) -> R) -> R {
        let mut scope = self
            .scopes
            .entry(worker.clone())
            .or_insert_with(|| self.fresh_scope());
        f(scope.value_mut())
    }

    /// Finish the worker's scenario and drop its scope.
    pub fn end(&self, worker: &WorkerId) -> Option<ScenarioContext> {
        tracing::debug!("Ending context scope for worker {}", worker);
        self.scopes.remove(worker).map(|(_, ctx)| ctx)
    }

    /// Workers with a live scope.
    pub fn active_workers(&self) -> Vec<WorkerId> {
        let mut workers: Vec<WorkerId> = self.scopes.iter().map(|e| e.key().clone()).collect();
        workers.sort();
        workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_scopes_are_isolated() {
        let registry = ContextRegistry::default();
        let a = WorkerId::new("a");
        let b = WorkerId::new("b");

        registry.with_scope(&a, |ctx| ctx.set("id", "1"));
        registry.with_scope(&b, |ctx| ctx.set("id", "2"));

        assert_eq!(registry.with_scope(&a, |ctx| ctx.get("id").map(str::to_string)), Some("1".to_string()));
        assert_eq!(registry.with_scope(&b, |ctx| ctx.get("id").map(str::to_string)), Some("2".to_string()));
    }

    #[test]
    fn test_begin_reseeds_scope() {
        let seed = HashMap::from([("env".to_string(), "qa".to_string())]);
        let registry = ContextRegistry::new(seed, vec![]);
        let worker = WorkerId::new("w");

        registry.with_scope(&worker, |ctx| {
            ctx.set("env", "overwritten");
            ctx.set("leftover", "x");
        });
        registry.begin(&worker);

        registry.with_scope(&worker, |ctx| {
            assert_eq!(ctx.get("env"), Some("qa"));
            assert!(!ctx.contains("leftover"));
        });
    }

    #[test]
    fn test_end_removes_scope() {
        let registry = ContextRegistry::default();
        let worker = WorkerId::new("w");
        registry.begin(&worker);
        assert_eq!(registry.active_workers(), vec![worker.clone()]);

        assert!(registry.end(&worker).is_some());
        assert!(registry.active_workers().is_empty());
    }

    #[test]
    fn test_parallel_workers_do_not_cross_talk() {
        let registry = Arc::new(ContextRegistry::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let worker = WorkerId::current();
                    registry.begin(&worker);
                    for n in 0..100 {
                        registry.with_scope(&worker, |ctx| ctx.set("value", format!("{}-{}", i, n)));
                    }
                    registry.with_scope(&worker, |ctx| ctx.get("value").map(str::to_string))
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(format!("{}-99", i)));
        }
    }

    #[test]
    fn test_registry_applies_sensitive_markers() {
        let registry = ContextRegistry::new(HashMap::new(), vec!["secret".to_string()]);
        let worker = WorkerId::new("w");
        let snapshot = registry.with_scope(&worker, |ctx| {
            ctx.set("client_secret", "s");
            ctx.snapshot()
        });
        assert_eq!(snapshot["client_secret"], crate::context::MASK);
    }
}
