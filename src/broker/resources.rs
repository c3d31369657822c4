//! Named broker connections.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::broker::{Broker, MemoryBroker, NatsBroker, NatsSettings};
use crate::config::{HarnessConfig, ResourceConfig};
use crate::error::{ConfigError, StepError};

/// Resource name -> broker.
#[derive(Clone, Default)]
pub struct Resources {
    brokers: BTreeMap<String, Arc<dyn Broker>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, broker: Arc<dyn Broker>) {
        self.brokers.insert(broker.name().to_string(), broker);
    }

    /// Connect every configured resource and start listening on the
    /// destinations it serves.
    pub async fn connect(config: &HarnessConfig) -> Result<Self, StepError> {
        let mut resources = Self::new();

        for (name, resource) in &config.resources {
            let destinations = config.destinations_for(name);
            let broker: Arc<dyn Broker> = match resource {
                ResourceConfig::Memory => Arc::new(MemoryBroker::new(name.clone())),
                ResourceConfig::Nats { url, stream } => {
                    let defaults = NatsSettings::default();
                    let settings = NatsSettings {
                        url: url.clone().unwrap_or(defaults.url),
                        stream_name: stream.clone().unwrap_or(defaults.stream_name),
                        subjects: destinations.clone(),
                        ..defaults
                    };
                    Arc::new(NatsBroker::connect(name.clone(), settings).await?)
                }
            };

            for destination in &destinations {
                broker.listen(destination).await?;
            }
            tracing::info!("Resource {} ready ({} destinations)", name, destinations.len());
            resources.insert(broker);
        }

        Ok(resources)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Broker>, ConfigError> {
        self.brokers
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownResource(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.brokers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resources")
            .field("brokers", &self.names())
            .finish()
    }
}
