//! Harness configuration.
//!
//! Maps logical event names to physical destinations and the resource (broker
//! connection) that serves them, and sets the polling budget.
//!
//! ```yaml
//! resources:
//!   local: { kind: memory }
//!   nats:  { kind: nats, url: "nats://localhost:4222", stream: SCENARIOS }
//! destinations:
//!   ORDER_CREATED: { destination: orders-out, resource: local, message_type: JSON }
//!   AUDIT_Q:       { destination: audit.queue, resource: local, kind: queue }
//! polling: { attempts: 5, interval_ms: 1000, strategy: fixed }
//! context: { env: qa }
//! sensitive_markers: [password, secret]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::ContextRegistry;
use crate::correlate::{Correlator, Escalating, FixedInterval, Immediate, RetryPolicy};
use crate::error::ConfigError;

pub const POLL_ATTEMPTS_ENV: &str = "MSGSCENARIO_POLL_ATTEMPTS";
pub const POLL_INTERVAL_ENV: &str = "MSGSCENARIO_POLL_INTERVAL_MS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Broker connections: resource name -> settings
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,

    /// Logical event name -> destination
    #[serde(default)]
    pub destinations: BTreeMap<String, DestinationConfig>,

    #[serde(default)]
    pub polling: PollingConfig,

    /// Values every scenario context starts with
    #[serde(default)]
    pub context: HashMap<String, String>,

    /// Key substrings whose values are masked in context dumps
    #[serde(default = "default_sensitive_markers")]
    pub sensitive_markers: Vec<String>,
}

fn default_sensitive_markers() -> Vec<String> {
    vec!["password".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceConfig {
    /// In-process broker
    Memory,
    /// NATS JetStream; `url` falls back to `NATS_URL`
    Nats {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        stream: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    #[default]
    Topic,
    Queue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Physical topic, subject or queue name
    pub destination: String,
    pub resource: String,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(default)]
    pub kind: DestinationKind,
}

fn default_message_type() -> String {
    "JSON".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStrategy {
    #[default]
    Fixed,
    Escalating,
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub strategy: PollStrategy,
    /// Cap for the escalating strategy
    #[serde(default)]
    pub max_interval_ms: Option<u64>,
}

fn default_attempts() -> u32 {
    5
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            interval_ms: default_interval_ms(),
            strategy: PollStrategy::default(),
            max_interval_ms: None,
        }
    }
}

impl PollingConfig {
    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        let interval = Duration::from_millis(self.interval_ms);
        match self.strategy {
            PollStrategy::Fixed => Arc::new(FixedInterval(interval)),
            PollStrategy::Immediate => Arc::new(Immediate),
            PollStrategy::Escalating => Arc::new(
                Escalating {
                    initial: interval,
                    max: Duration::from_millis(self.max_interval_ms.unwrap_or(self.interval_ms * 8)),
                }
                .normalized(),
            ),
        }
    }

    pub fn correlator(&self) -> Correlator {
        Correlator::new(self.retry_policy(), self.attempts)
    }
}

impl HarnessConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    /// Returns an error if the file can't be read, isn't valid YAML, or names
    /// a resource it doesn't configure
    ///
    /// # Example
    /// ```ignore
    /// use msgscenario::config::HarnessConfig;
    ///
    /// let config = HarnessConfig::load_from_file("config/harness.yaml")?;
    /// println!("Destinations: {:?}", config.destinations.keys());
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = serde_yaml::from_str(&contents)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        tracing::info!(
            "Loaded harness config from {} ({} resources, {} destinations)",
            path.display(),
            config.resources.len(),
            config.destinations.len()
        );
        Ok(config)
    }

    /// Parse and validate YAML without consulting the environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Override polling settings from `lookup` (normally the process
    /// environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(POLL_ATTEMPTS_ENV) {
            self.polling.attempts = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} must be a whole number, got '{}'", POLL_ATTEMPTS_ENV, raw))
            })?;
        }
        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            self.polling.interval_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} must be milliseconds, got '{}'", POLL_INTERVAL_ENV, raw))
            })?;
        }
        Ok(())
    }

    /// Every destination's resource must be configured and polling must make
    /// at least one attempt.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.attempts == 0 {
            return Err(ConfigError::Invalid("polling.attempts must be at least 1".to_string()));
        }
        for (event, destination) in &self.destinations {
            if !self.resources.contains_key(&destination.resource) {
                return Err(ConfigError::Invalid(format!(
                    "destination {} uses resource {} which is not configured",
                    event, destination.resource
                )));
            }
        }
        Ok(())
    }

    /// Look up a logical event name.
    pub fn destination(&self, event: &str) -> Result<&DestinationConfig, ConfigError> {
        self.destinations
            .get(event)
            .ok_or_else(|| ConfigError::UnknownDestination(event.to_string()))
    }

    /// Physical destinations served by `resource`.
    pub fn destinations_for(&self, resource: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .destinations
            .values()
            .filter(|d| d.resource == resource)
            .map(|d| d.destination.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Context registry seeded from this configuration.
    pub fn context_registry(&self) -> ContextRegistry {
        ContextRegistry::new(self.context.clone(), self.sensitive_markers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
resources:
  local: { kind: memory }
  nats: { kind: nats, url: "nats://broker:4222", stream: ORDERS }
destinations:
  ORDER_CREATED: { destination: orders-out, resource: local, message_type: JSON }
  AUDIT_Q: { destination: audit.queue, resource: local, kind: queue }
  ORDER_SHIPPED: { destination: orders.shipped, resource: nats }
polling: { attempts: 3, interval_ms: 10, strategy: escalating }
context: { env: qa }
sensitive_markers: [password, secret]
"#;

    #[test]
    fn test_parse_sample() {
        let config = HarnessConfig::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.resources["local"], ResourceConfig::Memory);
        assert_eq!(
            config.resources["nats"],
            ResourceConfig::Nats {
                url: Some("nats://broker:4222".to_string()),
                stream: Some("ORDERS".to_string())
            }
        );

        let created = config.destination("ORDER_CREATED").unwrap();
        assert_eq!(created.destination, "orders-out");
        assert_eq!(created.kind, DestinationKind::Topic);
        assert_eq!(config.destination("AUDIT_Q").unwrap().kind, DestinationKind::Queue);
        assert_eq!(config.destination("ORDER_SHIPPED").unwrap().message_type, "JSON");

        assert_eq!(config.polling.attempts, 3);
        assert_eq!(config.polling.strategy, PollStrategy::Escalating);
        assert_eq!(config.context["env"], "qa");
        assert_eq!(config.destinations_for("local"), vec!["audit.queue", "orders-out"]);
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::from_yaml_str("resources: {}").unwrap();
        assert_eq!(config.polling, PollingConfig::default());
        assert_eq!(config.sensitive_markers, vec!["password"]);
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn test_unknown_destination() {
        let config = HarnessConfig::from_yaml_str(SAMPLE).unwrap();
        assert!(matches!(
            config.destination("ORDER_DELETED"),
            Err(ConfigError::UnknownDestination(ref name)) if name == "ORDER_DELETED"
        ));
    }

    #[test]
    fn test_rejects_unconfigured_resource() {
        let yaml = "destinations:\n  X: { destination: x, resource: kafka }\n";
        assert!(matches!(HarnessConfig::from_yaml_str(yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        assert!(HarnessConfig::from_yaml_str("polling: { attempts: 0 }").is_err());
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            HarnessConfig::from_yaml_str("resources: [unterminated"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let mut config = HarnessConfig::from_yaml_str(SAMPLE).unwrap();
        config
            .apply_overrides(|name| match name {
                POLL_ATTEMPTS_ENV => Some("9".to_string()),
                POLL_INTERVAL_ENV => Some("25".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.polling.attempts, 9);
        assert_eq!(config.polling.interval_ms, 25);

        let err = config
            .apply_overrides(|name| (name == POLL_ATTEMPTS_ENV).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(POLL_ATTEMPTS_ENV));
    }

    #[test]
    fn test_escalating_policy_from_config() {
        let polling = PollingConfig {
            attempts: 4,
            interval_ms: 10,
            strategy: PollStrategy::Escalating,
            max_interval_ms: Some(30),
        };
        let policy = polling.retry_policy();
        assert_eq!(policy.delay(1), Duration::from_millis(10));
        assert_eq!(policy.delay(3), Duration::from_millis(30));
        assert_eq!(polling.correlator().attempts(), 4);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = HarnessConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.destinations.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            HarnessConfig::load_from_file("/nonexistent/harness.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
