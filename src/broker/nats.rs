/// NATS JetStream broker
///
/// Publishes through JetStream (durable, acknowledged) and listens on plain
/// subscriptions, buffering every message that arrives on a listened subject.

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream;
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::broker::{outgoing_headers, Broker, BufferStore, Delivery, Producer, KEY_HEADER};
use crate::error::TransportError;
use crate::message::{Envelope, Header};

#[derive(Debug, Clone)]
pub struct NatsSettings {
    pub url: String,
    pub stream_name: String,
    /// Subjects the stream captures; one per configured destination
    pub subjects: Vec<String>,
    pub max_age: Duration,
    pub max_bytes: i64,
}

impl Default for NatsSettings {
    fn default() -> Self {
        Self {
            url: std::env::var("NATS_URL")
                .unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            stream_name: std::env::var("NATS_STREAM")
                .unwrap_or_else(|_| "SCENARIOS".to_string()),
            subjects: Vec::new(),
            max_age: Duration::from_secs(60 * 60), // 1 hour
            max_bytes: 64 * 1024 * 1024, // 64MB
        }
    }
}

pub struct NatsBroker {
    name: String,
    client: async_nats::Client,
    jetstream: jetstream::Context,
    buffers: Arc<BufferStore>,
    listeners: DashMap<String, JoinHandle<()>>,
}

impl NatsBroker {
    /// Connect to NATS and make sure the stream exists
    pub async fn connect(name: impl Into<String>, settings: NatsSettings) -> Result<Self, TransportError> {
        let name = name.into();
        let connect_error = |reason: String| TransportError::Connect {
            resource: name.clone(),
            reason,
        };

        let client = async_nats::connect(&settings.url)
            .await
            .map_err(|e| connect_error(e.to_string()))?;
        tracing::info!("Connected to NATS at {}", settings.url);

        let jetstream = jetstream::new(client.clone());

        if !settings.subjects.is_empty() {
            jetstream
                .get_or_create_stream(jetstream::stream::Config {
                    name: settings.stream_name.clone(),
                    subjects: settings.subjects.clone(),
                    max_age: settings.max_age,
                    max_bytes: settings.max_bytes,
                    storage: jetstream::stream::StorageType::File,
                    num_replicas: 1,
                    ..Default::default()
                })
                .await
                .map_err(|e| connect_error(e.to_string()))?;

            tracing::info!(
                "JetStream stream '{}' ready for {:?}",
                settings.stream_name,
                settings.subjects
            );
        }

        Ok(Self {
            name,
            client,
            jetstream,
            buffers: Arc::new(BufferStore::new()),
            listeners: DashMap::new(),
        })
    }

    /// Check if the NATS connection is active
    pub fn is_connected(&self) -> bool {
        self.client.connection_state() == async_nats::connection::State::Connected
    }
}

impl std::fmt::Debug for NatsBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsBroker")
            .field("name", &self.name)
            .field("listening", &self.listeners.len())
            .finish()
    }
}

impl Drop for NatsBroker {
    fn drop(&mut self) {
        for listener in self.listeners.iter() {
            listener.value().abort();
        }
    }
}

fn to_header_map(headers: &[Header]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for header in headers {
        map.append(header.name.as_str(), header.value.as_str());
    }
    map
}

fn to_envelope(message: &async_nats::Message) -> Envelope {
    let mut headers = Vec::new();
    let mut key = None;

    if let Some(map) = &message.headers {
        for (name, values) in map.iter() {
            let name = name.to_string();
            for value in values {
                if name == KEY_HEADER {
                    key = Some(value.as_str().to_string());
                }
                headers.push(Header::new(name.clone(), value.as_str()));
            }
        }
    }

    Envelope::received(key, String::from_utf8_lossy(&message.payload), headers)
}

#[async_trait]
impl Producer for NatsBroker {
    async fn send(
        &self,
        destination: &str,
        key: Option<&str>,
        payload: &str,
        partition: Option<u32>,
        headers: &[Header],
    ) -> Result<Delivery, TransportError> {
        let publish_error = |reason: String| TransportError::Publish {
            resource: self.name.clone(),
            destination: destination.to_string(),
            reason,
        };

        let headers = to_header_map(&outgoing_headers(key, partition, headers));

        let ack = self
            .jetstream
            .publish_with_headers(destination.to_string(), headers, Bytes::from(payload.to_string()))
            .await
            .map_err(|e| publish_error(e.to_string()))?;

        // Wait for acknowledgment
        let ack = ack.await.map_err(|e| publish_error(e.to_string()))?;

        tracing::debug!(
            "Published message to JetStream subject {} (stream {}, sequence {})",
            destination,
            ack.stream,
            ack.sequence
        );

        Ok(Delivery {
            resource: self.name.clone(),
            destination: destination.to_string(),
            sequence: ack.sequence,
        })
    }
}

#[async_trait]
impl Broker for NatsBroker {
    fn name(&self) -> &str {
        &self.name
    }

    fn buffers(&self) -> &BufferStore {
        &self.buffers
    }

    async fn listen(&self, destination: &str) -> Result<(), TransportError> {
        if self.listeners.contains_key(destination) {
            return Ok(());
        }

        let mut subscriber = self
            .client
            .subscribe(destination.to_string())
            .await
            .map_err(|e| TransportError::Subscribe {
                resource: self.name.clone(),
                destination: destination.to_string(),
                reason: e.to_string(),
            })?;

        let buffers = Arc::clone(&self.buffers);
        let subject = destination.to_string();
        let handle = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                let offset = buffers.append(&subject, to_envelope(&message));
                tracing::debug!("Buffered message {} from {}", offset, subject);
            }
            tracing::info!("Listener for {} stopped", subject);
        });

        tracing::info!("Listening on {} for resource {}", destination, self.name);
        self.listeners.insert(destination.to_string(), handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_keeps_repeated_names() {
        let map = to_header_map(&[
            Header::new("trace-id", "a"),
            Header::new("trace-id", "b"),
            Header::new(KEY_HEADER, "7"),
        ]);
        assert_eq!(map.get(KEY_HEADER).map(|v| v.as_str()), Some("7"));
        let trace_ids: usize = map
            .iter()
            .filter(|(name, _)| name.to_string() == "trace-id")
            .map(|(_, values)| values.len())
            .sum();
        assert_eq!(trace_ids, 2);
    }

    #[test]
    fn test_settings_default_stream() {
        let settings = NatsSettings::default();
        assert!(settings.subjects.is_empty());
        assert!(!settings.url.is_empty());
    }
}
