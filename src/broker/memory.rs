//! In-process broker.
//!
//! Delivery and listening are the same act: a sent message is appended to the
//! destination's buffer straight away. Used by the test suites and by
//! `kind: memory` resources.

use async_trait::async_trait;

use crate::broker::{outgoing_headers, Broker, BufferStore, Delivery, Producer};
use crate::error::TransportError;
use crate::message::{Envelope, Header};

#[derive(Debug)]
pub struct MemoryBroker {
    name: String,
    buffers: BufferStore,
}

impl MemoryBroker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffers: BufferStore::new(),
        }
    }
}

#[async_trait]
impl Producer for MemoryBroker {
    async fn send(
        &self,
        destination: &str,
        key: Option<&str>,
        payload: &str,
        partition: Option<u32>,
        headers: &[Header],
    ) -> Result<Delivery, TransportError> {
        let envelope = Envelope::received(
            key.map(str::to_string),
            payload,
            outgoing_headers(key, partition, headers),
        );
        let sequence = self.buffers.append(destination, envelope);

        tracing::debug!(
            resource = %self.name,
            destination,
            sequence,
            "Delivered message in memory"
        );

        Ok(Delivery {
            resource: self.name.clone(),
            destination: destination.to_string(),
            sequence,
        })
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn name(&self) -> &str {
        &self.name
    }

    fn buffers(&self) -> &BufferStore {
        &self.buffers
    }

    async fn listen(&self, _destination: &str) -> Result<(), TransportError> {
        Ok(())
    }
}
