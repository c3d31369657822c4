//! Message transport.
//!
//! A [`Broker`] is a [`Producer`] that also collects what arrives on the
//! destinations it listens to into a [`BufferStore`]. Steps reach brokers
//! through [`Resources`] by the resource name a destination is configured
//! with.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::TransportError;
use crate::message::Header;

pub mod buffer;
pub mod memory;
pub mod nats;
pub mod resources;

pub use buffer::{BufferStore, EventSource};
pub use memory::MemoryBroker;
pub use nats::{NatsBroker, NatsSettings};
pub use resources::Resources;

/// Header carrying the correlation key.
pub const KEY_HEADER: &str = "msg-key";

/// Header carrying the requested partition.
pub const PARTITION_HEADER: &str = "msg-partition";

/// Broker acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub resource: String,
    pub destination: String,
    /// Position assigned by the broker (stream sequence or buffer offset)
    pub sequence: u64,
}

/// Sends messages to a destination and waits for the acknowledgement.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        key: Option<&str>,
        payload: &str,
        partition: Option<u32>,
        headers: &[Header],
    ) -> Result<Delivery, TransportError>;
}

/// A producer that also buffers what it receives.
#[async_trait]
pub trait Broker: Producer {
    /// Resource name this broker was configured under.
    fn name(&self) -> &str;

    /// Buffers fed by this broker's listeners.
    fn buffers(&self) -> &BufferStore;

    /// Start buffering messages that arrive on `destination`.
    ///
    /// Listening twice on the same destination is a no-op.
    async fn listen(&self, destination: &str) -> Result<(), TransportError>;
}

/// Headers in send order, with the key and partition headers appended.
pub(crate) fn outgoing_headers(key: Option<&str>, partition: Option<u32>, headers: &[Header]) -> Vec<Header> {
    let mut all = headers.to_vec();
    if let Some(key) = key {
        all.push(Header::new(KEY_HEADER, key));
    }
    if let Some(partition) = partition {
        all.push(Header::new(PARTITION_HEADER, partition.to_string()));
    }
    all
}
