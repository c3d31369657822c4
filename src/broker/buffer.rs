//! Per-destination receive buffers.
//!
//! Each destination has one append-only buffer fed by a single writer (the
//! in-memory broker or a NATS listener task). Readers take snapshots and never
//! drain the buffer; only the clear step removes messages.

use dashmap::DashMap;

use crate::message::Envelope;

/// Non-destructive read access to received messages.
pub trait EventSource: Send + Sync {
    /// Messages received on `destination`, oldest first.
    fn snapshot(&self, destination: &str) -> Vec<Envelope>;
}

/// Append-only buffers keyed by destination.
#[derive(Debug, Default)]
pub struct BufferStore {
    buffers: DashMap<String, Vec<Envelope>>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received message and return its offset in the buffer.
    pub fn append(&self, destination: &str, envelope: Envelope) -> u64 {
        let mut buffer = self.buffers.entry(destination.to_string()).or_default();
        buffer.push(envelope);
        (buffer.len() - 1) as u64
    }

    /// Drop everything received on `destination` so far.
    ///
    /// Returns the number of messages removed.
    pub fn clear(&self, destination: &str) -> usize {
        self.buffers
            .remove(destination)
            .map(|(_, buffer)| buffer.len())
            .unwrap_or(0)
    }

    /// Number of messages buffered for `destination`.
    pub fn len(&self, destination: &str) -> usize {
        self.buffers
            .get(destination)
            .map(|buffer| buffer.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, destination: &str) -> bool {
        self.len(destination) == 0
    }
}

impl EventSource for BufferStore {
    fn snapshot(&self, destination: &str) -> Vec<Envelope> {
        self.buffers
            .get(destination)
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(payload: &str) -> Envelope {
        Envelope::new("TEXT", None, payload)
    }

    #[test]
    fn test_append_returns_offsets() {
        let store = BufferStore::new();
        assert_eq!(store.append("orders-out", envelope("a")), 0);
        assert_eq!(store.append("orders-out", envelope("b")), 1);
        assert_eq!(store.append("audit", envelope("c")), 0);
    }

    #[test]
    fn test_snapshot_is_non_destructive() {
        let store = BufferStore::new();
        store.append("orders-out", envelope("a"));
        store.append("orders-out", envelope("b"));

        let first: Vec<String> = store
            .snapshot("orders-out")
            .iter()
            .map(|e| e.payload().to_string())
            .collect();
        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(store.snapshot("orders-out").len(), 2);
        assert!(store.snapshot("unknown").is_empty());
    }

    #[test]
    fn test_clear_only_touches_one_destination() {
        let store = BufferStore::new();
        store.append("orders-out", envelope("a"));
        store.append("audit", envelope("b"));

        assert_eq!(store.clear("orders-out"), 1);
        assert!(store.is_empty("orders-out"));
        assert_eq!(store.len("audit"), 1);
        assert_eq!(store.clear("orders-out"), 0);
    }
}
