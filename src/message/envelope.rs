/// Message envelope
///
/// Normalized unit handed to a producer: correlation key, payload document and
/// headers, plus tracking metadata.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A single message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A built message. Immutable once built: fields are only readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique message ID for tracking
    message_id: Uuid,

    /// Correlation key; `None` means unkeyed delivery
    key: Option<String>,

    /// Payload document (JSON text or free text)
    payload: String,

    /// Ordered headers
    #[serde(default)]
    headers: Vec<Header>,

    /// Name of the builder that produced the envelope
    message_type: String,

    /// Timestamp when the envelope was built or received
    created_at: DateTime<Utc>,
}

impl Envelope {
    /// Create a new message envelope
    pub fn new(message_type: impl Into<String>, key: Option<String>, payload: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            key,
            payload: payload.into(),
            headers: Vec::new(),
            message_type: message_type.into(),
            created_at: Utc::now(),
        }
    }

    /// Envelope for a message taken off a broker. The type comes from the
    /// `message-type` header when the sender set one.
    pub fn received(key: Option<String>, payload: impl Into<String>, headers: Vec<Header>) -> Self {
        let message_type = headers
            .iter()
            .find(|h| h.name == "message-type")
            .map(|h| h.value.clone())
            .unwrap_or_else(|| "RAW".to_string());
        Self {
            headers,
            ..Self::new(message_type, key, payload)
        }
    }

    /// Append a header while the envelope is being assembled.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Append several headers, keeping their order.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = Header>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// First header with the given name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Parse the payload as JSON.
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Message{{id={}, key={}, body={}}}",
            self.message_type,
            self.message_id,
            self.key.as_deref().unwrap_or("-"),
            self.payload
        )
    }
}
