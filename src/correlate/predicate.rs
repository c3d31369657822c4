//! Content predicates for finding messages by payload.
//!
//! Three forms:
//!
//! ```text
//! $.order.status            field exists and is not null
//! $.order.status=NEW        field equals the value
//! $.order.total!=d~0.0      field differs from the value
//! ```
//!
//! A tagged value compares with typed equality. An untagged value compares
//! as text against strings, and against the JSON rendering of other scalars.

use std::fmt;

use serde_json::Value;

use crate::error::StepError;
use crate::extraction::FieldPath;
use crate::message::Envelope;
use crate::resolve::TypedLiteral;

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Exists,
    Equals(TypedLiteral),
    NotEquals(TypedLiteral),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentPredicate {
    raw: String,
    path: FieldPath,
    condition: Condition,
}

impl ContentPredicate {
    pub fn parse(raw: &str) -> Result<Self, StepError> {
        let raw = raw.trim();

        let (path, condition) = if let Some((path, value)) = raw.split_once("!=") {
            (path, Condition::NotEquals(TypedLiteral::decode(value.trim())?))
        } else if let Some((path, value)) = raw.split_once('=') {
            (path, Condition::Equals(TypedLiteral::decode(value.trim())?))
        } else {
            (raw, Condition::Exists)
        };

        Ok(Self {
            raw: raw.to_string(),
            path: FieldPath::parse(path.trim())?,
            condition,
        })
    }

    /// Evaluate against a JSON document.
    pub fn matches(&self, document: &Value) -> bool {
        let actual = self.path.select(document);
        match &self.condition {
            Condition::Exists => actual.is_some_and(|v| !v.is_null()),
            Condition::Equals(expected) => actual.is_some_and(|v| equals(expected, v)),
            Condition::NotEquals(expected) => !actual.is_some_and(|v| equals(expected, v)),
        }
    }

    /// Evaluate against an envelope's payload. Non-JSON payloads never match.
    pub fn matches_envelope(&self, envelope: &Envelope) -> bool {
        envelope
            .payload_json()
            .map(|document| self.matches(&document))
            .unwrap_or(false)
    }
}

fn equals(expected: &TypedLiteral, actual: &Value) -> bool {
    match (expected, actual) {
        (TypedLiteral::String(text), Value::String(s)) => text == s,
        (TypedLiteral::String(text), Value::Null) => text == "null",
        (TypedLiteral::String(text), other) => *text == other.to_string(),
        (typed, other) => typed.matches(other),
    }
}

impl fmt::Display for ContentPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
