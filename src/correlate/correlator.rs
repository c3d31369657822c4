//! Bounded polling for an expected message.
//!
//! Each attempt takes a fresh snapshot of the destination's buffer and scans it
//! oldest first; the first match wins. After a miss the correlator sleeps for
//! the policy's delay, except after the last attempt.

use std::sync::Arc;

use crate::broker::EventSource;
use crate::correlate::policy::{FixedInterval, RetryPolicy};
use crate::correlate::predicate::ContentPredicate;
use crate::error::StepError;
use crate::message::{document_id, Envelope};

/// Outcome of a correlation. Absence is an outcome, not an error.
#[derive(Debug, Clone)]
pub struct Correlation {
    pub envelope: Option<Envelope>,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

impl Correlation {
    pub fn is_found(&self) -> bool {
        self.envelope.is_some()
    }

    /// The envelope, or a correlation miss naming what was looked for.
    pub fn require(self, destination: &str, identifier: &str) -> Result<Envelope, StepError> {
        self.envelope.ok_or_else(|| StepError::CorrelationMiss {
            destination: destination.to_string(),
            identifier: identifier.to_string(),
            attempts: self.attempts,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Correlator {
    policy: Arc<dyn RetryPolicy>,
    attempts: u32,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(Arc::new(FixedInterval::default()), 5)
    }
}

impl Correlator {
    /// Correlator making at most `attempts` attempts (at least one).
    pub fn new(policy: Arc<dyn RetryPolicy>, attempts: u32) -> Self {
        Self {
            policy,
            attempts: attempts.max(1),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Same policy with a different attempt budget.
    pub fn with_attempts(&self, attempts: u32) -> Self {
        Self::new(Arc::clone(&self.policy), attempts)
    }

    /// Find the message correlated with `identifier`.
    ///
    /// A message matches when its key equals the identifier. Messages without
    /// a key match on their payload's top-level `id` field.
    pub async fn get_event(&self, source: &dyn EventSource, destination: &str, identifier: &str) -> Correlation {
        self.poll(source, destination, identifier, |envelope| match envelope.key() {
            Some(key) => key == identifier,
            None => envelope
                .payload_json()
                .ok()
                .and_then(|document| document_id(&document))
                .is_some_and(|id| id == identifier),
        })
        .await
    }

    /// Find the first message whose payload satisfies `predicate`.
    pub async fn find_event(&self, source: &dyn EventSource, destination: &str, predicate: &ContentPredicate) -> Correlation {
        self.poll(source, destination, &predicate.to_string(), |envelope| {
            predicate.matches_envelope(envelope)
        })
        .await
    }

    async fn poll<F>(&self, source: &dyn EventSource, destination: &str, looking_for: &str, is_match: F) -> Correlation
    where
        F: Fn(&Envelope) -> bool,
    {
        for attempt in 1..=self.attempts {
            let snapshot = source.snapshot(destination);
            tracing::debug!(
                destination,
                attempt,
                buffered = snapshot.len(),
                "Looking for {}",
                looking_for
            );

            if let Some(envelope) = snapshot.into_iter().find(|e| is_match(e)) {
                return Correlation {
                    envelope: Some(envelope),
                    attempts: attempt,
                };
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.policy.delay(attempt)).await;
            }
        }

        tracing::warn!(
            "No message for {} on {} after {} attempt(s)",
            looking_for,
            destination,
            self.attempts
        );
        Correlation {
            envelope: None,
            attempts: self.attempts,
        }
    }
}
