//! Error taxonomy for scenario steps.
//!
//! Configuration, build and transport faults abort a step immediately.
//! Correlation misses and mismatches are ordinary test failures and read as
//! "expected vs. actual" in a report. Resolution misses never reach this
//! module: they are recorded as [`Diagnostic`](crate::resolve::Diagnostic)s.

use std::path::PathBuf;

use thiserror::Error;

use crate::extraction::InvalidPath;
use crate::verify::Mismatches;

/// Unknown names and invalid configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not configured for any destination")]
    UnknownDestination(String),

    #[error("message type {0} is not registered")]
    UnknownMessageType(String),

    #[error("resource {0} is not configured")]
    UnknownResource(String),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Raw step input that a builder could not normalize.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{builder} message is malformed ({reason}): {input}")]
    Malformed {
        builder: String,
        reason: String,
        input: String,
    },

    #[error("{builder} builder does not accept {shape} input")]
    UnsupportedInput { builder: String, shape: &'static str },

    #[error("failed to read payload file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Literal(#[from] LiteralError),

    #[error(transparent)]
    Path(#[from] InvalidPath),
}

/// A broker could not be reached or rejected a message.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("resource {resource}: connection failed: {reason}")]
    Connect { resource: String, reason: String },

    #[error("resource {resource}: publish to {destination} failed: {reason}")]
    Publish {
        resource: String,
        destination: String,
        reason: String,
    },

    #[error("resource {resource}: subscribe to {destination} failed: {reason}")]
    Subscribe {
        resource: String,
        destination: String,
        reason: String,
    },
}

/// A tagged literal whose value does not parse for its tag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("literal {input} is not a valid {expected}")]
    InvalidValue { input: String, expected: &'static str },
}

/// Outcome of a failed step.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("unable to build message: {0}")]
    Build(#[from] BuildError),

    #[error("transport fault: {0}")]
    Transport(#[from] TransportError),

    #[error("unable to read {destination} with identifier {identifier} after {attempts} attempt(s)")]
    CorrelationMiss {
        destination: String,
        identifier: String,
        attempts: u32,
    },

    #[error("expected and actual documents differ:\n{0}")]
    Mismatch(Mismatches),

    #[error("{path} did not match: expected {expected}, actual {actual}")]
    FieldMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("document is not valid JSON ({reason}): {document}")]
    InvalidDocument { reason: String, document: String },

    #[error(transparent)]
    Literal(#[from] LiteralError),

    #[error(transparent)]
    Path(#[from] InvalidPath),
}

impl StepError {
    /// True for reportable test failures, false for configuration, build and
    /// transport faults.
    pub fn is_test_failure(&self) -> bool {
        matches!(
            self,
            StepError::CorrelationMiss { .. }
                | StepError::Mismatch(_)
                | StepError::FieldMismatch { .. }
        )
    }
}
