//! # msgscenario: Message Scenario Engine
//!
//! Core of a behavior-driven test harness for message brokers. Scenario steps
//! build messages from human-written input, send them through a named broker
//! resource, then poll for the messages a system under test produced and
//! verify them structurally.
//!
//! ## Features
//!
//! - **Scenario context**: worker-scoped key/value store with masked dumps
//! - **Variable resolution**: `[key]` and `[k1,k2]` references, recursive,
//!   cycle-safe, with structured diagnostics on misses
//! - **Typed literals**: `i~42`, `l~`, `d~`, `f~`, `b~true` for typed values
//! - **Builders**: JSON and TEXT envelopes from lines, tables, maps or files
//! - **Brokers**: in-memory and NATS JetStream producers with receive buffers
//! - **Correlation**: bounded polling by key or content predicate
//! - **Verification**: whole-document comparison with every difference
//!   reported, or fail-fast field checks
//!
//! ## Example
//!
//! ```yaml
//! resources:
//!   local: { kind: memory }
//! destinations:
//!   ORDER_CREATED: { destination: orders-out, resource: local, message_type: JSON }
//! polling: { attempts: 3, interval_ms: 500 }
//! ```
//!
//! ```text
//! Given send message event ORDER_CREATED on local with type JSON
//!   | {"id": "[order_id]", "status": "NEW"} |
//! Then verify ORDER_CREATED contains [order_id] on local with type JSON
//!   | id,status        |
//!   | [order_id],NEW   |
//! ```

// Core modules
pub mod error;
pub mod context;
pub mod resolve;
pub mod extraction;
pub mod document;

// Messages and transport
pub mod message;
pub mod broker;
pub mod correlate;

// Verification and step handlers
pub mod verify;
pub mod config;
pub mod steps;

// Re-export key types
pub use error::{BuildError, ConfigError, LiteralError, StepError, TransportError};
pub use context::{ContextRegistry, ScenarioContext, WorkerId};
pub use resolve::{Diagnostic, Resolution, ResolverConfig, TypedLiteral, VariableResolver};
pub use extraction::FieldPath;

pub use message::{BuilderRegistry, Envelope, Header, MessageBuilder, RawInput};
pub use broker::{Broker, BufferStore, Delivery, EventSource, MemoryBroker, NatsBroker, Producer, Resources};
pub use correlate::{ContentPredicate, Correlation, Correlator, RetryPolicy};

pub use verify::{compare, CompareMode, Mismatches};
pub use config::HarnessConfig;
pub use steps::MessageSteps;
