//! Step handlers.
//!
//! Each operation backs one scenario step: build and send a message, wait,
//! clear what was consumed, or find a received message and verify it. Event
//! names, identifiers and payloads may carry `[key]` references, resolved
//! against the scenario context passed in.

pub mod attachments;

pub use attachments::{Attachment, AttachmentLog, ACTUAL_RESPONSE, EXPECTED_RESPONSE};

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;

use crate::broker::{Broker, Delivery, Resources};
use crate::config::HarnessConfig;
use crate::context::ScenarioContext;
use crate::correlate::{ContentPredicate, Correlator};
use crate::error::StepError;
use crate::extraction::FieldPath;
use crate::message::{BuildContext, BuilderRegistry, Envelope, MessageBuilder, RawInput, TextBuilder};
use crate::resolve::VariableResolver;
use crate::verify::{compare, expected_for, expected_rows, verify_fields, CompareMode};

#[derive(Debug)]
pub struct MessageSteps {
    config: HarnessConfig,
    builders: BuilderRegistry,
    resources: Resources,
    resolver: VariableResolver,
    correlator: Correlator,
    compare_mode: CompareMode,
    attachments: AttachmentLog,
    last_received: Option<Value>,
}

impl MessageSteps {
    /// Steps over already connected resources, with the built-in builders.
    pub fn new(config: HarnessConfig, resources: Resources) -> Self {
        let correlator = config.polling.correlator();
        Self {
            config,
            builders: BuilderRegistry::with_builtins(),
            resources,
            resolver: VariableResolver::default(),
            correlator,
            compare_mode: CompareMode::default(),
            attachments: AttachmentLog::default(),
            last_received: None,
        }
    }

    /// Connect the configured resources and build the steps over them.
    pub async fn connect(config: HarnessConfig) -> Result<Self, StepError> {
        let resources = Resources::connect(&config).await?;
        Ok(Self::new(config, resources))
    }

    pub fn with_builders(mut self, builders: BuilderRegistry) -> Self {
        self.builders = builders;
        self
    }

    pub fn with_resolver(mut self, resolver: VariableResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_correlator(mut self, correlator: Correlator) -> Self {
        self.correlator = correlator;
        self
    }

    pub fn with_compare_mode(mut self, mode: CompareMode) -> Self {
        self.compare_mode = mode;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn attachments(&self) -> &AttachmentLog {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentLog {
        &mut self.attachments
    }

    /// Document found by the last successful verify step.
    pub fn last_received(&self) -> Option<&Value> {
        self.last_received.as_ref()
    }

    fn text(&self, ctx: &ScenarioContext, raw: &str) -> String {
        self.resolver.resolve(ctx, raw).value
    }

    fn broker(&self, ctx: &ScenarioContext, resource: &str) -> Result<Arc<dyn Broker>, StepError> {
        Ok(self.resources.get(&self.text(ctx, resource))?)
    }

    /// Build a message of `message_type` (or the event's configured type) and
    /// send it to the event's destination.
    ///
    /// # Arguments
    /// * `event` - Logical event name from the configuration
    /// * `resource` - Resource to send through
    /// * `message_type` - Builder name; `None` uses the destination's type
    /// * `input` - Raw step input
    /// * `partition` - Partition requested from the broker, if any
    pub async fn send_message(
        &self,
        ctx: &ScenarioContext,
        event: &str,
        resource: &str,
        message_type: Option<&str>,
        input: RawInput,
        partition: Option<u32>,
    ) -> Result<Delivery, StepError> {
        let event = self.text(ctx, event);
        let destination = self.config.destination(&event)?;
        let builder = self
            .builders
            .get(message_type.unwrap_or(&destination.message_type))?;

        let cx = BuildContext::new(ctx, &self.resolver);
        let envelope = builder.build(&cx, &input)?;
        for diagnostic in cx.take_diagnostics() {
            tracing::debug!("While building {}: {}", event, diagnostic);
        }

        self.deliver(ctx, resource, &destination.destination, &envelope, partition)
            .await
    }

    /// Send free text to a queue. `queue` may be a logical event name or a
    /// physical destination.
    pub async fn send_queue_message(
        &self,
        ctx: &ScenarioContext,
        queue: &str,
        resource: &str,
        lines: &[String],
    ) -> Result<Delivery, StepError> {
        let queue = self.text(ctx, queue);
        let destination = self
            .config
            .destination(&queue)
            .map(|d| d.destination.clone())
            .unwrap_or(queue);

        let cx = BuildContext::new(ctx, &self.resolver);
        let envelope = TextBuilder.build(&cx, &RawInput::Lines(lines.to_vec()))?;

        self.deliver(ctx, resource, &destination, &envelope, None).await
    }

    async fn deliver(
        &self,
        ctx: &ScenarioContext,
        resource: &str,
        destination: &str,
        envelope: &Envelope,
        partition: Option<u32>,
    ) -> Result<Delivery, StepError> {
        let broker = self.broker(ctx, resource)?;
        let delivery = broker
            .send(destination, envelope.key(), envelope.payload(), partition, envelope.headers())
            .await?;

        tracing::info!(
            "Sent {} to {} via {} (sequence {})",
            envelope,
            destination,
            delivery.resource,
            delivery.sequence
        );
        Ok(delivery)
    }

    /// Wait before the next step.
    pub async fn pause(&self, millis: u64) {
        tracing::debug!("Pausing for {}ms", millis);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// Forget everything received so far for an event. Returns how many
    /// messages were dropped.
    pub fn clear_consumed(&self, ctx: &ScenarioContext, event: &str) -> Result<usize, StepError> {
        let event = self.text(ctx, event);
        let destination = self.config.destination(&event)?;
        let broker = self.resources.get(&destination.resource)?;

        let cleared = broker.buffers().clear(&destination.destination);
        tracing::info!("Cleared {} consumed message(s) from {}", cleared, destination.destination);
        Ok(cleared)
    }

    /// Find the message for `id` and compare it with the CSV-style expected
    /// rows.
    pub async fn verify_event(
        &mut self,
        ctx: &ScenarioContext,
        event: &str,
        id: &str,
        resource: &str,
        message_type: &str,
        csv_lines: &[String],
    ) -> Result<(), StepError> {
        let actual = self.received_document(ctx, event, id, resource, message_type).await?;
        let rows = expected_rows(ctx, &self.resolver, csv_lines)?;
        self.compare_documents(ctx, &rows, actual)
    }

    /// Find the message for `id` and check the listed fields, stopping at the
    /// first mismatch.
    pub async fn verify_event_elements(
        &mut self,
        ctx: &ScenarioContext,
        event: &str,
        id: &str,
        resource: &str,
        message_type: &str,
        fields: &IndexMap<String, String>,
    ) -> Result<(), StepError> {
        let actual = self.received_document(ctx, event, id, resource, message_type).await?;
        self.attachments.record(Attachment::json(ACTUAL_RESPONSE, &actual));

        let result = verify_fields(ctx, &self.resolver, &actual, fields);
        if result.is_err() {
            tracing::debug!(context = ?ctx.snapshot(), "Field verification failed");
        }
        self.last_received = Some(actual);
        result
    }

    /// Find the first message on `queue` matching `predicate` and compare it
    /// with the CSV-style expected rows.
    pub async fn verify_find(
        &mut self,
        ctx: &ScenarioContext,
        queue: &str,
        predicate: &str,
        resource: &str,
        csv_lines: &[String],
    ) -> Result<(), StepError> {
        let queue = self.text(ctx, queue);
        let destination = self
            .config
            .destination(&queue)
            .map(|d| d.destination.clone())
            .unwrap_or(queue);
        let predicate = ContentPredicate::parse(&self.text(ctx, predicate))?;
        let broker = self.broker(ctx, resource)?;

        let envelope = self
            .correlator
            .find_event(broker.buffers(), &destination, &predicate)
            .await
            .require(&destination, &predicate.to_string())?;
        let actual = parse_payload(&envelope)?;

        let rows = expected_rows(ctx, &self.resolver, csv_lines)?;
        self.compare_documents(ctx, &rows, actual)
    }

    /// Store a value (references resolved) under `key`.
    pub fn remember(&self, ctx: &mut ScenarioContext, key: &str, value: &str) {
        let value = self.text(ctx, value);
        tracing::debug!("Remembering {}", key);
        ctx.set(key, value);
    }

    /// Store the value at `path` of the last verified document under `key`.
    /// Strings are stored as is, other values as JSON text.
    pub fn remember_field(&self, ctx: &mut ScenarioContext, key: &str, path: &str) -> Result<(), StepError> {
        let path = FieldPath::parse(&self.text(ctx, path))?;
        let value = self
            .last_received
            .as_ref()
            .and_then(|document| path.select(document))
            .ok_or_else(|| StepError::FieldMismatch {
                path: path.to_string(),
                expected: "a value to remember".to_string(),
                actual: "<absent>".to_string(),
            })?;

        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        ctx.set(key, text);
        Ok(())
    }

    async fn received_document(
        &mut self,
        ctx: &ScenarioContext,
        event: &str,
        id: &str,
        resource: &str,
        message_type: &str,
    ) -> Result<Value, StepError> {
        let event = self.text(ctx, event);
        let id = self.text(ctx, id);
        let destination = self.config.destination(&event)?.destination.clone();
        self.builders.get(&self.text(ctx, message_type))?;
        let broker = self.broker(ctx, resource)?;

        let envelope = self
            .correlator
            .get_event(broker.buffers(), &destination, &id)
            .await
            .require(&destination, &id)?;
        parse_payload(&envelope)
    }

    fn compare_documents(&mut self, ctx: &ScenarioContext, rows: &Value, actual: Value) -> Result<(), StepError> {
        let expected = expected_for(rows, &actual);
        self.attachments.record(Attachment::json(EXPECTED_RESPONSE, &expected));
        self.attachments.record(Attachment::json(ACTUAL_RESPONSE, &actual));

        let result = compare(&expected, &actual, self.compare_mode).map_err(StepError::Mismatch);
        if result.is_err() {
            tracing::debug!(context = ?ctx.snapshot(), "Document verification failed");
        }
        self.last_received = Some(actual);
        result
    }
}

fn parse_payload(envelope: &Envelope) -> Result<Value, StepError> {
    envelope
        .payload_json()
        .map_err(|e| StepError::InvalidDocument {
            reason: e.to_string(),
            document: envelope.payload().to_string(),
        })
}
