//! World state for message scenario behavioural tests.

use std::sync::Arc;

use cucumber::World;
use msgscenario::correlate::Immediate;
use msgscenario::{
    Correlator, HarnessConfig, MemoryBroker, MessageSteps, Resources, ScenarioContext, StepError,
};

const HARNESS: &str = r#"
resources:
  local: { kind: memory }
destinations:
  ORDER_CREATED: { destination: orders-out, resource: local, message_type: JSON }
  ORDER_NOTE: { destination: orders-notes, resource: local, message_type: TEXT }
  AUDIT_Q: { destination: audit.queue, resource: local, kind: queue }
context:
  env: qa
sensitive_markers: [password]
"#;

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct ScenarioWorld {
    pub steps: MessageSteps,
    pub ctx: ScenarioContext,
    pub last_error: Option<StepError>,
}

impl ScenarioWorld {
    fn new() -> Self {
        let config = HarnessConfig::from_yaml_str(HARNESS).expect("harness config is valid");
        let registry = config.context_registry();
        let ctx = registry.with_scope(&msgscenario::WorkerId::current(), |ctx| ctx.clone());

        let mut resources = Resources::new();
        resources.insert(Arc::new(MemoryBroker::new("local")));

        let steps = MessageSteps::new(config, resources)
            .with_correlator(Correlator::new(Arc::new(Immediate), 3));

        Self {
            steps,
            ctx,
            last_error: None,
        }
    }

    /// Keep a failed step's error for a later assertion.
    pub fn record(&mut self, result: Result<(), StepError>) {
        self.last_error = result.err();
    }

    /// The error left by the previous step.
    ///
    /// # Panics
    /// Panics if the previous step succeeded.
    pub fn take_error(&mut self) -> StepError {
        self.last_error.take().expect("previous step should have failed")
    }
}
