//! Steps for message scenario behavioural tests.

use cucumber::gherkin::Step;
use cucumber::{given, then, when};
use indexmap::IndexMap;
use msgscenario::{RawInput, StepError};

use crate::world::ScenarioWorld;

fn docstring_lines(step: &Step) -> Vec<String> {
    step.docstring
        .as_deref()
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// First cell of every table row: one CSV line per row.
fn csv_lines(step: &Step) -> Vec<String> {
    step.table
        .as_ref()
        .map(|table| {
            table
                .rows
                .iter()
                .filter_map(|row| row.first().cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// Two-column table as an ordered map.
fn key_values(step: &Step) -> IndexMap<String, String> {
    step.table
        .as_ref()
        .map(|table| {
            table
                .rows
                .iter()
                .filter(|row| row.len() >= 2)
                .map(|row| (row[0].clone(), row[1].clone()))
                .collect()
        })
        .unwrap_or_default()
}

#[given(expr = "remember {word} as {string}")]
fn remember(world: &mut ScenarioWorld, key: String, value: String) {
    world.steps.remember(&mut world.ctx, &key, &value);
}

#[given(expr = "send message event {word} on {word} with type {word}")]
async fn send_inline(world: &mut ScenarioWorld, step: &Step, event: String, resource: String, message_type: String) {
    world
        .steps
        .send_message(&world.ctx, &event, &resource, Some(&message_type), RawInput::Lines(docstring_lines(step)), None)
        .await
        .expect("message is sent");
}

#[given(expr = "send message event {word} in partition {int} on {word} with type {word}")]
async fn send_partitioned(
    world: &mut ScenarioWorld,
    step: &Step,
    event: String,
    partition: u32,
    resource: String,
    message_type: String,
) {
    world
        .steps
        .send_message(
            &world.ctx,
            &event,
            &resource,
            Some(&message_type),
            RawInput::Lines(docstring_lines(step)),
            Some(partition),
        )
        .await
        .expect("message is sent");
}

#[given(expr = "send mapson message event {word} on {word} with type {word}")]
async fn send_mapson(world: &mut ScenarioWorld, step: &Step, event: String, resource: String, message_type: String) {
    world
        .steps
        .send_message(&world.ctx, &event, &resource, Some(&message_type), RawInput::Map(key_values(step)), None)
        .await
        .expect("message is sent");
}

#[given(expr = "send inline message to queue {word} on {word}")]
async fn send_queue(world: &mut ScenarioWorld, step: &Step, queue: String, resource: String) {
    world
        .steps
        .send_queue_message(&world.ctx, &queue, &resource, &docstring_lines(step))
        .await
        .expect("queue message is sent");
}

#[when(expr = "pause message processing for {int} milliseconds")]
async fn pause(world: &mut ScenarioWorld, millis: u64) {
    world.steps.pause(millis).await;
}

#[when(expr = "clear the consumed messages for {word}")]
fn clear_consumed(world: &mut ScenarioWorld, event: String) {
    world
        .steps
        .clear_consumed(&world.ctx, &event)
        .expect("event is configured");
}

#[then(expr = "verify {word} contains {word} on {word} with type {word}")]
async fn verify_event(world: &mut ScenarioWorld, step: &Step, event: String, id: String, resource: String, message_type: String) {
    world
        .steps
        .verify_event(&world.ctx, &event, &id, &resource, &message_type, &csv_lines(step))
        .await
        .expect("event matches");
}

#[then(expr = "verify-by-elements {word} contains {word} on {word} with type {word}")]
async fn verify_elements(world: &mut ScenarioWorld, step: &Step, event: String, id: String, resource: String, message_type: String) {
    world
        .steps
        .verify_event_elements(&world.ctx, &event, &id, &resource, &message_type, &key_values(step))
        .await
        .expect("fields match");
}

#[then(expr = "verify {word} finds {string} on {word}")]
async fn verify_find(world: &mut ScenarioWorld, step: &Step, queue: String, predicate: String, resource: String) {
    world
        .steps
        .verify_find(&world.ctx, &queue, &predicate, &resource, &csv_lines(step))
        .await
        .expect("a matching message is found");
}

#[when(expr = "checking {word} contains {word} on {word} with type {word}")]
async fn check_event(world: &mut ScenarioWorld, step: &Step, event: String, id: String, resource: String, message_type: String) {
    let result = world
        .steps
        .verify_event(&world.ctx, &event, &id, &resource, &message_type, &csv_lines(step))
        .await;
    world.record(result);
}

#[when(expr = "checking elements of {word} contains {word} on {word} with type {word}")]
async fn check_elements(world: &mut ScenarioWorld, step: &Step, event: String, id: String, resource: String, message_type: String) {
    let result = world
        .steps
        .verify_event_elements(&world.ctx, &event, &id, &resource, &message_type, &key_values(step))
        .await;
    world.record(result);
}

#[then(expr = "the check fails with differences at {string}")]
fn fails_with_differences(world: &mut ScenarioWorld, paths: String) {
    match world.take_error() {
        StepError::Mismatch(found) => {
            let expected: Vec<&str> = paths.split(", ").collect();
            assert_eq!(found.paths(), expected);
        }
        other => panic!("expected a document mismatch, got {other}"),
    }
}

#[then(expr = "the check fails on field {string}")]
fn fails_on_field(world: &mut ScenarioWorld, field: String) {
    match world.take_error() {
        StepError::FieldMismatch { path, .. } => assert_eq!(path, field),
        other => panic!("expected a field mismatch, got {other}"),
    }
}

#[then(expr = "the check fails because nothing arrived after {int} attempts")]
fn fails_with_correlation_miss(world: &mut ScenarioWorld, attempts: u32) {
    match world.take_error() {
        StepError::CorrelationMiss { attempts: made, .. } => assert_eq!(made, attempts),
        other => panic!("expected a correlation miss, got {other}"),
    }
}

#[then(expr = "remember field {string} as {word}")]
fn remember_field(world: &mut ScenarioWorld, path: String, key: String) {
    world
        .steps
        .remember_field(&mut world.ctx, &key, &path)
        .expect("field is present");
}

#[then(expr = "the context holds {word} = {string}")]
fn context_holds(world: &mut ScenarioWorld, key: String, value: String) {
    assert_eq!(world.ctx.get(&key), Some(value.as_str()));
}

#[then(expr = "the last attachment {string} mentions {string}")]
fn attachment_mentions(world: &mut ScenarioWorld, name: String, text: String) {
    let attachment = world
        .steps
        .attachments()
        .last(&name)
        .expect("attachment was recorded");
    assert!(attachment.body.contains(&text), "{} does not mention {}", attachment.body, text);
}
