//! Cucumber runner for the message step handlers.
//!
//! Every scenario gets its own in-memory broker and scenario context, so the
//! features run without a live broker.

mod steps;
mod world;

use cucumber::World;
use world::ScenarioWorld;

#[tokio::main]
async fn main() {
    ScenarioWorld::run("tests/features").await;
}
