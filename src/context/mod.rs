//! Run-scoped context store.

pub mod store;
pub mod registry;

pub use store::{ScenarioContext, MASK};
pub use registry::{ContextRegistry, WorkerId};
