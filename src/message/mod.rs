//! Message envelopes and the builders that produce them.

pub mod builder;
pub mod envelope;
pub mod registry;

pub use builder::{document_id, BuildContext, JsonBuilder, MessageBuilder, RawInput, TextBuilder};
pub use envelope::{Envelope, Header};
pub use registry::BuilderRegistry;
