//! Finding expected messages in receive buffers.

pub mod correlator;
pub mod policy;
pub mod predicate;

pub use correlator::{Correlation, Correlator};
pub use policy::{Escalating, FixedInterval, Immediate, RetryPolicy};
pub use predicate::ContentPredicate;
