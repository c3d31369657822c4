//! Variable resolution and typed literals.
//!
//! Step arguments, payload lines and expected values all pass through the
//! [`VariableResolver`] before use; expected field values are then decoded as
//! [`TypedLiteral`]s for typed comparison.

pub mod resolver;
pub mod literal;

pub use resolver::{Diagnostic, Resolution, ResolverConfig, VariableResolver};
pub use literal::TypedLiteral;
