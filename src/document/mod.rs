//! Declarative step input to JSON documents.
//!
//! Used by the JSON message builder for key/value tables and by the verifier
//! to build expected documents from CSV-style rows.

pub mod mapson;
pub mod tabular;

pub use mapson::build_document;
pub use tabular::build_rows_document;
