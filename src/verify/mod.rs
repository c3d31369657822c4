//! Checking received documents against expectations.

pub mod compare;
pub mod fields;

pub use compare::{compare, CompareMode, Mismatch, MismatchKind, Mismatches};
pub use fields::verify_fields;

use serde_json::Value;

use crate::context::ScenarioContext;
use crate::document::build_rows_document;
use crate::error::StepError;
use crate::resolve::VariableResolver;

/// Build the expected rows from CSV-style lines resolved against the context.
pub fn expected_rows(ctx: &ScenarioContext, resolver: &VariableResolver, lines: &[String]) -> Result<Value, StepError> {
    let resolved: Vec<String> = lines
        .iter()
        .map(|line| resolver.resolve(ctx, line).value)
        .collect();
    Ok(build_rows_document(&resolved)?)
}

/// The part of `rows` to compare with `actual`: the first row for a single
/// document, all rows for an array.
pub fn expected_for(rows: &Value, actual: &Value) -> Value {
    match (rows, actual) {
        (Value::Array(rows), Value::Object(_)) => rows
            .first()
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        _ => rows.clone(),
    }
}

/// Compare a received document with the expected rows.
pub fn verify_document(rows: &Value, actual: &Value, mode: CompareMode) -> Result<(), StepError> {
    compare(&expected_for(rows, actual), actual, mode).map_err(StepError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_object_compares_with_first_row() {
        let mut ctx = ScenarioContext::empty();
        ctx.set("order_id", "7");
        let rows = expected_rows(&ctx, &VariableResolver::default(), &lines(&["id,status", "i~[order_id],NEW"])).unwrap();

        assert!(verify_document(&rows, &json!({"status": "NEW", "id": 7, "extra": 1}), CompareMode::Lenient).is_ok());
    }

    #[test]
    fn test_array_compares_with_all_rows() {
        let rows = expected_rows(
            &ScenarioContext::empty(),
            &VariableResolver::default(),
            &lines(&["id", "i~1", "i~2"]),
        )
        .unwrap();

        assert!(verify_document(&rows, &json!([{"id": 2}, {"id": 1}]), CompareMode::Lenient).is_ok());
        let err = verify_document(&rows, &json!([{"id": 1}]), CompareMode::Lenient).unwrap_err();
        assert!(err.is_test_failure());
    }

    #[test]
    fn test_mismatch_lists_paths() {
        let rows = json!([{"status": "NEW", "total": 10}]);
        let err = verify_document(&rows, &json!({"status": "PAID", "total": 11}), CompareMode::Lenient).unwrap_err();

        match err {
            StepError::Mismatch(found) => assert_eq!(found.paths(), vec!["$.status", "$.total"]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
