//! Field-by-field verification.

use indexmap::IndexMap;
use serde_json::Value;

use crate::context::ScenarioContext;
use crate::error::StepError;
use crate::extraction::FieldPath;
use crate::resolve::{TypedLiteral, VariableResolver};

/// Check each `path -> literal` pair against `document`, in declared order.
///
/// Paths and literals are resolved against the context first. Stops at the
/// first field that does not match.
pub fn verify_fields(
    ctx: &ScenarioContext,
    resolver: &VariableResolver,
    document: &Value,
    fields: &IndexMap<String, String>,
) -> Result<(), StepError> {
    for (raw_path, raw_expected) in fields {
        let path = FieldPath::parse(&resolver.resolve(ctx, raw_path).value)?;
        let expected = TypedLiteral::decode(&resolver.resolve(ctx, raw_expected).value)?;
        let actual = path.select(document);

        if !actual.is_some_and(|value| expected.matches(value)) {
            return Err(StepError::FieldMismatch {
                path: path.to_string(),
                expected: format!("{} ({})", expected.to_json(), expected.type_name()),
                actual: actual.map_or_else(|| "<absent>".to_string(), Value::to_string),
            });
        }
        tracing::debug!("Field {} matched {}", path, expected);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn order() -> Value {
        json!({"id": 7, "status": "NEW", "paid": false, "lines": [{"sku": "A-1", "price": 2.5}]})
    }

    #[test]
    fn test_all_fields_match() {
        let mut ctx = ScenarioContext::empty();
        ctx.set("sku", "A-1");
        let result = verify_fields(
            &ctx,
            &VariableResolver::default(),
            &order(),
            &fields(&[
                ("id", "i~7"),
                ("$.status", "NEW"),
                ("paid", "b~false"),
                ("lines[0].sku", "[sku]"),
                ("lines[0].price", "d~2.5"),
            ]),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_no_string_number_coercion() {
        let err = verify_fields(
            &ScenarioContext::empty(),
            &VariableResolver::default(),
            &json!({"status": "1"}),
            &fields(&[("status", "i~1")]),
        )
        .unwrap_err();

        match err {
            StepError::FieldMismatch { path, expected, actual } => {
                assert_eq!(path, "status");
                assert_eq!(expected, "1 (int)");
                assert_eq!(actual, "\"1\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fail_fast_on_first_mismatch() {
        let err = verify_fields(
            &ScenarioContext::empty(),
            &VariableResolver::default(),
            &order(),
            &fields(&[("id", "i~7"), ("status", "PAID"), ("paid", "b~true")]),
        )
        .unwrap_err();

        assert!(err.is_test_failure());
        assert!(matches!(err, StepError::FieldMismatch { ref path, .. } if path == "status"));
    }

    #[test]
    fn test_absent_field() {
        let err = verify_fields(
            &ScenarioContext::empty(),
            &VariableResolver::default(),
            &order(),
            &fields(&[("customer.name", "x")]),
        )
        .unwrap_err();
        assert!(matches!(err, StepError::FieldMismatch { ref actual, .. } if actual == "<absent>"));
    }
}
