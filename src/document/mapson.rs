//! Key/value maps to JSON documents.
//!
//! Each key is a [`FieldPath`] and each value a tagged literal, so a step
//! table like
//!
//! ```text
//! | id                | i~7     |
//! | status            | NEW     |
//! | lines[0].sku      | A-1     |
//! | lines[0].quantity | i~2     |
//! ```
//!
//! builds `{"id":7,"status":"NEW","lines":[{"sku":"A-1","quantity":2}]}`.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::BuildError;
use crate::extraction::{FieldPath, InvalidPath};
use crate::resolve::TypedLiteral;

/// Build a document from path/literal pairs, in declared order.
///
/// An empty map builds an empty object.
pub fn build_document(entries: &IndexMap<String, String>) -> Result<Value, BuildError> {
    let mut document = Value::Null;

    for (raw_path, literal) in entries {
        let path = FieldPath::parse(raw_path)?;
        if path.is_root() {
            return Err(BuildError::Path(InvalidPath {
                path: raw_path.clone(),
                reason: "does not name a field".to_string(),
            }));
        }
        let value = TypedLiteral::decode(literal)?.to_json();
        path.set(&mut document, value)?;
    }

    if document.is_null() {
        document = Value::Object(Map::new());
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_flat_document() {
        let doc = build_document(&entries(&[("id", "i~7"), ("status", "NEW"), ("paid", "b~false")])).unwrap();
        assert_eq!(doc, json!({"id": 7, "status": "NEW", "paid": false}));
    }

    #[test]
    fn test_nested_document() {
        let doc = build_document(&entries(&[
            ("order.id", "l~10"),
            ("order.lines[0].sku", "A-1"),
            ("order.lines[0].price", "d~2.5"),
        ]))
        .unwrap();
        assert_eq!(doc, json!({"order": {"id": 10, "lines": [{"sku": "A-1", "price": 2.5}]}}));
    }

    #[test]
    fn test_preserves_declared_order() {
        let doc = build_document(&entries(&[("z", "1"), ("a", "2")])).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"z":"1","a":"2"}"#);
    }

    #[test]
    fn test_empty_map_is_empty_object() {
        assert_eq!(build_document(&IndexMap::new()).unwrap(), json!({}));
    }

    #[test]
    fn test_invalid_literal() {
        let err = build_document(&entries(&[("id", "i~x")])).unwrap_err();
        assert!(matches!(err, BuildError::Literal(_)));
    }

    #[test]
    fn test_root_path_rejected() {
        let err = build_document(&entries(&[("$", "x")])).unwrap_err();
        assert!(matches!(err, BuildError::Path(_)));
    }

    #[test]
    fn test_oversized_index_rejected() {
        let err = build_document(&entries(&[("lines[18446744073709551615].sku", "A-1")])).unwrap_err();
        assert!(matches!(err, BuildError::Path(ref invalid) if invalid.path == "lines[18446744073709551615].sku"));
    }
}
