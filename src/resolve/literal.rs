//! Tagged scalar literals.
//!
//! Declarative test data carries typed expectations as `tag~value`
//! (`i~42`, `b~true`, `d~1.5`, `l~9000000000`, `f~0.5`). Anything without a
//! recognised tag is a plain string.

use std::fmt;
use std::str::FromStr;

use serde_json::{Number, Value};

use crate::error::LiteralError;

/// Separator between tag and value.
pub const TAG_SEPARATOR: char = '~';

/// A decoded literal used for typed equality checks.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedLiteral {
    Int(i64),
    Long(i64),
    Double(f64),
    Float(f32),
    Bool(bool),
    String(String),
}

impl TypedLiteral {
    /// Decode a tagged literal.
    ///
    /// Splits on the first `~`. An unknown or absent tag yields the whole
    /// input as a string; a known tag with an unparseable value is an error.
    ///
    /// # Example
    /// ```
    /// use msgscenario::resolve::TypedLiteral;
    ///
    /// assert_eq!(TypedLiteral::decode("i~42").unwrap(), TypedLiteral::Int(42));
    /// assert_eq!(TypedLiteral::decode("b~true").unwrap(), TypedLiteral::Bool(true));
    /// assert_eq!(TypedLiteral::decode("x~y").unwrap(), TypedLiteral::String("x~y".to_string()));
    /// ```
    pub fn decode(tagged: &str) -> Result<Self, LiteralError> {
        let Some((tag, value)) = tagged.split_once(TAG_SEPARATOR) else {
            return Ok(TypedLiteral::String(tagged.to_string()));
        };

        let invalid = |expected: &'static str| LiteralError::InvalidValue {
            input: tagged.to_string(),
            expected,
        };

        match tag {
            "i" => value.trim().parse().map(TypedLiteral::Int).map_err(|_| invalid("int")),
            "l" => value.trim().parse().map(TypedLiteral::Long).map_err(|_| invalid("long")),
            "d" => value.trim().parse().map(TypedLiteral::Double).map_err(|_| invalid("double")),
            "f" => value.trim().parse().map(TypedLiteral::Float).map_err(|_| invalid("float")),
            // Anything other than "true" reads as false
            "b" => Ok(TypedLiteral::Bool(value.trim().eq_ignore_ascii_case("true"))),
            _ => Ok(TypedLiteral::String(tagged.to_string())),
        }
    }

    /// Name of the literal's type, for failure messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedLiteral::Int(_) => "int",
            TypedLiteral::Long(_) => "long",
            TypedLiteral::Double(_) => "double",
            TypedLiteral::Float(_) => "float",
            TypedLiteral::Bool(_) => "bool",
            TypedLiteral::String(_) => "string",
        }
    }

    /// Convert to a JSON value for document construction.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            TypedLiteral::Int(n) | TypedLiteral::Long(n) => Value::from(*n),
            TypedLiteral::Double(d) => Number::from_f64(*d).map_or(Value::Null, Value::Number),
            // Go through the shortest decimal form so 0.1f32 stays 0.1
            TypedLiteral::Float(f) => f
                .to_string()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or(Value::Null, Value::Number),
            TypedLiteral::Bool(b) => Value::Bool(*b),
            TypedLiteral::String(s) => Value::String(s.clone()),
        }
    }

    /// Typed equality against a value extracted from a JSON document.
    ///
    /// Numbers never equal strings: `i~1` does not match `"1"`.
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            TypedLiteral::Int(n) | TypedLiteral::Long(n) => actual.as_i64() == Some(*n),
            TypedLiteral::Double(d) => actual.is_number() && actual.as_f64() == Some(*d),
            TypedLiteral::Float(f) => actual.is_number() && actual.as_f64().map(|a| a as f32) == Some(*f),
            TypedLiteral::Bool(b) => actual.as_bool() == Some(*b),
            TypedLiteral::String(s) => actual.as_str() == Some(s.as_str()),
        }
    }
}

impl FromStr for TypedLiteral {
    type Err = LiteralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for TypedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedLiteral::Int(n) | TypedLiteral::Long(n) => write!(f, "{} ({})", n, self.type_name()),
            TypedLiteral::Double(d) => write!(f, "{} (double)", d),
            TypedLiteral::Float(v) => write!(f, "{} (float)", v),
            TypedLiteral::Bool(b) => write!(f, "{} (bool)", b),
            TypedLiteral::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_all_tags() {
        assert_eq!(TypedLiteral::decode("i~42").unwrap(), TypedLiteral::Int(42));
        assert_eq!(TypedLiteral::decode("l~9000000000").unwrap(), TypedLiteral::Long(9_000_000_000));
        assert_eq!(TypedLiteral::decode("d~1.25").unwrap(), TypedLiteral::Double(1.25));
        assert_eq!(TypedLiteral::decode("f~0.5").unwrap(), TypedLiteral::Float(0.5));
        assert_eq!(TypedLiteral::decode("b~TRUE").unwrap(), TypedLiteral::Bool(true));
        assert_eq!(TypedLiteral::decode("b~nope").unwrap(), TypedLiteral::Bool(false));
    }

    #[test]
    fn test_decode_plain_and_unknown_tags() {
        assert_eq!(TypedLiteral::decode("plain").unwrap(), TypedLiteral::String("plain".to_string()));
        assert_eq!(TypedLiteral::decode("z~1").unwrap(), TypedLiteral::String("z~1".to_string()));
        assert_eq!(TypedLiteral::decode("").unwrap(), TypedLiteral::String(String::new()));
    }

    #[test]
    fn test_decode_splits_on_first_separator() {
        assert_eq!(
            TypedLiteral::decode("s~a~b").unwrap(),
            TypedLiteral::String("s~a~b".to_string())
        );
        assert!(TypedLiteral::decode("i~4~2").is_err());
    }

    #[test]
    fn test_decode_invalid_value() {
        let err = TypedLiteral::decode("i~forty").unwrap_err();
        assert_eq!(
            err,
            LiteralError::InvalidValue { input: "i~forty".to_string(), expected: "int" }
        );
    }

    #[test]
    fn test_typed_equality() {
        assert!(TypedLiteral::decode("i~42").unwrap().matches(&json!(42)));
        assert!(!TypedLiteral::decode("i~42").unwrap().matches(&json!("42")));
        assert!(TypedLiteral::decode("b~true").unwrap().matches(&json!(true)));
        assert!(TypedLiteral::decode("plain").unwrap().matches(&json!("plain")));
        assert!(TypedLiteral::decode("d~2.5").unwrap().matches(&json!(2.5)));
        assert!(TypedLiteral::decode("f~0.1").unwrap().matches(&json!(0.1)));
    }

    #[test]
    fn test_numeric_tag_does_not_coerce_strings() {
        let expected = TypedLiteral::decode("i~1").unwrap();
        assert!(!expected.matches(&json!("1")));
        assert!(expected.matches(&json!(1)));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(TypedLiteral::Int(7).to_json(), json!(7));
        assert_eq!(TypedLiteral::Float(0.1).to_json(), json!(0.1));
        assert_eq!(TypedLiteral::Double(f64::NAN).to_json(), Value::Null);
        assert_eq!(TypedLiteral::String("x".to_string()).to_json(), json!("x"));
    }
}
