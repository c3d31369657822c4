//! Structural JSON comparison.
//!
//! Object key order never matters. Two flags shape the rest:
//!
//! * extensible: actual objects may carry fields the expected object does
//!   not name
//! * strict order: arrays compare position by position instead of as
//!   multisets
//!
//! Every differing path is reported, not just the first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMode {
    /// Not extensible, strict array order
    Strict,
    /// Extensible, any array order
    #[default]
    Lenient,
    /// Not extensible, any array order
    NonExtensible,
    /// Extensible, strict array order
    StrictOrder,
}

impl CompareMode {
    pub fn from_flags(extensible: bool, strict_order: bool) -> Self {
        match (extensible, strict_order) {
            (false, true) => CompareMode::Strict,
            (true, false) => CompareMode::Lenient,
            (false, false) => CompareMode::NonExtensible,
            (true, true) => CompareMode::StrictOrder,
        }
    }

    pub fn is_extensible(self) -> bool {
        matches!(self, CompareMode::Lenient | CompareMode::StrictOrder)
    }

    pub fn has_strict_order(self) -> bool {
        matches!(self, CompareMode::Strict | CompareMode::StrictOrder)
    }
}

impl FromStr for CompareMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "strict" => Ok(CompareMode::Strict),
            "lenient" => Ok(CompareMode::Lenient),
            "non-extensible" => Ok(CompareMode::NonExtensible),
            "strict-order" => Ok(CompareMode::StrictOrder),
            other => Err(format!(
                "unknown compare mode '{}' (expected strict, lenient, non-extensible or strict-order)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MismatchKind {
    /// Same type, different value
    ValueMismatch,
    /// Expected field absent from actual
    Missing,
    /// Actual field the expected document does not name
    Unexpected,
    /// Different JSON types
    TypeMismatch,
    /// Arrays of different lengths
    LengthMismatch,
    /// Expected array element with no counterpart in actual
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub path: String,
    pub kind: MismatchKind,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<Value>| v.as_ref().map_or_else(|| "<absent>".to_string(), Value::to_string);
        write!(
            f,
            "{}: {:?} (expected {}, actual {})",
            self.path,
            self.kind,
            show(&self.expected),
            show(&self.actual)
        )
    }
}

/// All differences found between two documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mismatches(pub Vec<Mismatch>);

impl Mismatches {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mismatch> {
        self.0.iter()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.0.iter().map(|m| m.path.as_str()).collect()
    }
}

impl fmt::Display for Mismatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mismatch) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", mismatch)?;
        }
        Ok(())
    }
}

/// Compare `actual` against `expected`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use msgscenario::verify::{compare, CompareMode};
///
/// let err = compare(&json!({"a": 1}), &json!({"a": 2}), CompareMode::Lenient).unwrap_err();
/// assert_eq!(err.paths(), vec!["$.a"]);
/// ```
pub fn compare(expected: &Value, actual: &Value, mode: CompareMode) -> Result<(), Mismatches> {
    let mut found = Vec::new();
    compare_at("$", expected, actual, mode, &mut found);
    if found.is_empty() {
        Ok(())
    } else {
        Err(Mismatches(found))
    }
}

fn differs(expected: &Value, actual: &Value, mode: CompareMode) -> bool {
    let mut found = Vec::new();
    compare_at("$", expected, actual, mode, &mut found);
    !found.is_empty()
}

fn compare_at(path: &str, expected: &Value, actual: &Value, mode: CompareMode, found: &mut Vec<Mismatch>) {
    let mismatch = |kind| Mismatch {
        path: path.to_string(),
        kind,
        expected: Some(expected.clone()),
        actual: Some(actual.clone()),
    };

    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => compare_objects(path, e, a, mode, found),
        (Value::Array(e), Value::Array(a)) => {
            if mode.has_strict_order() {
                compare_ordered(path, e, a, mode, found)
            } else {
                compare_unordered(path, e, a, mode, found)
            }
        }
        (Value::Number(e), Value::Number(a)) => {
            let equal = match (e.as_i64(), a.as_i64()) {
                (Some(e), Some(a)) => e == a,
                _ => e.as_f64() == a.as_f64(),
            };
            if !equal {
                found.push(mismatch(MismatchKind::ValueMismatch));
            }
        }
        (Value::String(_), Value::String(_)) | (Value::Bool(_), Value::Bool(_)) => {
            if expected != actual {
                found.push(mismatch(MismatchKind::ValueMismatch));
            }
        }
        (Value::Null, Value::Null) => {}
        _ => found.push(mismatch(MismatchKind::TypeMismatch)),
    }
}

fn compare_objects(
    path: &str,
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
    mode: CompareMode,
    found: &mut Vec<Mismatch>,
) {
    for (key, e) in expected {
        let child = format!("{}.{}", path, key);
        match actual.get(key) {
            Some(a) => compare_at(&child, e, a, mode, found),
            None => found.push(Mismatch {
                path: child,
                kind: MismatchKind::Missing,
                expected: Some(e.clone()),
                actual: None,
            }),
        }
    }

    if !mode.is_extensible() {
        for (key, a) in actual {
            if !expected.contains_key(key) {
                found.push(Mismatch {
                    path: format!("{}.{}", path, key),
                    kind: MismatchKind::Unexpected,
                    expected: None,
                    actual: Some(a.clone()),
                });
            }
        }
    }
}

fn length_mismatch(path: &str, expected: &[Value], actual: &[Value]) -> Mismatch {
    Mismatch {
        path: path.to_string(),
        kind: MismatchKind::LengthMismatch,
        expected: Some(Value::from(expected.len())),
        actual: Some(Value::from(actual.len())),
    }
}

fn compare_ordered(path: &str, expected: &[Value], actual: &[Value], mode: CompareMode, found: &mut Vec<Mismatch>) {
    if expected.len() != actual.len() {
        found.push(length_mismatch(path, expected, actual));
    }
    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
        compare_at(&format!("{}[{}]", path, i), e, a, mode, found);
    }
}

fn compare_unordered(path: &str, expected: &[Value], actual: &[Value], mode: CompareMode, found: &mut Vec<Mismatch>) {
    if expected.len() != actual.len() {
        found.push(length_mismatch(path, expected, actual));
        return;
    }

    let mut used = vec![false; actual.len()];
    let mut pending = Vec::new();

    // Exact matches first so a loose match cannot steal another element's twin
    for (i, e) in expected.iter().enumerate() {
        match actual.iter().enumerate().position(|(j, a)| !used[j] && a == e) {
            Some(j) => used[j] = true,
            None => pending.push(i),
        }
    }

    for i in pending {
        let e = &expected[i];
        match (0..actual.len()).find(|&j| !used[j] && !differs(e, &actual[j], mode)) {
            Some(j) => used[j] = true,
            None => {
                // A lone leftover pair reports its inner differences
                let leftover: Vec<usize> = (0..actual.len()).filter(|&j| !used[j]).collect();
                if let [j] = leftover[..] {
                    used[j] = true;
                    compare_at(&format!("{}[{}]", path, i), e, &actual[j], mode, found);
                } else {
                    found.push(Mismatch {
                        path: format!("{}[{}]", path, i),
                        kind: MismatchKind::NoMatch,
                        expected: Some(e.clone()),
                        actual: None,
                    });
                }
            }
        }
    }
}
