//! Path addressing for JSON documents.
//!
//! Field-by-field verification, content predicates and the document builders
//! all address values with the same small path language:
//!
//! - `status` or `$.status` - top-level field
//! - `order.lines[0].sku` - nested fields and array indexes
//! - `[1].name` - index into a top-level array

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Most `null` slots [`FieldPath::set`] pads an array with to reach an index.
pub const MAX_INDEX_PADDING: usize = 1024;

/// A path that could not be parsed or applied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid path {path}: {reason}")]
pub struct InvalidPath {
    pub path: String,
    pub reason: String,
}

/// Represents a path to a value in a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// The raw path string
    pub raw: String,
    /// Parsed path segments
    pub segments: Vec<PathSegment>,
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named field (e.g., "order", "status")
    Field(String),
    /// An array index (e.g., [0], [5])
    Index(usize),
}

impl FieldPath {
    /// Parse a dotted path with optional `$` root and `[n]` indexes.
    ///
    /// # Example
    ///
    /// ```
    /// use msgscenario::extraction::{FieldPath, PathSegment};
    ///
    /// let path = FieldPath::parse("$.order.lines[0].sku").unwrap();
    /// assert_eq!(path.segments.len(), 4);
    /// assert_eq!(path.segments[2], PathSegment::Index(0));
    /// ```
    pub fn parse(path: &str) -> Result<Self, InvalidPath> {
        let invalid = |reason: &str| InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = path.trim();
        let body = trimmed
            .strip_prefix('$')
            .map(|rest| rest.strip_prefix('.').unwrap_or(rest))
            .unwrap_or(trimmed);

        let mut segments = Vec::new();
        for part in body.split('.') {
            if part.is_empty() {
                if body.is_empty() {
                    break;
                }
                return Err(invalid("empty segment"));
            }

            // Split "name[0][1]" into the name and its indexes
            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if !name.is_empty() {
                segments.push(PathSegment::Field(name.to_string()));
            }
            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| invalid("unclosed index"))?;
                let index = rest[1..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("index is not a number"))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected text after index"));
                }
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// True for `$` or the empty path, which address the whole document.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Select the value at this path.
    ///
    /// Returns `None` if any segment is absent or addresses the wrong kind of
    /// node.
    pub fn select<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |node, segment| match segment {
                PathSegment::Field(name) => node.as_object()?.get(name),
                PathSegment::Index(index) => node.as_array()?.get(*index),
            })
    }

    /// Write `value` at this path, creating objects and arrays on the way.
    ///
    /// Arrays are padded with `null` up to the addressed index, at most
    /// [`MAX_INDEX_PADDING`] slots past their current end.
    pub fn set(&self, document: &mut Value, value: Value) -> Result<(), InvalidPath> {
        let mut node = document;
        for segment in &self.segments {
            node = match segment {
                PathSegment::Field(name) => {
                    if node.is_null() {
                        *node = Value::Object(Map::new());
                    }
                    node.as_object_mut()
                        .ok_or_else(|| self.conflict(name))?
                        .entry(name.clone())
                        .or_insert(Value::Null)
                }
                PathSegment::Index(index) => {
                    if node.is_null() {
                        *node = Value::Array(Vec::new());
                    }
                    let items = node
                        .as_array_mut()
                        .ok_or_else(|| self.conflict(&format!("[{}]", index)))?;
                    if items.len() <= *index {
                        if *index - items.len() > MAX_INDEX_PADDING {
                            return Err(InvalidPath {
                                path: self.raw.clone(),
                                reason: format!("index {} is too far past the end of the array", index),
                            });
                        }
                        items.resize(*index + 1, Value::Null);
                    }
                    &mut items[*index]
                }
            };
        }
        *node = value;
        Ok(())
    }

    fn conflict(&self, segment: &str) -> InvalidPath {
        InvalidPath {
            path: self.raw.clone(),
            reason: format!("{} conflicts with an existing value", segment),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
