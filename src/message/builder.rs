//! Message builder contract and built-in builders.
//!
//! A builder turns whatever shape a step supplied (text lines, table rows, a
//! key/value table or a payload file) into an [`Envelope`]. Bracket references
//! in the input are resolved against the scenario context first.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::context::ScenarioContext;
use crate::document::build_document;
use crate::error::BuildError;
use crate::message::envelope::Envelope;
use crate::resolve::{Diagnostic, VariableResolver};

/// Raw step input.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    /// Text lines, e.g. an inline document split across step lines
    Lines(Vec<String>),
    /// Table rows, each mapping field path -> value
    Rows(Vec<IndexMap<String, String>>),
    /// A two-column key/value table
    Map(IndexMap<String, String>),
    /// A payload file on disk
    File(PathBuf),
}

impl RawInput {
    /// Name of the input shape for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            RawInput::Lines(_) => "text lines",
            RawInput::Rows(_) => "table rows",
            RawInput::Map(_) => "key/value map",
            RawInput::File(_) => "payload file",
        }
    }

    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawInput::Lines(lines.into_iter().map(Into::into).collect())
    }
}

/// Scenario context and resolver handed to builders.
pub struct BuildContext<'a> {
    ctx: &'a ScenarioContext,
    resolver: &'a VariableResolver,
    diagnostics: std::cell::RefCell<Vec<Diagnostic>>,
}

impl<'a> BuildContext<'a> {
    pub fn new(ctx: &'a ScenarioContext, resolver: &'a VariableResolver) -> Self {
        Self {
            ctx,
            resolver,
            diagnostics: std::cell::RefCell::new(Vec::new()),
        }
    }

    /// Resolve references in `raw`, keeping any diagnostics.
    pub fn resolve(&self, raw: &str) -> String {
        let resolution = self.resolver.resolve(self.ctx, raw);
        self.diagnostics.borrow_mut().extend(resolution.diagnostics);
        resolution.value
    }

    /// Resolve both keys and values of a map.
    pub fn resolve_map(&self, map: &IndexMap<String, String>) -> IndexMap<String, String> {
        map.iter()
            .map(|(k, v)| (self.resolve(k), self.resolve(v)))
            .collect()
    }

    /// Diagnostics gathered so far.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}

/// Converts raw step input into an envelope.
///
/// Implementations are registered by name in a
/// [`BuilderRegistry`](crate::message::BuilderRegistry) at startup and picked
/// by the `type` a step names.
pub trait MessageBuilder: Send + Sync {
    /// Type name steps use to select this builder (e.g., "JSON").
    fn name(&self) -> &str;

    /// Build an envelope from raw input.
    ///
    /// # Returns
    /// * `Ok(envelope)` - payload populated, key set when the input carries one
    /// * `Err(BuildError)` - the input cannot be normalized
    fn build(&self, cx: &BuildContext<'_>, input: &RawInput) -> Result<Envelope, BuildError>;
}

impl fmt::Debug for dyn MessageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageBuilder({})", self.name())
    }
}

fn read_payload(path: &PathBuf) -> Result<String, BuildError> {
    fs::read_to_string(path).map_err(|source| BuildError::Io {
        path: path.clone(),
        source,
    })
}

/// Standard headers every built-in builder adds.
fn with_standard_headers(envelope: Envelope) -> Envelope {
    let message_type = envelope.message_type().to_string();
    envelope
        .with_header("message-type", message_type)
        .with_header("trace-id", Uuid::new_v4().to_string())
}

/// JSON documents.
///
/// Lines are concatenated into one document; maps and rows are built through
/// path/literal tables. The key comes from a top-level `id` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBuilder;

impl JsonBuilder {
    pub const NAME: &'static str = "JSON";

    fn parse(text: &str) -> Result<Value, BuildError> {
        serde_json::from_str(text).map_err(|e| BuildError::Malformed {
            builder: Self::NAME.to_string(),
            reason: e.to_string(),
            input: text.to_string(),
        })
    }
}

/// Conventional identifier field of a document, rendered as text.
pub fn document_id(document: &Value) -> Option<String> {
    match document.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl MessageBuilder for JsonBuilder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn build(&self, cx: &BuildContext<'_>, input: &RawInput) -> Result<Envelope, BuildError> {
        let document = match input {
            RawInput::Lines(lines) => Self::parse(&cx.resolve(&lines.concat()))?,
            RawInput::File(path) => Self::parse(&cx.resolve(&read_payload(path)?))?,
            RawInput::Map(map) => build_document(&cx.resolve_map(map))?,
            RawInput::Rows(rows) => {
                let mut documents = rows
                    .iter()
                    .map(|row| build_document(&cx.resolve_map(row)))
                    .collect::<Result<Vec<_>, _>>()?;
                if documents.len() == 1 {
                    documents.remove(0)
                } else {
                    Value::Array(documents)
                }
            }
        };

        let payload = serde_json::to_string(&document).map_err(|e| BuildError::Malformed {
            builder: Self::NAME.to_string(),
            reason: e.to_string(),
            input: document.to_string(),
        })?;

        Ok(with_standard_headers(Envelope::new(
            Self::NAME,
            document_id(&document),
            payload,
        )))
    }
}

/// Free text. Lines are joined with newlines; no key.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextBuilder;

impl TextBuilder {
    pub const NAME: &'static str = "TEXT";
}

impl MessageBuilder for TextBuilder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn build(&self, cx: &BuildContext<'_>, input: &RawInput) -> Result<Envelope, BuildError> {
        let text = match input {
            RawInput::Lines(lines) => cx.resolve(&lines.join("\n")),
            RawInput::File(path) => cx.resolve(&read_payload(path)?),
            other => {
                return Err(BuildError::UnsupportedInput {
                    builder: Self::NAME.to_string(),
                    shape: other.shape(),
                })
            }
        };

        Ok(with_standard_headers(Envelope::new(Self::NAME, None, text)))
    }
}
