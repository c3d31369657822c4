//! Documents recorded for the scenario report.

use serde::Serialize;
use serde_json::Value;

pub const EXPECTED_RESPONSE: &str = "ExpectedResponse:";
pub const ACTUAL_RESPONSE: &str = "ActualResponse:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub name: String,
    pub media_type: String,
    pub body: String,
}

impl Attachment {
    /// Pretty-printed JSON attachment.
    pub fn json(name: impl Into<String>, document: &Value) -> Self {
        Self {
            name: name.into(),
            media_type: "application/json".to_string(),
            body: serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string()),
        }
    }

    pub fn text(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: "text/plain".to_string(),
            body: body.into(),
        }
    }
}

/// Attachments in the order they were recorded.
#[derive(Debug, Clone, Default)]
pub struct AttachmentLog {
    entries: Vec<Attachment>,
}

impl AttachmentLog {
    pub fn record(&mut self, attachment: Attachment) {
        tracing::debug!("Attached {} ({})", attachment.name, attachment.media_type);
        self.entries.push(attachment);
    }

    pub fn entries(&self) -> &[Attachment] {
        &self.entries
    }

    /// Most recent attachment with the given name.
    pub fn last(&self, name: &str) -> Option<&Attachment> {
        self.entries.iter().rev().find(|a| a.name == name)
    }

    pub fn take(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.entries)
    }
}
