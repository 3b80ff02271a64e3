//! Response shapes exchanged with the remote facade
//!
//! A transport hands back an [`Envelope`]; the session classifies it into a
//! [`Payload`] or a remote error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter bag for a single operation
pub type Params = Map<String, Value>;

/// Decoded result of a successful remote call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "lowercase")]
pub enum Payload {
    /// The remote returned structured data, or text that parsed as JSON
    Structured(Value),
    /// The remote returned text that is not JSON
    Raw(String),
}

impl Payload {
    /// Classify a text body: JSON when it parses, raw text otherwise
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => Payload::Structured(value),
            Err(_) => Payload::Raw(text.to_string()),
        }
    }

    /// Structured value, if any
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Payload::Structured(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    /// Raw text, if any
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Structured(_) => None,
            Payload::Raw(text) => Some(text),
        }
    }

    /// Render for display: pretty JSON for structured data, verbatim text otherwise
    pub fn render(&self) -> String {
        match self {
            Payload::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Payload::Raw(text) => text.clone(),
        }
    }
}

/// One content block inside an envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Json { value: Value },
}

/// Transport-level response: either a success or an error, with content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    pub is_error: bool,
    pub content: Vec<ContentBlock>,
}

impl Envelope {
    /// Success envelope carrying a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Success envelope carrying a single structured block
    pub fn json(value: Value) -> Self {
        Self {
            is_error: false,
            content: vec![ContentBlock::Json { value }],
        }
    }

    /// Error envelope carrying the server-supplied message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
        }
    }

    /// Concatenated text of all blocks (structured blocks are serialized)
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.clone(),
                ContentBlock::Json { value } => value.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Unwrap a success envelope into a payload
    ///
    /// A lone structured block is returned as is; text is parsed
    /// opportunistically.
    pub fn into_payload(self) -> Payload {
        if let [ContentBlock::Json { value }] = self.content.as_slice() {
            return Payload::Structured(value.clone());
        }
        Payload::from_text(&self.joined_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_text_parses_json() {
        let payload = Payload::from_text(r#"{"messages": [1, 2]}"#);
        assert_eq!(payload, Payload::Structured(json!({"messages": [1, 2]})));
    }

    #[test]
    fn test_from_text_falls_back_to_raw() {
        let payload = Payload::from_text("Found 3 messages:\n- a\n- b");
        assert_eq!(payload.as_raw(), Some("Found 3 messages:\n- a\n- b"));
        assert!(payload.as_structured().is_none());
    }

    #[test]
    fn test_empty_text_stays_raw() {
        assert_eq!(Payload::from_text(""), Payload::Raw(String::new()));
        assert_eq!(Payload::from_text("  \n"), Payload::Raw("  \n".into()));
        assert_eq!(Envelope::default().into_payload(), Payload::Raw(String::new()));
    }

    #[test]
    fn test_envelope_single_json_block() {
        let envelope = Envelope::json(json!({"id": "evt1"}));
        assert_eq!(
            envelope.into_payload(),
            Payload::Structured(json!({"id": "evt1"}))
        );
    }

    #[test]
    fn test_envelope_multiple_text_blocks() {
        let envelope = Envelope {
            is_error: false,
            content: vec![
                ContentBlock::Text {
                    text: "line one".into(),
                },
                ContentBlock::Text {
                    text: "line two".into(),
                },
            ],
        };
        assert_eq!(envelope.joined_text(), "line one\nline two");
        assert_eq!(envelope.into_payload(), Payload::Raw("line one\nline two".into()));
    }

    #[test]
    fn test_render() {
        let structured = Payload::Structured(json!({"a": 1}));
        assert!(structured.render().contains("\"a\": 1"));
        assert_eq!(Payload::Raw("plain".into()).render(), "plain");
    }
}
