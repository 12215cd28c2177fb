use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scheme marker for content that points at the server's local filesystem.
pub const LOCAL_FILE_SCHEME: &str = "file:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A single content item returned by a tool, e.g. `{"type": "text", "text": "..."}`
///
/// Only the fields the agent inspects are typed; everything else the server sends
/// (image data, mime types, annotations) is carried through untouched.
pub struct Content {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Where the item originated, if the server reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content {
            kind: "text".to_string(),
            text: Some(text.into()),
            uri: None,
            extra: Map::new(),
        }
    }

    pub fn with_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Get the text content if this is a text item
    pub fn as_text(&self) -> Option<&str> {
        match self.kind.as_str() {
            "text" => self.text.as_deref(),
            _ => None,
        }
    }

    /// True when the origin locator refers to the server's local filesystem
    pub fn is_local_file(&self) -> bool {
        self.uri
            .as_deref()
            .is_some_and(|uri| uri.starts_with(LOCAL_FILE_SCHEME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let raw = json!({
            "type": "image",
            "data": "aGVsbG8=",
            "mimeType": "image/png"
        });
        let content: Content = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(content.kind, "image");
        assert_eq!(content.as_text(), None);
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn test_untyped_item_does_not_reject_siblings() {
        let items: Vec<Content> = serde_json::from_value(json!([
            {"text": "no type here"},
            {"type": "text", "text": "frame"}
        ]))
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, "");
        assert_eq!(items[0].as_text(), None);
        assert_eq!(items[1].as_text(), Some("frame"));
    }

    #[test]
    fn test_is_local_file() {
        assert!(Content::text("x").with_uri("file:///tmp/a.png").is_local_file());
        assert!(!Content::text("x").with_uri("https://figma.com/a.png").is_local_file());
        assert!(!Content::text("x").is_local_file());
    }
}
