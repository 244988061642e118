//! The `ContentBlock` discriminated union: a tagged union over
//! `{text, image, audio, resource, embedded_resource}`.

use serde::{Deserialize, Serialize};

/// A resource reference or inline blob embedded in a content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddedResourceContents {
    Text { uri: String, text: String, #[serde(skip_serializing_if = "Option::is_none")] mime_type: Option<String> },
    Blob { uri: String, blob: String, #[serde(skip_serializing_if = "Option::is_none")] mime_type: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContentBlock {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContentBlock {
    pub data: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioContentBlock {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContentBlock {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedResourceContentBlock {
    pub resource: EmbeddedResourceContents,
}

/// Every block of content an agent or client can exchange inline in a
/// prompt, message chunk, or tool-call content entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextContentBlock),
    Image(ImageContentBlock),
    Audio(AudioContentBlock),
    Resource(ResourceContentBlock),
    EmbeddedResource(EmbeddedResourceContentBlock),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(TextContentBlock { text: text.into(), annotations: None })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(block) => Some(&block.text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_block_round_trips_with_tagged_discriminator() {
        let block = ContentBlock::text("hi");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hi");
        let back: ContentBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_text(), Some("hi"));
    }

    #[test]
    fn unknown_discriminator_fails_to_parse() {
        let value = serde_json::json!({"type": "carrier_pigeon"});
        let result: Result<ContentBlock, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }
}
