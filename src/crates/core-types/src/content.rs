use serde::{Deserialize, Serialize};

/// One item of a user message.
///
/// A message carries one `Text` item followed by zero or more `Image`/`File`
/// items derived from uploads. Items are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default)]
        analyzed_text: String,
    },
    File {
        /// Reusable file id issued by the provider that stores uploads.
        #[serde(default)]
        provider_file_handle: String,
        #[serde(default)]
        analyzed_text: String,
        #[serde(default)]
        base64: String,
    },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn is_attachment(&self) -> bool {
        !matches!(self, ContentItem::Text { .. })
    }
}
