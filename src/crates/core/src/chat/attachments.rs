//! Attachment resolution across provider analysis outputs.
//!
//! Providers return different artifacts for the same uploaded file: a
//! reusable file handle, a textual analysis, or a base64 echo. Each content
//! field is filled from the first provider in its preference list that
//! produced a non-empty output for that file index.

use multichat_core_types::{ContentItem, UploadResult};

/// Image caption sources.
pub const IMAGE_ANALYSIS_PROVIDERS: &[&str] = &["deepseek", "ollama"];
/// Provider-native file id sources.
pub const FILE_HANDLE_PROVIDERS: &[&str] = &["openai"];
/// Extracted document text sources.
pub const FILE_ANALYSIS_PROVIDERS: &[&str] = &["deepseek", "grok", "ollama"];
/// Base64 payload sources.
pub const FILE_BASE64_PROVIDERS: &[&str] = &["anthropic", "gemini", "perplexity"];

/// Split a comma-separated provider list, dropping blanks.
pub fn parse_provider_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|provider| !provider.is_empty())
        .map(str::to_string)
        .collect()
}

fn first_output(upload: &UploadResult, preferred: &[&str], index: usize) -> String {
    preferred
        .iter()
        .filter_map(|provider| upload.output_at(provider, index))
        .map(|output| output.output.as_str())
        .find(|output| !output.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Build one content item per uploaded file, in upload order.
///
/// The anchor provider (`requested_providers[0]`) defines the file set and
/// the image url. No anchor, or an anchor without outputs, yields no items.
pub fn resolve_attachments(upload: &UploadResult, requested_providers: &[String]) -> Vec<ContentItem> {
    let Some(anchor) = requested_providers.first() else {
        return Vec::new();
    };

    upload
        .outputs(anchor)
        .iter()
        .enumerate()
        .map(|(index, anchor_output)| {
            if anchor_output.is_image() {
                ContentItem::Image {
                    url: anchor_output.output.clone(),
                    analyzed_text: first_output(upload, IMAGE_ANALYSIS_PROVIDERS, index),
                }
            } else {
                ContentItem::File {
                    provider_file_handle: first_output(upload, FILE_HANDLE_PROVIDERS, index),
                    analyzed_text: first_output(upload, FILE_ANALYSIS_PROVIDERS, index),
                    base64: first_output(upload, FILE_BASE64_PROVIDERS, index),
                }
            }
        })
        .collect()
}
