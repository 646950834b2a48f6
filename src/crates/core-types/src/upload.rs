use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One provider's analysis artifact for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderFileOutput {
    /// MIME type of the uploaded file (e.g. `image/png`, `application/pdf`).
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub filename: String,
    /// Provider-specific artifact: url, file id, extracted text or base64.
    #[serde(default)]
    pub output: String,
}

impl ProviderFileOutput {
    pub fn is_image(&self) -> bool {
        self.mime_type.contains("image")
    }
}

/// Upload endpoint response.
///
/// Arrays are index-aligned across providers: index `i` in every provider's
/// array refers to the same uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub providers: HashMap<String, Vec<ProviderFileOutput>>,
}

impl UploadResult {
    pub fn outputs(&self, provider: &str) -> &[ProviderFileOutput] {
        self.providers
            .get(provider)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn output_at(&self, provider: &str, index: usize) -> Option<&ProviderFileOutput> {
        self.outputs(provider).get(index)
    }
}
