//! HTTP client for the chat gateway
//!
//! One `reqwest::Client` serves both the streaming chat endpoint and the
//! multipart upload endpoint.

use anyhow::{anyhow, Context, Result};
use log::{debug, error};
use multichat_core_types::{ChatRequest, UploadResult};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

const EVENT_STREAM_MIME_TYPE: &str = "text/event-stream";
const ERROR_BODY_EXCERPT_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct GatewayClientOptions {
    pub base_url: String,
    pub chat_path: String,
    pub upload_path: String,
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
}

/// A file selected by the user, uploaded before the chat request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    options: GatewayClientOptions,
}

impl GatewayClient {
    pub fn new(options: GatewayClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .context("Failed to build gateway HTTP client")?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &GatewayClientOptions {
        &self.options
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.options.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.options.api_key.as_deref() {
            Some(api_key) if !api_key.is_empty() => builder.bearer_auth(api_key),
            _ => builder,
        }
    }

    /// POST the chat request and return the response whose body is the
    /// multiplexed event stream. Non-2xx statuses are errors.
    pub async fn open_chat_stream(&self, request: &ChatRequest) -> Result<Response> {
        let url = self.endpoint(&self.options.chat_path);
        debug!(
            "Opening chat stream: url={}, mode={}, routes={}",
            url,
            request.mode.as_str(),
            request.routes.as_ref().map(Vec::len).unwrap_or(0)
        );

        let builder = self
            .client
            .post(&url)
            .header(ACCEPT, EVENT_STREAM_MIME_TYPE)
            .json(request);
        let response = self
            .authorize(builder)
            .send()
            .await
            .with_context(|| format!("Chat request to {} failed", url))?;

        ensure_success(response, "Chat request").await
    }

    /// Upload files to every requested provider and return the
    /// index-aligned per-provider outputs.
    pub async fn upload_files(
        &self,
        files: Vec<UploadFile>,
        providers: &[String],
    ) -> Result<UploadResult> {
        let url = self.endpoint(&self.options.upload_path);
        debug!(
            "Uploading {} file(s) to {} for providers [{}]",
            files.len(),
            url,
            providers.join(",")
        );

        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes)
                .file_name(file.filename.clone())
                .mime_str(&file.mime_type)
                .with_context(|| {
                    format!("Invalid MIME type '{}' for {}", file.mime_type, file.filename)
                })?;
            form = form.part("files", part);
        }
        form = form.text("providers", providers.join(","));

        let builder = self.client.post(&url).multipart(form);
        let response = self
            .authorize(builder)
            .send()
            .await
            .with_context(|| format!("Upload request to {} failed", url))?;
        let response = ensure_success(response, "Upload request").await?;

        let body = response
            .text()
            .await
            .context("Failed to read upload response body")?;
        serde_json::from_str::<UploadResult>(&body).map_err(|e| {
            anyhow!(
                "Upload response is not a provider map: {}, body: {}",
                e,
                excerpt(&body)
            )
        })
    }
}

async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            debug!("{} accepted: status={}, content-type={:?}", what, status, content_type);
        }
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error_msg = format!("{} failed with status {}: {}", what, status, excerpt(&body));
    error!("{}", error_msg);
    Err(anyhow!(error_msg))
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_EXCERPT_CHARS {
        return body.to_string();
    }
    let mut short: String = body.chars().take(ERROR_BODY_EXCERPT_CHARS).collect();
    short.push_str("...");
    short
}
