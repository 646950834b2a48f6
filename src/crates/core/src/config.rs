//! Client configuration

use crate::logging::parse_log_level;
use crate::util::errors::{MultichatError, MultichatResult};
use multichat_ai_adapters::GatewayClientOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatClientConfig {
    pub base_url: String,
    pub chat_path: String,
    pub upload_path: String,
    pub api_key: Option<String>,
    pub stream: bool,
    /// Ask the gateway to include raw provider responses.
    pub provider_response: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Maximum wait for the next chunk of the chat stream.
    pub idle_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub log_level: Option<String>,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            chat_path: "/v1/chat/completions".to_string(),
            upload_path: "/v1/files/upload".to_string(),
            api_key: None,
            stream: true,
            provider_response: false,
            temperature: None,
            max_tokens: None,
            idle_timeout_secs: 600,
            connect_timeout_secs: 30,
            log_level: None,
        }
    }
}

impl ChatClientConfig {
    pub fn from_toml_str(raw: &str) -> MultichatResult<Self> {
        let config: ChatClientConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MultichatResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(MultichatError::config("baseUrl must not be empty"));
        }
        if self.idle_timeout_secs == 0 {
            return Err(MultichatError::config("idleTimeoutSecs must be greater than 0"));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(MultichatError::config(format!(
                    "temperature must be within 0.0..=2.0, got {}",
                    temperature
                )));
            }
        }
        if let Some(level) = self.log_level.as_deref() {
            if parse_log_level(level).is_none() {
                return Err(MultichatError::config(format!("Unknown logLevel '{}'", level)));
            }
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn gateway_options(&self) -> GatewayClientOptions {
        GatewayClientOptions {
            base_url: self.base_url.clone(),
            chat_path: self.chat_path.clone(),
            upload_path: self.upload_path.clone(),
            api_key: self.api_key.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}
