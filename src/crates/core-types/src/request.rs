use crate::content::ContentItem;
use crate::route::{ChatMode, Route, RoutePlan};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: Vec<ContentItem>,
}

impl ChatMessage {
    pub fn user(content: Vec<ContentItem>) -> Self {
        Self {
            role: MessageRole::User,
            content,
        }
    }
}

/// Body of the chat streaming endpoint.
///
/// `routes` always serializes, as `null` when the plan has no ordinary route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub mode: ChatMode,
    pub routes: Option<Vec<Route>>,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub provider_response: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(plan: &RoutePlan, content: Vec<ContentItem>) -> Self {
        Self {
            mode: plan.mode,
            routes: plan.routes.clone(),
            messages: vec![ChatMessage::user(content)],
            stream: true,
            provider_response: false,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn plan(&self) -> RoutePlan {
        RoutePlan {
            mode: self.mode,
            routes: self.routes.clone(),
        }
    }
}
