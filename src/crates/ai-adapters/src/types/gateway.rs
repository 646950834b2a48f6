//! Payload shapes of the gateway's turn-lifecycle events.

use multichat_core_types::StreamEvent;
use serde::Deserialize;

pub const EVENT_RESPONSE_CREATED: &str = "chat.response.created";
pub const EVENT_RESPONSE_DELTA: &str = "chat.response.delta";
pub const EVENT_RESPONSE_COMPLETED: &str = "chat.response.completed";
pub const EVENT_CONSENSUS: &str = "consensus";

pub fn is_recognized_event(event_name: &str) -> bool {
    matches!(
        event_name,
        EVENT_RESPONSE_CREATED | EVENT_RESPONSE_DELTA | EVENT_RESPONSE_COMPLETED | EVENT_CONSENSUS
    )
}

/// Payload of `chat.response.created` and `chat.response.completed`.
#[derive(Debug, Deserialize)]
pub struct RouteLifecycle {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseDelta {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub delta: Option<DeltaBody>,
}

#[derive(Debug, Deserialize)]
pub struct DeltaBody {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConsensusOutput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl RouteLifecycle {
    pub fn into_created(self) -> Option<StreamEvent> {
        non_empty(self.model).map(|model| StreamEvent::Created { model })
    }

    pub fn into_completed(self) -> Option<StreamEvent> {
        non_empty(self.model).map(|model| StreamEvent::Completed { model })
    }
}

impl TryFrom<ResponseDelta> for StreamEvent {
    type Error = &'static str;

    fn try_from(value: ResponseDelta) -> Result<Self, Self::Error> {
        let model = non_empty(value.model).ok_or("delta without model")?;
        let text = non_empty(value.delta.and_then(|delta| delta.text)).ok_or("delta without text")?;
        Ok(StreamEvent::Delta { model, text })
    }
}

impl From<ConsensusOutput> for StreamEvent {
    fn from(value: ConsensusOutput) -> Self {
        StreamEvent::Consensus {
            text: non_empty(value.text)
                .or(value.content)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_requires_model_and_text() {
        let full: ResponseDelta =
            serde_json::from_str(r#"{"model":"gpt-5","delta":{"text":"hi"}}"#).unwrap();
        assert_eq!(
            StreamEvent::try_from(full),
            Ok(StreamEvent::Delta {
                model: "gpt-5".to_string(),
                text: "hi".to_string()
            })
        );

        let empty_text: ResponseDelta =
            serde_json::from_str(r#"{"model":"gpt-5","delta":{"text":""}}"#).unwrap();
        assert!(StreamEvent::try_from(empty_text).is_err());

        let no_model: ResponseDelta = serde_json::from_str(r#"{"delta":{"text":"hi"}}"#).unwrap();
        assert!(StreamEvent::try_from(no_model).is_err());
    }

    #[test]
    fn consensus_falls_back_to_content_field() {
        let output: ConsensusOutput = serde_json::from_str(r#"{"content":"merged"}"#).unwrap();
        assert_eq!(
            StreamEvent::from(output),
            StreamEvent::Consensus {
                text: "merged".to_string()
            }
        );
    }

    #[test]
    fn recognizes_exactly_four_event_names() {
        assert!(is_recognized_event("chat.response.created"));
        assert!(is_recognized_event("consensus"));
        assert!(!is_recognized_event("message"));
        assert!(!is_recognized_event("chat.response.usage"));
    }
}
