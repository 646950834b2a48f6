use serde::{Deserialize, Serialize};

/// Normalized turn-lifecycle event decoded from the gateway stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A route has begun producing output.
    Created { model: String },
    /// Incremental text for one route.
    Delta { model: String, text: String },
    /// A route has finished.
    Completed { model: String },
    /// The synthesis route's single, final output. Settles the turn.
    Consensus { text: String },
}

impl StreamEvent {
    /// Model the event is addressed to, if any.
    pub fn model(&self) -> Option<&str> {
        match self {
            StreamEvent::Created { model }
            | StreamEvent::Delta { model, .. }
            | StreamEvent::Completed { model } => Some(model),
            StreamEvent::Consensus { .. } => None,
        }
    }
}
