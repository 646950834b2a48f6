use serde::{Deserialize, Serialize};

/// Reserved model id for the synthesis route.
pub const CONSENSUS_MODEL_ID: &str = "consensus";

/// One backend generation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub provider: String,
    pub model: String,
}

impl Route {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn is_consensus(&self) -> bool {
        self.model == CONSENSUS_MODEL_ID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    Multi,
    Consensus,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Multi => "multi",
            ChatMode::Consensus => "consensus",
        }
    }
}

/// Execution mode and outbound route list for one turn.
///
/// `routes` is `None` when no ordinary route was selected (consensus only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub mode: ChatMode,
    pub routes: Option<Vec<Route>>,
}

impl RoutePlan {
    pub fn routes(&self) -> &[Route] {
        self.routes.as_deref().unwrap_or(&[])
    }

    /// Number of distinct model completions that settle the turn.
    ///
    /// Streams are keyed by model id, so two providers serving the same
    /// model complete as one stream.
    pub fn expected_completions(&self) -> usize {
        let mut models: Vec<&str> = self.routes().iter().map(|route| route.model.as_str()).collect();
        models.sort_unstable();
        models.dedup();
        models.len()
    }

    pub fn contains_model(&self, model: &str) -> bool {
        self.routes().iter().any(|route| route.model == model)
    }
}
