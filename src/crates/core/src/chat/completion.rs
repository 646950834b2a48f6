//! Turn-scoped completion tracking.
//!
//! `Idle -> Streaming -> Settled`, with `Errored` and `Cancelled` as the
//! other terminal phases. One tracker belongs to exactly one turn.

use multichat_core_types::RoutePlan;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Streaming,
    Settled,
    Errored,
    Cancelled,
}

impl TurnPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnPhase::Settled | TurnPhase::Errored | TurnPhase::Cancelled
        )
    }
}

#[derive(Debug, Clone)]
pub struct TurnCompletionTracker {
    phase: TurnPhase,
    expected: usize,
    completed: HashSet<String>,
    error: Option<String>,
}

impl TurnCompletionTracker {
    pub fn new(plan: &RoutePlan) -> Self {
        Self {
            phase: TurnPhase::Idle,
            expected: plan.expected_completions(),
            completed: HashSet::new(),
            error: None,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == TurnPhase::Streaming
    }

    pub fn is_settled(&self) -> bool {
        self.phase == TurnPhase::Settled
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn expected_count(&self) -> usize {
        self.expected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `Idle -> Streaming`. No-op in any other phase.
    pub fn begin_streaming(&mut self) {
        if self.phase == TurnPhase::Idle {
            self.phase = TurnPhase::Streaming;
        }
    }

    /// Records one route completion; repeated completions of the same model
    /// count once. Returns `true` when this call settled the turn.
    pub fn record_completed(&mut self, model: &str) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.begin_streaming();

        if !self.completed.insert(model.to_string()) {
            return false;
        }

        if self.completed.len() >= self.expected {
            self.phase = TurnPhase::Settled;
            return true;
        }
        false
    }

    /// Settles the turn regardless of how many routes completed.
    pub fn record_consensus(&mut self) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = TurnPhase::Settled;
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = TurnPhase::Errored;
        self.error = Some(reason.into());
        true
    }

    pub fn cancel(&mut self) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = TurnPhase::Cancelled;
        true
    }
}
