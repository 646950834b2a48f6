//! Synchronous notification of turn mutations.

use super::turn::Turn;
use multichat_core_types::{ChatMode, Route};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TurnEvent {
    #[serde(rename_all = "camelCase")]
    Started {
        turn_id: String,
        mode: ChatMode,
        routes: Vec<Route>,
    },
    #[serde(rename_all = "camelCase")]
    RouteCreated { turn_id: String, model: String },
    #[serde(rename_all = "camelCase")]
    DeltaApplied {
        turn_id: String,
        model: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    RouteCompleted { turn_id: String, model: String },
    #[serde(rename_all = "camelCase")]
    ConsensusReceived { turn_id: String, text: String },
    #[serde(rename_all = "camelCase")]
    Settled { turn_id: String },
    #[serde(rename_all = "camelCase")]
    Failed { turn_id: String, reason: String },
    #[serde(rename_all = "camelCase")]
    Cancelled { turn_id: String },
}

impl TurnEvent {
    pub fn turn_id(&self) -> &str {
        match self {
            TurnEvent::Started { turn_id, .. }
            | TurnEvent::RouteCreated { turn_id, .. }
            | TurnEvent::DeltaApplied { turn_id, .. }
            | TurnEvent::RouteCompleted { turn_id, .. }
            | TurnEvent::ConsensusReceived { turn_id, .. }
            | TurnEvent::Settled { turn_id }
            | TurnEvent::Failed { turn_id, .. }
            | TurnEvent::Cancelled { turn_id } => turn_id,
        }
    }

    /// True for the event that ends a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnEvent::Settled { .. } | TurnEvent::Failed { .. } | TurnEvent::Cancelled { .. }
        )
    }
}

/// Called on the driving task right after each mutation, with the turn in
/// its updated state.
pub trait TurnObserver: Send + Sync {
    fn on_turn_event(&self, event: &TurnEvent, turn: &Turn);
}

pub struct NoopObserver;

impl TurnObserver for NoopObserver {
    fn on_turn_event(&self, _event: &TurnEvent, _turn: &Turn) {}
}

/// Forwards events to another task (e.g. a UI loop).
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TurnEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TurnObserver for ChannelObserver {
    fn on_turn_event(&self, event: &TurnEvent, _turn: &Turn) {
        let _ = self.tx.send(event.clone());
    }
}
