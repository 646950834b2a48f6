//! One user submission and its in-flight model responses.

use super::aggregation::{ModelStream, ModelStreamStore};
use super::completion::{TurnCompletionTracker, TurnPhase};
use super::observer::TurnEvent;
use super::persistence::{ModelResponse, TurnRecord};
use super::route_planner::plan_routes;
use log::debug;
use multichat_core_types::{
    ChatMode, ContentItem, Route, RoutePlan, StreamEvent, CONSENSUS_MODEL_ID,
};

/// Store key under which the synthesis output is kept.
pub const CONSENSUS_STREAM_KEY: &str = CONSENSUS_MODEL_ID;

/// Owns the aggregation store and completion tracker for exactly one turn;
/// a new turn always starts from fresh state.
#[derive(Debug)]
pub struct Turn {
    id: String,
    user_message: Vec<ContentItem>,
    selected: Vec<Route>,
    plan: RoutePlan,
    streams: ModelStreamStore,
    tracker: TurnCompletionTracker,
    created_at_ms: i64,
    settled_at_ms: Option<i64>,
}

impl Turn {
    pub fn new(user_message: Vec<ContentItem>, selected: Vec<Route>) -> Self {
        let plan = plan_routes(&selected);
        let tracker = TurnCompletionTracker::new(&plan);
        Self {
            id: format!("turn-{}", uuid::Uuid::new_v4()),
            user_message,
            selected,
            plan,
            streams: ModelStreamStore::new(),
            tracker,
            created_at_ms: chrono::Utc::now().timestamp_millis(),
            settled_at_ms: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_message(&self) -> &[ContentItem] {
        &self.user_message
    }

    pub fn selected(&self) -> &[Route] {
        &self.selected
    }

    pub fn plan(&self) -> &RoutePlan {
        &self.plan
    }

    pub fn streams(&self) -> &ModelStreamStore {
        &self.streams
    }

    pub fn phase(&self) -> TurnPhase {
        self.tracker.phase()
    }

    pub fn is_streaming(&self) -> bool {
        self.tracker.is_streaming()
    }

    pub fn error(&self) -> Option<&str> {
        self.tracker.error()
    }

    pub fn completed_routes(&self) -> usize {
        self.tracker.completed_count()
    }

    pub fn stream(&self, model: &str) -> Option<&ModelStream> {
        self.streams.get(model)
    }

    pub fn consensus_text(&self) -> Option<&str> {
        self.streams
            .get(CONSENSUS_STREAM_KEY)
            .map(|stream| stream.text.as_str())
    }

    /// `Idle -> Streaming`, reached as soon as the request is issued.
    pub fn begin_streaming(&mut self) -> Option<TurnEvent> {
        if self.tracker.phase() != TurnPhase::Idle {
            return None;
        }
        self.tracker.begin_streaming();
        debug!(
            "Turn streaming: turn_id={}, mode={}, routes={}",
            self.id,
            self.plan.mode.as_str(),
            self.plan.expected_completions()
        );
        Some(TurnEvent::Started {
            turn_id: self.id.clone(),
            mode: self.plan.mode,
            routes: self.plan.routes().to_vec(),
        })
    }

    /// True while a consensus turn has settled on its route completions
    /// but the synthesis output has not arrived yet.
    pub fn awaits_consensus(&self) -> bool {
        self.plan.mode == ChatMode::Consensus
            && self.tracker.is_settled()
            && self.consensus_text().is_none()
    }

    /// Single dispatch point for normalized stream events.
    ///
    /// Returns the observable changes, in order. Events after the turn
    /// reached a terminal phase and events naming models outside the plan
    /// are ignored, except a synthesis that follows a consensus turn's
    /// settlement, which is still recorded.
    pub fn handle(&mut self, event: StreamEvent) -> Vec<TurnEvent> {
        if self.tracker.phase().is_terminal() {
            return match event {
                StreamEvent::Consensus { text } if self.awaits_consensus() => {
                    vec![self.store_consensus(text)]
                }
                event => {
                    debug!("Ignoring event for finished turn {}: {:?}", self.id, event);
                    Vec::new()
                }
            };
        }
        if let Some(model) = event.model() {
            if !self.plan.contains_model(model) {
                debug!("Ignoring event for unknown model {} in turn {}", model, self.id);
                return Vec::new();
            }
        }

        let mut updates: Vec<TurnEvent> = self.begin_streaming().into_iter().collect();
        match event {
            StreamEvent::Created { model } => {
                self.streams.on_created(&model);
                updates.push(TurnEvent::RouteCreated {
                    turn_id: self.id.clone(),
                    model,
                });
            }
            StreamEvent::Delta { model, text } => {
                if self.streams.on_delta(&model, &text) {
                    updates.push(TurnEvent::DeltaApplied {
                        turn_id: self.id.clone(),
                        model,
                        text,
                    });
                }
            }
            StreamEvent::Completed { model } => {
                if self.streams.on_completed(&model) {
                    let settled = self.tracker.record_completed(&model);
                    updates.push(TurnEvent::RouteCompleted {
                        turn_id: self.id.clone(),
                        model,
                    });
                    if settled {
                        updates.push(self.mark_settled());
                    }
                }
            }
            StreamEvent::Consensus { text } => {
                updates.push(self.store_consensus(text));
                if self.tracker.record_consensus() {
                    updates.push(self.mark_settled());
                }
            }
        }
        updates
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Option<TurnEvent> {
        let reason = reason.into();
        if !self.tracker.fail(reason.clone()) {
            return None;
        }
        self.settled_at_ms = Some(chrono::Utc::now().timestamp_millis());
        Some(TurnEvent::Failed {
            turn_id: self.id.clone(),
            reason,
        })
    }

    pub fn cancel(&mut self) -> Option<TurnEvent> {
        if !self.tracker.cancel() {
            return None;
        }
        self.settled_at_ms = Some(chrono::Utc::now().timestamp_millis());
        Some(TurnEvent::Cancelled {
            turn_id: self.id.clone(),
        })
    }

    fn store_consensus(&mut self, text: String) -> TurnEvent {
        self.streams.set_final(CONSENSUS_STREAM_KEY, &text);
        TurnEvent::ConsensusReceived {
            turn_id: self.id.clone(),
            text,
        }
    }

    fn mark_settled(&mut self) -> TurnEvent {
        self.settled_at_ms = Some(chrono::Utc::now().timestamp_millis());
        debug!(
            "Turn settled: turn_id={}, completed_routes={}/{}",
            self.id,
            self.tracker.completed_count(),
            self.tracker.expected_count()
        );
        TurnEvent::Settled {
            turn_id: self.id.clone(),
        }
    }

    /// Per-route responses in plan order.
    pub fn responses(&self) -> Vec<ModelResponse> {
        self.plan
            .routes()
            .iter()
            .map(|route| {
                let stream = self.streams.get(&route.model);
                ModelResponse {
                    provider: route.provider.clone(),
                    model: route.model.clone(),
                    text: stream.map(|s| s.text.clone()).unwrap_or_default(),
                    completed: stream.map(|s| s.completed).unwrap_or(false),
                }
            })
            .collect()
    }

    pub fn to_record(&self) -> TurnRecord {
        TurnRecord {
            turn_id: self.id.clone(),
            mode: self.plan.mode,
            routes: self.selected.clone(),
            user_message: self.user_message.clone(),
            responses: self.responses(),
            consensus: self.consensus_text().map(str::to_string),
            phase: self.phase(),
            created_at_ms: self.created_at_ms,
            settled_at_ms: self.settled_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(model: &str, text: &str) -> StreamEvent {
        StreamEvent::Delta {
            model: model.to_string(),
            text: text.to_string(),
        }
    }

    fn completed(model: &str) -> StreamEvent {
        StreamEvent::Completed {
            model: model.to_string(),
        }
    }

    fn multi_turn() -> Turn {
        Turn::new(
            vec![ContentItem::text("hi")],
            vec![Route::new("openai", "gpt-5"), Route::new("anthropic", "claude")],
        )
    }

    #[test]
    fn first_event_starts_streaming() {
        let mut turn = multi_turn();
        assert_eq!(turn.phase(), TurnPhase::Idle);
        let updates = turn.handle(delta("gpt-5", "x"));
        assert!(matches!(updates[0], TurnEvent::Started { .. }));
        assert!(matches!(updates[1], TurnEvent::DeltaApplied { .. }));
        assert!(turn.is_streaming());
    }

    #[test]
    fn settles_when_all_routes_complete() {
        let mut turn = multi_turn();
        turn.begin_streaming();
        turn.handle(delta("gpt-5", "Hello"));
        turn.handle(delta("claude", "Hi"));
        turn.handle(completed("gpt-5"));
        turn.handle(completed("gpt-5"));
        assert!(turn.is_streaming());
        assert_eq!(turn.completed_routes(), 1);

        let updates = turn.handle(completed("claude"));
        assert!(matches!(updates.last(), Some(TurnEvent::Settled { .. })));
        assert_eq!(turn.phase(), TurnPhase::Settled);

        let responses = turn.responses();
        assert_eq!(responses[0].text, "Hello");
        assert_eq!(responses[1].text, "Hi");
        assert!(responses.iter().all(|r| r.completed));
    }

    #[test]
    fn unknown_models_are_ignored() {
        let mut turn = multi_turn();
        turn.begin_streaming();
        assert!(turn.handle(delta("llama", "rogue")).is_empty());
        assert!(turn.handle(completed("llama")).is_empty());
        assert!(turn.stream("llama").is_none());
        assert_eq!(turn.completed_routes(), 0);
    }

    #[test]
    fn consensus_settles_and_is_stored() {
        let mut turn = Turn::new(
            vec![ContentItem::text("hi")],
            vec![
                Route::new("openai", "a"),
                Route::new("anthropic", "b"),
                Route::new("multichat", CONSENSUS_MODEL_ID),
            ],
        );
        turn.begin_streaming();
        turn.handle(delta("a", "partial"));
        let updates = turn.handle(StreamEvent::Consensus {
            text: "merged answer".to_string(),
        });
        assert!(matches!(updates.last(), Some(TurnEvent::Settled { .. })));
        assert_eq!(turn.phase(), TurnPhase::Settled);
        assert_eq!(turn.consensus_text(), Some("merged answer"));
        assert_eq!(turn.completed_routes(), 0);

        let record = turn.to_record();
        assert_eq!(record.consensus.as_deref(), Some("merged answer"));
        assert_eq!(record.routes.len(), 3);
        assert_eq!(record.responses.len(), 2);
        assert!(record.settled_at_ms.is_some());
    }

    #[test]
    fn consensus_turn_settles_on_completions_and_keeps_late_synthesis() {
        let mut turn = Turn::new(
            vec![ContentItem::text("hi")],
            vec![
                Route::new("openai", "a"),
                Route::new("anthropic", "b"),
                Route::new("multichat", CONSENSUS_MODEL_ID),
            ],
        );
        turn.handle(completed("a"));
        let updates = turn.handle(completed("b"));
        assert!(matches!(updates.last(), Some(TurnEvent::Settled { .. })));
        assert_eq!(turn.phase(), TurnPhase::Settled);
        assert!(turn.awaits_consensus());

        let updates = turn.handle(StreamEvent::Consensus {
            text: "merged".to_string(),
        });
        assert!(matches!(
            updates.as_slice(),
            [TurnEvent::ConsensusReceived { .. }]
        ));
        assert_eq!(turn.consensus_text(), Some("merged"));
        assert!(!turn.awaits_consensus());
        assert!(turn
            .handle(StreamEvent::Consensus {
                text: "again".to_string()
            })
            .is_empty());
        assert_eq!(turn.consensus_text(), Some("merged"));
    }

    #[test]
    fn providers_sharing_a_model_settle_together() {
        let mut turn = Turn::new(
            vec![ContentItem::text("hi")],
            vec![Route::new("openai", "gpt-5"), Route::new("azure", "gpt-5")],
        );
        turn.handle(delta("gpt-5", "same"));
        turn.handle(completed("gpt-5"));
        turn.handle(completed("gpt-5"));
        assert_eq!(turn.phase(), TurnPhase::Settled);
        assert_eq!(turn.completed_routes(), 1);
        assert!(!turn.awaits_consensus());
    }

    #[test]
    fn events_after_settlement_are_ignored() {
        let mut turn = Turn::new(
            vec![ContentItem::text("hi")],
            vec![Route::new("openai", "gpt-5")],
        );
        turn.handle(delta("gpt-5", "done"));
        turn.handle(completed("gpt-5"));
        assert_eq!(turn.phase(), TurnPhase::Settled);
        assert!(turn.handle(delta("gpt-5", " again")).is_empty());
        assert_eq!(turn.stream("gpt-5").unwrap().text, "done");
    }

    #[test]
    fn failure_and_cancel_are_terminal() {
        let mut turn = multi_turn();
        turn.begin_streaming();
        assert!(matches!(turn.fail("reset"), Some(TurnEvent::Failed { .. })));
        assert_eq!(turn.error(), Some("reset"));
        assert!(turn.cancel().is_none());
        assert!(turn.handle(delta("gpt-5", "x")).is_empty());
    }
}
