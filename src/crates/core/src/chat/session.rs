//! Turn coordinator: upload, resolve, plan, stream, settle.

use super::attachments::resolve_attachments;
use super::completion::TurnPhase;
use super::observer::{NoopObserver, TurnEvent, TurnObserver};
use super::persistence::{ModelResponse, TurnSink};
use super::turn::Turn;
use crate::config::ChatClientConfig;
use crate::logging::{apply_log_level, parse_log_level};
use crate::util::errors::{MultichatError, MultichatResult};
use log::{debug, error, warn};
use multichat_ai_adapters::{handle_chat_stream, GatewayClient, UploadFile};
use multichat_core_types::{ChatRequest, ContentItem, Route, RoutePlan};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadFailurePolicy {
    /// Fail the send before any chat request is issued.
    #[default]
    Abort,
    /// Drop the attachments and send the text alone.
    ContinueTextOnly,
}

#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub text: String,
    pub selected: Vec<Route>,
    pub attachments: Vec<UploadFile>,
    /// Providers asked to analyze the attachments; the first one anchors
    /// the file list. Defaults to the providers of the selected routes.
    pub requested_providers: Vec<String>,
    pub upload_failure: UploadFailurePolicy,
}

impl TurnRequest {
    pub fn new(text: impl Into<String>, selected: Vec<Route>) -> Self {
        Self {
            text: text.into(),
            selected,
            ..Default::default()
        }
    }

    pub fn with_attachments(mut self, files: Vec<UploadFile>, providers: Vec<String>) -> Self {
        self.attachments = files;
        self.requested_providers = providers;
        self
    }

    pub fn continue_text_only_on_upload_failure(mut self) -> Self {
        self.upload_failure = UploadFailurePolicy::ContinueTextOnly;
        self
    }

    fn providers_for_upload(&self) -> Vec<String> {
        if !self.requested_providers.is_empty() {
            return self.requested_providers.clone();
        }
        let mut providers: Vec<String> = Vec::new();
        for route in self.selected.iter().filter(|route| !route.is_consensus()) {
            if !providers.contains(&route.provider) {
                providers.push(route.provider.clone());
            }
        }
        providers
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub turn_id: String,
    pub phase: TurnPhase,
    pub responses: Vec<ModelResponse>,
    pub consensus: Option<String>,
}

/// Drives one conversation's turns against the gateway.
///
/// `send_turn` takes `&mut self`, so at most one turn is in flight per
/// session; each send replaces the previous turn and its state.
pub struct ChatSession {
    client: GatewayClient,
    config: ChatClientConfig,
    observer: Arc<dyn TurnObserver>,
    sink: Option<Arc<dyn TurnSink>>,
    current: Option<Turn>,
}

impl ChatSession {
    pub fn new(config: ChatClientConfig) -> MultichatResult<Self> {
        config.validate()?;
        if let Some(level) = config.log_level.as_deref().and_then(parse_log_level) {
            apply_log_level(level, "chat-client-config");
        }

        let client = GatewayClient::new(config.gateway_options())
            .map_err(|e| MultichatError::config(format!("{:#}", e)))?;

        Ok(Self {
            client,
            config,
            observer: Arc::new(NoopObserver),
            sink: None,
            current: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn TurnSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &ChatClientConfig {
        &self.config
    }

    pub fn current_turn(&self) -> Option<&Turn> {
        self.current.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.current.as_ref().is_some_and(Turn::is_streaming)
    }

    /// Run one turn to a terminal phase.
    ///
    /// Resolves with the settled outcome; transport failures, streams that
    /// end early and cancellation leave the turn in `Errored`/`Cancelled`
    /// and return an error. The turn stays readable via `current_turn`.
    pub async fn send_turn(
        &mut self,
        request: TurnRequest,
        cancel_token: CancellationToken,
    ) -> MultichatResult<TurnOutcome> {
        if request.selected.is_empty() {
            return Err(MultichatError::validation("At least one route must be selected"));
        }
        if request.text.trim().is_empty() && request.attachments.is_empty() {
            return Err(MultichatError::validation("Message is empty"));
        }

        self.abandon_unfinished_turn();

        let content = self.build_user_message(&request).await?;
        let turn = self
            .current
            .insert(Turn::new(content, request.selected));
        let chat_request = build_chat_request(&self.config, turn.plan(), turn.user_message());

        let result = drive_turn(
            &self.client,
            &self.config,
            self.observer.as_ref(),
            turn,
            chat_request,
            cancel_token,
        )
        .await;

        if turn.phase() == TurnPhase::Settled {
            if let Some(sink) = &self.sink {
                if let Err(e) = sink.save_turn(&turn.to_record()).await {
                    warn!("Failed to persist turn {}: {}", turn.id(), e);
                }
            }
        }

        result?;
        Ok(TurnOutcome {
            turn_id: turn.id().to_string(),
            phase: turn.phase(),
            responses: turn.responses(),
            consensus: turn.consensus_text().map(str::to_string),
        })
    }

    /// A previous send whose future was dropped mid-stream leaves its turn
    /// non-terminal; close it out before replacing it.
    fn abandon_unfinished_turn(&mut self) {
        if let Some(turn) = self.current.as_mut() {
            if let Some(event) = turn.cancel() {
                warn!("Previous turn {} was left unfinished; marking cancelled", turn.id());
                self.observer.on_turn_event(&event, turn);
            }
        }
    }

    async fn build_user_message(&self, request: &TurnRequest) -> MultichatResult<Vec<ContentItem>> {
        let mut content = vec![ContentItem::text(request.text.clone())];
        if request.attachments.is_empty() {
            return Ok(content);
        }

        let providers = request.providers_for_upload();
        match self
            .client
            .upload_files(request.attachments.clone(), &providers)
            .await
        {
            Ok(upload) => {
                let items = resolve_attachments(&upload, &providers);
                debug!(
                    "Resolved {} attachment item(s) from {} upload(s)",
                    items.len(),
                    request.attachments.len()
                );
                content.extend(items);
            }
            Err(e) => match request.upload_failure {
                UploadFailurePolicy::Abort => {
                    error!("Attachment upload failed: {:#}", e);
                    return Err(MultichatError::upload(format!("{:#}", e)));
                }
                UploadFailurePolicy::ContinueTextOnly => {
                    warn!("Attachment upload failed, continuing text-only: {:#}", e);
                }
            },
        }
        Ok(content)
    }
}

fn build_chat_request(
    config: &ChatClientConfig,
    plan: &RoutePlan,
    content: &[ContentItem],
) -> ChatRequest {
    let mut request = ChatRequest::new(plan, content.to_vec());
    request.stream = config.stream;
    request.provider_response = config.provider_response;
    request.temperature = config.temperature;
    request.max_tokens = config.max_tokens;
    request
}

fn notify(observer: &dyn TurnObserver, turn: &Turn, event: Option<TurnEvent>) {
    if let Some(event) = event {
        observer.on_turn_event(&event, turn);
    }
}

fn fail_turn(observer: &dyn TurnObserver, turn: &mut Turn, reason: String) -> MultichatError {
    error!("Turn {} failed: {}", turn.id(), reason);
    let event = turn.fail(reason.clone());
    notify(observer, turn, event);
    MultichatError::transport(reason)
}

fn cancel_turn(observer: &dyn TurnObserver, turn: &mut Turn) -> MultichatError {
    debug!("Turn {} cancelled by caller", turn.id());
    let event = turn.cancel();
    notify(observer, turn, event);
    MultichatError::Cancelled
}

async fn drive_turn(
    client: &GatewayClient,
    config: &ChatClientConfig,
    observer: &dyn TurnObserver,
    turn: &mut Turn,
    chat_request: ChatRequest,
    cancel_token: CancellationToken,
) -> MultichatResult<()> {
    let started = turn.begin_streaming();
    notify(observer, turn, started);

    let response = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => None,
        response = client.open_chat_stream(&chat_request) => Some(response),
    };
    let response = match response {
        None => return Err(cancel_turn(observer, turn)),
        Some(Ok(response)) => response,
        Some(Err(e)) => return Err(fail_turn(observer, turn, format!("{:#}", e))),
    };

    let (tx_event, mut rx_event) = mpsc::unbounded_channel();
    let stream_token = cancel_token.child_token();
    let handler = tokio::spawn(handle_chat_stream(
        response,
        tx_event,
        None,
        stream_token.clone(),
        config.idle_timeout(),
    ));

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => None,
            next = rx_event.recv() => Some(next),
        };

        // A consensus turn settled by its route completions keeps reading
        // for the synthesis; losing the stream then is not a failure.
        if turn.awaits_consensus() && !matches!(next, Some(Some(Ok(_)))) {
            debug!(
                "Turn {} settled without a consensus synthesis; closing stream",
                turn.id()
            );
            break Ok(());
        }

        match next {
            None => break Err(cancel_turn(observer, turn)),
            Some(Some(Ok(event))) => {
                for update in turn.handle(event) {
                    observer.on_turn_event(&update, turn);
                }
                if turn.phase().is_terminal() && !turn.awaits_consensus() {
                    break Ok(());
                }
            }
            Some(Some(Err(e))) => break Err(fail_turn(observer, turn, format!("{:#}", e))),
            Some(None) => {
                let reason = format!(
                    "Stream ended before the turn settled ({}/{} routes completed)",
                    turn.completed_routes(),
                    turn.plan().expected_completions()
                );
                break Err(fail_turn(observer, turn, reason));
            }
        }
    };

    // Release the body once the turn is terminal.
    stream_token.cancel();
    if let Err(e) = handler.await {
        warn!("Chat stream handler task failed: {}", e);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use multichat_core_types::CONSENSUS_MODEL_ID;

    #[test]
    fn upload_providers_default_to_selected_route_providers() {
        let request = TurnRequest::new(
            "hi",
            vec![
                Route::new("openai", "gpt-5"),
                Route::new("openai", "gpt-5-mini"),
                Route::new("deepseek", "deepseek-chat"),
                Route::new("multichat", CONSENSUS_MODEL_ID),
            ],
        );
        assert_eq!(
            request.providers_for_upload(),
            vec!["openai".to_string(), "deepseek".to_string()]
        );

        let explicit = request.with_attachments(Vec::new(), vec!["anthropic".to_string()]);
        assert_eq!(explicit.providers_for_upload(), vec!["anthropic".to_string()]);
    }

    #[test]
    fn chat_request_carries_sampling_config() {
        let config = ChatClientConfig {
            temperature: Some(0.2),
            max_tokens: Some(64),
            provider_response: true,
            ..Default::default()
        };
        let plan = crate::chat::plan_routes(&[Route::new("openai", "gpt-5")]);
        let request = build_chat_request(&config, &plan, &[ContentItem::text("q")]);
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(64));
        assert!(request.provider_response);
        assert!(request.stream);
        assert_eq!(request.messages[0].content, vec![ContentItem::text("q")]);
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_before_any_request() {
        let mut session = ChatSession::new(ChatClientConfig::default()).unwrap();
        let err = session
            .send_turn(TurnRequest::new("hi", Vec::new()), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MultichatError::Validation(_)));
        assert!(session.current_turn().is_none());
    }
}
