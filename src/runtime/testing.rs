//! Mock implementations for testing
//!
//! These mocks let the runtime run end to end under paused time without
//! touching the network.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
    keys: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(LlmResponse {
            text: text.into(),
            ..Default::default()
        });
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn recorded_keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }

    fn record(&self, request: &LlmRequest, api_key: &str) {
        self.requests.lock().unwrap().push(request.clone());
        self.keys.lock().unwrap().push(api_key.to_string());
    }

    fn next_response(&self) -> Result<LlmResponse, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

impl Default for MockLlmService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest, api_key: &str) -> Result<LlmResponse, LlmError> {
        self.record(request, api_key);
        self.next_response()
    }
}

// ============================================================================
// Delayed Mock LLM Service (for cancellation testing)
// ============================================================================

/// Mock LLM service that answers every request with the same text after a delay
pub struct DelayedMockLlmService {
    inner: MockLlmService,
    delay: Duration,
    text: String,
}

impl DelayedMockLlmService {
    pub fn new(delay: Duration, text: impl Into<String>) -> Self {
        Self {
            inner: MockLlmService::new(),
            delay,
            text: text.into(),
        }
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmService for DelayedMockLlmService {
    async fn complete(&self, request: &LlmRequest, api_key: &str) -> Result<LlmResponse, LlmError> {
        self.inner.record(request, api_key);
        tokio::time::sleep(self.delay).await;
        Ok(LlmResponse {
            text: self.text.clone(),
            ..Default::default()
        })
    }
}

// ============================================================================
// Runtime tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportOptions;
    use crate::runtime::{ArenaError, ArenaEvent, ArenaHandle, ArenaRuntime};
    use crate::settings::{ConversationSettings, Credentials, StartRequest, StopCondition};
    use crate::state_machine::{ArenaContext, NoticeLevel, StopReason, TransitionError};
    use crate::store::{Message, Persona, Sender};
    use std::sync::Arc;
    use tokio::sync::broadcast;

    fn spawn_with(llm: Arc<dyn LlmService>) -> ArenaHandle {
        ArenaRuntime::spawn(ArenaContext::default(), llm)
    }

    fn spawn_mock() -> ArenaHandle {
        spawn_with(Arc::new(MockLlmService::new()))
    }

    fn request(settings: ConversationSettings) -> StartRequest {
        StartRequest {
            settings,
            ..Default::default()
        }
    }

    fn real_request(key: &str) -> StartRequest {
        StartRequest {
            settings: ConversationSettings {
                use_real_generation: true,
                ..Default::default()
            },
            credentials: Credentials::openai(key),
            ..Default::default()
        }
    }

    async fn advance(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    fn persona_senders(messages: &[Message]) -> Vec<Persona> {
        messages
            .iter()
            .filter(|m| !m.pending)
            .filter_map(Message::persona)
            .collect()
    }

    fn assert_alternates(senders: &[Persona]) {
        for pair in senders.windows(2) {
            assert_ne!(pair[0], pair[1], "same persona spoke twice: {senders:?}");
        }
    }

    fn drain(rx: &mut broadcast::Receiver<ArenaEvent>) -> Vec<ArenaEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_pineapple_conversation_alternates() {
        let arena = spawn_mock();

        arena
            .start(request(ConversationSettings::default()))
            .await
            .unwrap();
        assert!(arena.state().is_running());

        advance(20).await;

        let senders = persona_senders(&arena.snapshot().messages);
        assert!(senders.len() >= 2, "expected two messages, got {senders:?}");
        assert_eq!(senders[0], Persona::PersonaA);
        assert_eq!(senders[1], Persona::PersonaB);
        assert_alternates(&senders);

        let transcript = arena.export(ExportOptions::default());
        assert!(transcript.starts_with("AI-X: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_speaker_opens_when_configured() {
        let arena = spawn_mock();

        arena
            .start(request(ConversationSettings {
                first_speaker: Persona::PersonaB,
                ..Default::default()
            }))
            .await
            .unwrap();
        advance(20).await;

        let senders = persona_senders(&arena.snapshot().messages);
        assert_eq!(senders[0], Persona::PersonaB);
        assert_alternates(&senders);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_key_refuses_start() {
        let llm = Arc::new(MockLlmService::new());
        let arena = spawn_with(llm.clone());

        let result = arena.start(real_request("")).await;

        assert!(matches!(
            result,
            Err(ArenaError::Rejected(TransitionError::MissingCredential))
        ));
        advance(10).await;
        assert!(!arena.state().is_running());
        assert!(arena.snapshot().messages.is_empty());
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_is_final() {
        let arena = spawn_mock();
        arena
            .start(request(ConversationSettings::default()))
            .await
            .unwrap();
        advance(5).await;

        assert!(arena.stop().await.unwrap());
        let after_stop = arena.snapshot();
        assert!(!after_stop.active);
        assert!(after_stop.messages.iter().all(|m| !m.pending));

        advance(10).await;

        let later = arena.snapshot();
        assert_eq!(later.messages.len(), after_stop.messages.len());
        assert!(!arena.state().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_reports_false() {
        let arena = spawn_mock();
        assert!(!arena.stop().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_limit_stops_exactly() {
        let arena = spawn_mock();
        let mut rx = arena.subscribe();

        arena
            .start(request(ConversationSettings {
                stop_condition: StopCondition::MessageCount,
                message_limit: 3,
                ..Default::default()
            }))
            .await
            .unwrap();
        advance(60).await;

        let snapshot = arena.snapshot();
        assert!(!snapshot.active);
        assert_eq!(persona_senders(&snapshot.messages).len(), 3);
        assert!(!arena.state().is_running());

        let stopped: Vec<StopReason> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                ArenaEvent::Stopped { reason } => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(stopped, vec![StopReason::MessageCount]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_limit_stops_after_a_minute() {
        let arena = spawn_mock();
        arena
            .start(request(ConversationSettings {
                stop_condition: StopCondition::ElapsedTime,
                time_limit_minutes: 1,
                ..Default::default()
            }))
            .await
            .unwrap();

        advance(58).await;
        assert!(arena.state().is_running());

        advance(4).await;
        let snapshot = arena.snapshot();
        assert!(!snapshot.active);
        assert_eq!(snapshot.elapsed_seconds, 60);
        assert!(!arena.state().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_messages_do_not_break_alternation() {
        let arena = spawn_mock();
        arena
            .start(request(ConversationSettings::default()))
            .await
            .unwrap();
        advance(5).await;

        arena.submit_user_message("What about anchovies?").await.unwrap();
        advance(30).await;

        let messages = arena.snapshot().messages;
        let humans: Vec<&Message> = messages
            .iter()
            .filter(|m| m.sender == Sender::Human)
            .collect();
        assert_eq!(humans.len(), 1);
        assert_eq!(humans[0].content, "What about anchovies?");

        let senders = persona_senders(&messages);
        assert!(senders.len() >= 3);
        assert_eq!(senders[0], Persona::PersonaA);
        assert_alternates(&senders);

        let without_human = arena.export(ExportOptions::default());
        assert!(!without_human.contains("anchovies"));
        let with_human = arena.export(ExportOptions {
            include_human: true,
        });
        assert!(with_human.contains("Human: What about anchovies?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_rejections() {
        let arena = spawn_mock();

        assert!(matches!(
            arena.submit_user_message("hello").await,
            Err(ArenaError::Rejected(TransitionError::NotRunning))
        ));

        arena
            .start(request(ConversationSettings::default()))
            .await
            .unwrap();

        assert!(matches!(
            arena.submit_user_message("   ").await,
            Err(ArenaError::Rejected(TransitionError::EmptyMessage))
        ));
        assert!(matches!(
            arena.start(request(ConversationSettings::default())).await,
            Err(ArenaError::Rejected(TransitionError::AlreadyRunning))
        ));
        assert!(matches!(
            arena
                .start(request(ConversationSettings {
                    message_limit: 0,
                    ..Default::default()
                }))
                .await,
            Err(ArenaError::Rejected(TransitionError::AlreadyRunning))
        ));
        assert!(arena.state().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_settings_rejected() {
        let arena = spawn_mock();

        let result = arena
            .start(request(ConversationSettings {
                message_limit: 0,
                ..Default::default()
            }))
            .await;

        assert!(matches!(
            result,
            Err(ArenaError::Rejected(TransitionError::InvalidSettings(_)))
        ));
        assert!(!arena.state().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_failure_falls_back_with_warning() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_error(LlmError::rate_limit("slow down"));
        let arena = spawn_with(llm.clone());
        let mut rx = arena.subscribe();

        arena.start(real_request("sk-test")).await.unwrap();
        advance(20).await;

        let senders = persona_senders(&arena.snapshot().messages);
        assert!(senders.len() >= 2);
        assert_alternates(&senders);

        let warnings: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                ArenaEvent::Notice { notice } if notice.level == NoticeLevel::Warning => {
                    Some(notice.text)
                }
                _ => None,
            })
            .collect();
        assert!(!warnings.is_empty());
        assert_eq!(
            warnings[0],
            "Failed to get AI-X response, using fallback: slow down"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_generation_requests() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_text("Pineapple belongs on pizza.");
        llm.queue_text("I must respectfully disagree.");
        let arena = spawn_with(llm.clone());

        arena.start(real_request("sk-live")).await.unwrap();
        advance(20).await;

        let messages = arena.messages_from(Persona::PersonaA);
        assert_eq!(messages[0].content, "Pineapple belongs on pizza.");
        let replies = arena.messages_from(Persona::PersonaB);
        assert_eq!(replies[0].content, "I must respectfully disagree.");

        let requests = llm.recorded_requests();
        assert!(requests.len() >= 2);
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert!(requests[0].messages.is_empty());
        assert_eq!(requests[1].model, "gpt-4o");
        assert_eq!(requests[1].messages.len(), 1);
        assert!(llm.recorded_keys().iter().all(|k| k == "sk-live"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_never_lands() {
        let llm = Arc::new(DelayedMockLlmService::new(Duration::from_secs(10), "STALE"));
        let arena = spawn_with(llm.clone());

        arena.start(real_request("sk-test")).await.unwrap();
        advance(2).await;
        assert_eq!(llm.recorded_requests().len(), 1);
        assert!(arena.stop().await.unwrap());

        arena
            .start(request(ConversationSettings::default()))
            .await
            .unwrap();
        advance(20).await;

        let messages = arena.snapshot().messages;
        assert!(!messages.is_empty());
        assert!(messages.iter().all(|m| !m.content.contains("STALE")));
        assert_alternates(&persona_senders(&messages));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_init_then_state() {
        let arena = spawn_mock();
        let mut rx = arena.subscribe();

        arena
            .start(request(ConversationSettings::default()))
            .await
            .unwrap();

        let names: Vec<&str> = drain(&mut rx).iter().map(ArenaEvent::name).collect();
        assert_eq!(names, vec!["init", "notice", "state_change"]);

        advance(10).await;
        let later = drain(&mut rx);
        assert!(later.iter().any(|e| matches!(e, ArenaEvent::Elapsed { .. })));
        assert!(later.iter().any(|e| matches!(
            e,
            ArenaEvent::Message {
                replaces: Some(_),
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_removes_placeholder() {
        let arena = spawn_mock();
        let mut rx = arena.subscribe();
        arena
            .start(request(ConversationSettings::default()))
            .await
            .unwrap();

        // The opening is composing between 1s and at least 2.5s
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(arena.snapshot().messages.iter().any(|m| m.pending));

        arena.stop().await.unwrap();
        assert!(arena.snapshot().messages.is_empty());

        let removed = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, ArenaEvent::MessageRemoved { .. }))
            .count();
        assert_eq!(removed, 1);
    }
}
