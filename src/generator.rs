//! Response generation
//!
//! Produces the next utterance for a persona, either from the canned-phrase
//! table or through a chat-completion call. Real generation never fails
//! outward: any failure falls back to a canned phrase and reports why.

mod mock;

pub use mock::mock_response;

use crate::llm::{LlmMessage, LlmRequest, LlmService};
use crate::settings::{ConversationSettings, Credentials, PersonaConfig};
use crate::store::{Message, Persona, Sender};
use std::sync::Arc;

/// Number of trailing real messages sent as context
pub const HISTORY_WINDOW: usize = 10;

/// Result of one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    /// Set when real generation failed and a canned phrase was used instead
    pub fallback: Option<String>,
}

impl Generation {
    fn canned(persona: Persona, history: &[Message], reason: Option<String>) -> Self {
        let context = latest_real(history).map_or("", |m| m.content.as_str());
        Self {
            content: mock_response(persona, context),
            fallback: reason,
        }
    }
}

fn latest_real(history: &[Message]) -> Option<&Message> {
    history.iter().rev().find(|m| !m.pending)
}

/// Build the chat-completion request for `persona` from the real history
pub fn build_request(persona: Persona, history: &[Message], config: &PersonaConfig) -> LlmRequest {
    let real: Vec<&Message> = history.iter().filter(|m| !m.pending).collect();
    let start = real.len().saturating_sub(HISTORY_WINDOW);
    let own = Sender::from(persona);

    let messages = real[start..]
        .iter()
        .map(|m| {
            if m.sender == own {
                LlmMessage::assistant(m.content.clone())
            } else {
                LlmMessage::user(m.content.clone())
            }
        })
        .collect();

    LlmRequest {
        model: config.model_id.clone(),
        system: config.system_prompt.clone(),
        messages,
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_output_tokens),
    }
}

#[derive(Clone)]
pub struct ResponseGenerator {
    llm: Arc<dyn LlmService>,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    pub async fn generate(
        &self,
        persona: Persona,
        history: &[Message],
        settings: &ConversationSettings,
        config: &PersonaConfig,
        credentials: &Credentials,
    ) -> Generation {
        if !settings.use_real_generation {
            return Generation::canned(persona, history, None);
        }

        if !credentials.has_openai_key() {
            return Generation::canned(
                persona,
                history,
                Some("No OpenAI API key available".to_string()),
            );
        }

        let request = build_request(persona, history, config);
        match self.llm.complete(&request, &credentials.openai_key).await {
            Ok(response) => Generation {
                content: response.text,
                fallback: None,
            },
            Err(e) => {
                tracing::warn!(
                    persona = %persona,
                    error = %e,
                    "Generation failed, using canned response"
                );
                Generation::canned(persona, history, Some(e.message))
            }
        }
    }
}
