//! Typing simulation
//!
//! A persona "composes" before its message lands: a pending placeholder goes
//! in, a delay passes, the placeholder is resolved to the final content. The
//! runtime drives `begin` and `finish` around its own cancellable timer.

use crate::config::TurnTiming;
use crate::store::{ConversationStore, Message, MessageId, Persona, StoreResult};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TypingSimulator {
    timing: TurnTiming,
    store: ConversationStore,
}

impl TypingSimulator {
    pub fn new(timing: TurnTiming, store: ConversationStore) -> Self {
        Self { timing, store }
    }

    /// Insert the composing placeholder
    pub fn begin(&self, persona: Persona) -> StoreResult<MessageId> {
        self.store.append_pending(persona)
    }

    pub fn delay(&self) -> Duration {
        self.timing.typing_delay()
    }

    /// Resolve the placeholder; a stopped run drops the content
    pub fn finish(&self, id: &MessageId, content: impl Into<String>) -> StoreResult<Message> {
        self.store.resolve_pending(id, content)
    }
}
