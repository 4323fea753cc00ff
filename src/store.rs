//! Conversation state store
//!
//! The authoritative, ordered message timeline plus the run flags. All
//! mutation goes through the operations below; readers get cloned snapshots.

mod message;

pub use message::{Message, MessageId, Persona, Sender};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::time::Instant;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conversation is not active")]
    Inactive,
    #[error("{0} already has a pending message")]
    AlreadyPending(Persona),
    #[error("No pending message with id {0}")]
    UnknownPending(MessageId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Whole seconds elapsed since `start` on the monotonic clock
pub fn elapsed_seconds_since(start: Instant) -> u64 {
    Instant::now().saturating_duration_since(start).as_secs()
}

/// Point-in-time view of the store for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub messages: Vec<Message>,
    pub active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
}

#[derive(Debug, Default)]
struct Inner {
    messages: Vec<Message>,
    active: bool,
    started_at: Option<DateTime<Utc>>,
    started_instant: Option<Instant>,
    elapsed_seconds: u64,
}

/// Shared handle to the conversation store
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    inner: Arc<Mutex<Inner>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear messages and run state. Only called when a new run starts.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.messages.clear();
        inner.active = false;
        inner.started_at = None;
        inner.started_instant = None;
        inner.elapsed_seconds = 0;
    }

    /// Mark the run active and record its start time
    pub fn begin(&self) {
        let mut inner = self.lock();
        inner.active = true;
        inner.started_at = Some(Utc::now());
        inner.started_instant = Some(Instant::now());
        inner.elapsed_seconds = 0;
    }

    /// End the run. Messages stay until the next reset; placeholders go.
    pub fn stop(&self) -> Vec<MessageId> {
        let mut inner = self.lock();
        inner.active = false;
        inner.started_at = None;
        inner.started_instant = None;

        let dropped: Vec<MessageId> = inner
            .messages
            .iter()
            .filter(|m| m.pending)
            .map(|m| m.id.clone())
            .collect();
        inner.messages.retain(|m| !m.pending);
        dropped
    }

    /// Insert a composing placeholder for `persona` and return its id
    pub fn append_pending(&self, persona: Persona) -> StoreResult<MessageId> {
        let mut inner = self.lock();
        if !inner.active {
            return Err(StoreError::Inactive);
        }
        let sender = Sender::from(persona);
        if inner.messages.iter().any(|m| m.pending && m.sender == sender) {
            return Err(StoreError::AlreadyPending(persona));
        }
        let msg = Message::pending(persona);
        let id = msg.id.clone();
        inner.messages.push(msg);
        Ok(id)
    }

    /// Replace the placeholder `id` with a final message.
    ///
    /// Fails without touching the timeline when the placeholder is gone or
    /// the run is no longer active. Callers treat both as a dropped result.
    pub fn resolve_pending(
        &self,
        id: &MessageId,
        content: impl Into<String>,
    ) -> StoreResult<Message> {
        let mut inner = self.lock();
        if !inner.active {
            return Err(StoreError::Inactive);
        }
        let index = inner
            .messages
            .iter()
            .position(|m| m.pending && &m.id == id)
            .ok_or_else(|| StoreError::UnknownPending(id.clone()))?;
        let placeholder = inner.messages.remove(index);

        // Timestamped at resolution, not at placeholder creation
        let msg = Message::final_message(placeholder.sender, content);
        inner.messages.push(msg.clone());
        Ok(msg)
    }

    /// Insert a final message directly, with no pending phase
    pub fn append_final(&self, sender: Sender, content: impl Into<String>) -> StoreResult<Message> {
        let mut inner = self.lock();
        if !inner.active {
            return Err(StoreError::Inactive);
        }
        let msg = Message::final_message(sender, content);
        inner.messages.push(msg.clone());
        Ok(msg)
    }

    /// All non-pending messages in chronological order
    pub fn real_messages(&self) -> Vec<Message> {
        self.lock()
            .messages
            .iter()
            .filter(|m| !m.pending)
            .cloned()
            .collect()
    }

    /// Real messages authored by one persona
    pub fn messages_from(&self, persona: Persona) -> Vec<Message> {
        let sender = Sender::from(persona);
        self.lock()
            .messages
            .iter()
            .filter(|m| !m.pending && m.sender == sender)
            .cloned()
            .collect()
    }

    pub fn real_count(&self) -> usize {
        self.lock().messages.iter().filter(|m| !m.pending).count()
    }

    pub fn message(&self, id: &MessageId) -> Option<Message> {
        self.lock().messages.iter().find(|m| &m.id == id).cloned()
    }

    /// Recompute `elapsed_seconds` from the run's start instant
    pub fn refresh_elapsed(&self) -> u64 {
        let mut inner = self.lock();
        if let Some(start) = inner.started_instant {
            inner.elapsed_seconds = elapsed_seconds_since(start);
        }
        inner.elapsed_seconds
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.lock();
        StoreSnapshot {
            messages: inner.messages.clone(),
            active: inner.active,
            started_at: inner.started_at,
            elapsed_seconds: inner.elapsed_seconds,
        }
    }
}

#[cfg(test)]
impl ConversationStore {
    /// Every message, placeholders included
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.lock().elapsed_seconds
    }
}
