//! Runtime for the arena
//!
//! One actor task owns the state machine and executes its effects. Callers
//! talk to it through an [`ArenaHandle`]; timers and generation tasks post
//! back into the same mailbox, tagged with the run they belong to.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ArenaRuntime;

use crate::export::{render_transcript, ExportOptions};
use crate::settings::StartRequest;
use crate::state_machine::{ArenaState, Event, Notice, RunId, StopReason, TransitionError};
use crate::store::{ConversationStore, Message, MessageId, Persona, StoreSnapshot};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Events sent to stream subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaEvent {
    Init {
        #[serde(flatten)]
        snapshot: StoreSnapshot,
        state: ArenaState,
    },
    Message {
        message: Message,
        /// Placeholder this message resolves
        #[serde(skip_serializing_if = "Option::is_none")]
        replaces: Option<MessageId>,
    },
    MessageRemoved {
        id: MessageId,
    },
    StateChange {
        state: ArenaState,
    },
    Elapsed {
        elapsed_seconds: u64,
        display: String,
    },
    Notice {
        #[serde(flatten)]
        notice: Notice,
    },
    Stopped {
        reason: StopReason,
    },
    Error {
        message: String,
    },
}

impl ArenaEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ArenaEvent::Init { .. } => "init",
            ArenaEvent::Message { .. } => "message",
            ArenaEvent::MessageRemoved { .. } => "message_removed",
            ArenaEvent::StateChange { .. } => "state_change",
            ArenaEvent::Elapsed { .. } => "elapsed",
            ArenaEvent::Notice { .. } => "notice",
            ArenaEvent::Stopped { .. } => "stopped",
            ArenaEvent::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Arena runtime is not available")]
    Unavailable,
}

/// Caller requests
#[derive(Debug)]
enum Command {
    Start(Box<StartRequest>),
    Stop,
    UserMessage(String),
}

/// Timers armed on behalf of a run
#[derive(Debug, Clone)]
enum Timer {
    Opening,
    Turn,
    Pacing(Persona),
    Typing(MessageId),
    Clock,
}

/// Mailbox entries for the runtime actor
#[derive(Debug)]
enum Envelope {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<(), TransitionError>>,
    },
    Wake {
        run: RunId,
        timer: Timer,
    },
    Internal(Event),
}

/// Handle to the arena runtime
#[derive(Clone)]
pub struct ArenaHandle {
    tx: mpsc::Sender<Envelope>,
    store: ConversationStore,
    state_rx: watch::Receiver<ArenaState>,
    broadcast_tx: broadcast::Sender<ArenaEvent>,
}

impl ArenaHandle {
    async fn command(&self, command: Command) -> Result<(), ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope::Command { command, reply })
            .await
            .map_err(|_| ArenaError::Unavailable)?;
        rx.await.map_err(|_| ArenaError::Unavailable)??;
        Ok(())
    }

    /// Begin a new run. Refused while one is running, or when real
    /// generation is requested without a key; nothing changes then.
    pub async fn start(&self, request: StartRequest) -> Result<(), ArenaError> {
        self.command(Command::Start(Box::new(request))).await
    }

    /// Stop the current run. Returns `false` when nothing was running.
    pub async fn stop(&self) -> Result<bool, ArenaError> {
        match self.command(Command::Stop).await {
            Ok(()) => Ok(true),
            Err(ArenaError::Rejected(TransitionError::NotRunning)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn submit_user_message(&self, text: impl Into<String>) -> Result<(), ArenaError> {
        self.command(Command::UserMessage(text.into())).await
    }

    pub fn state(&self) -> ArenaState {
        self.state_rx.borrow().clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    pub fn messages_from(&self, persona: Persona) -> Vec<Message> {
        self.store.messages_from(persona)
    }

    pub fn export(&self, options: ExportOptions) -> String {
        render_transcript(&self.store.real_messages(), options)
    }

    /// Event describing the full current view, sent first to new subscribers
    pub fn init_event(&self) -> ArenaEvent {
        ArenaEvent::Init {
            snapshot: self.store.snapshot(),
            state: self.state(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ArenaEvent> {
        self.broadcast_tx.subscribe()
    }
}
