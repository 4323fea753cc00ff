//! Events that drive the arena

use super::state::{RunId, TurnSnapshot};
use crate::settings::StartRequest;
use crate::store::{MessageId, Persona};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Caller events
    Start {
        run: RunId,
        request: Box<StartRequest>,
    },
    Stop,
    UserMessage {
        text: String,
    },

    // Timer events
    OpeningDue {
        run: RunId,
    },
    TurnDue {
        run: RunId,
        snapshot: TurnSnapshot,
    },
    PacingElapsed {
        run: RunId,
        speaker: Persona,
    },
    TypingElapsed {
        run: RunId,
        id: MessageId,
    },
    ClockTick {
        run: RunId,
        elapsed_secs: u64,
    },

    // Effect results
    Generated {
        run: RunId,
        speaker: Persona,
        content: String,
        fallback: Option<String>,
    },
    PendingShown {
        run: RunId,
        id: MessageId,
    },
    MessageCommitted {
        run: RunId,
        real_count: usize,
    },
}

impl Event {
    /// Run this event belongs to; `None` for caller events
    pub fn run(&self) -> Option<RunId> {
        match self {
            Event::Start { .. } | Event::Stop | Event::UserMessage { .. } => None,
            Event::OpeningDue { run }
            | Event::TurnDue { run, .. }
            | Event::PacingElapsed { run, .. }
            | Event::TypingElapsed { run, .. }
            | Event::ClockTick { run, .. }
            | Event::Generated { run, .. }
            | Event::PendingShown { run, .. }
            | Event::MessageCommitted { run, .. } => Some(*run),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::Stop => "stop",
            Event::UserMessage { .. } => "user_message",
            Event::OpeningDue { .. } => "opening_due",
            Event::TurnDue { .. } => "turn_due",
            Event::PacingElapsed { .. } => "pacing_elapsed",
            Event::TypingElapsed { .. } => "typing_elapsed",
            Event::ClockTick { .. } => "clock_tick",
            Event::Generated { .. } => "generated",
            Event::PendingShown { .. } => "pending_shown",
            Event::MessageCommitted { .. } => "message_committed",
        }
    }
}
