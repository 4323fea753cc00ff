//! Effects produced by state transitions

use super::state::{Cycle, RunId, StopReason};
use crate::settings::{Credentials, PersonaPair};
use crate::store::{MessageId, Persona};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Short user-facing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Reset and begin the store, arm the run's cancellation and clock
    BeginRun {
        run: RunId,
        personas: PersonaPair,
        credentials: Credentials,
    },

    /// Stop the store and cancel every timer of the run
    EndRun { reason: StopReason },

    ScheduleOpening { delay: Duration },

    /// Arm the next continuation step
    ScheduleTurn { delay: Duration },

    /// Arm a randomly drawn pacing delay for `speaker`
    SchedulePacing { speaker: Persona },

    /// Run the generator; the opening gets an empty history
    Generate { speaker: Persona, cycle: Cycle },

    /// Insert the composing placeholder for `speaker`
    ShowPending { speaker: Persona },

    /// Arm a randomly drawn typing delay for placeholder `id`
    ScheduleTyping { id: MessageId },

    ResolvePending { id: MessageId, content: String },

    AppendUserMessage { text: String },

    Notify(Notice),

    /// Broadcast the new state to watchers
    PublishState,

    PublishElapsed { elapsed_secs: u64 },
}

impl Effect {
    pub fn notify_info(text: impl Into<String>) -> Self {
        Effect::Notify(Notice::info(text))
    }

    pub fn notify_warning(text: impl Into<String>) -> Self {
        Effect::Notify(Notice::warning(text))
    }
}
