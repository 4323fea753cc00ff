//! Arena state types

use crate::config::TurnTiming;
use crate::settings::ConversationSettings;
use crate::store::{MessageId, Persona};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one run; every run-scoped event carries it
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which chain a generation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cycle {
    /// The one-off opening utterance
    Opening,
    /// A continuation step
    Turn,
}

/// Where the current run is in its generate/compose loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TurnPhase {
    /// Opening timer armed, nothing generated yet
    AwaitingOpening,
    /// No cycle in flight; the next continuation step is armed
    Waiting,
    /// Thinking pause before `speaker` generates
    Pacing { speaker: Persona },
    Generating { speaker: Persona, cycle: Cycle },
    /// Placeholder shown (once `pending_id` is known), content held back
    Typing {
        speaker: Persona,
        cycle: Cycle,
        pending_id: Option<MessageId>,
        #[serde(skip_serializing, default)]
        content: String,
    },
}

impl TurnPhase {
    /// The opening utterance has not landed yet
    pub fn opening_in_flight(&self) -> bool {
        matches!(
            self,
            TurnPhase::AwaitingOpening
                | TurnPhase::Generating {
                    cycle: Cycle::Opening,
                    ..
                }
                | TurnPhase::Typing {
                    cycle: Cycle::Opening,
                    ..
                }
        )
    }

    /// Persona currently thinking, generating or composing
    pub fn active_speaker(&self) -> Option<Persona> {
        match self {
            TurnPhase::Pacing { speaker }
            | TurnPhase::Generating { speaker, .. }
            | TurnPhase::Typing { speaker, .. } => Some(*speaker),
            TurnPhase::AwaitingOpening | TurnPhase::Waiting => None,
        }
    }
}

/// Arena state
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaState {
    /// No run. Messages of a stopped run stay visible until the next start.
    #[default]
    Idle,

    Running {
        run: RunId,
        settings: ConversationSettings,
        opening_prompt: String,
        #[serde(flatten)]
        phase: TurnPhase,
    },
}

impl ArenaState {
    pub fn is_running(&self) -> bool {
        matches!(self, ArenaState::Running { .. })
    }

    pub fn run(&self) -> Option<RunId> {
        match self {
            ArenaState::Running { run, .. } => Some(*run),
            ArenaState::Idle => None,
        }
    }

    pub fn phase(&self) -> Option<&TurnPhase> {
        match self {
            ArenaState::Running { phase, .. } => Some(phase),
            ArenaState::Idle => None,
        }
    }

    pub fn settings(&self) -> Option<&ConversationSettings> {
        match self {
            ArenaState::Running { settings, .. } => Some(settings),
            ArenaState::Idle => None,
        }
    }

    /// Copy of this running state in a new phase
    #[must_use]
    pub fn with_phase(&self, phase: TurnPhase) -> Self {
        match self {
            ArenaState::Running {
                run,
                settings,
                opening_prompt,
                ..
            } => ArenaState::Running {
                run: *run,
                settings: settings.clone(),
                opening_prompt: opening_prompt.clone(),
                phase,
            },
            ArenaState::Idle => ArenaState::Idle,
        }
    }
}

/// Static inputs to transitions
#[derive(Debug, Clone, Default)]
pub struct ArenaContext {
    pub timing: TurnTiming,
}

impl ArenaContext {
    pub fn new(timing: TurnTiming) -> Self {
        Self { timing }
    }
}

/// Store view taken when a continuation step fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnSnapshot {
    pub real_count: usize,
    /// Sender of the latest real persona message; human messages don't count
    pub last_persona: Option<Persona>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Manual,
    MessageCount,
    ElapsedTime,
}

impl StopReason {
    pub fn describe(self) -> &'static str {
        match self {
            StopReason::Manual => "Conversation stopped",
            StopReason::MessageCount => "Conversation stopped: message limit reached",
            StopReason::ElapsedTime => "Conversation stopped: time limit reached",
        }
    }
}
