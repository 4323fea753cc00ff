//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same new
//! state and effects. Delays that need randomness are drawn by the runtime.

use super::effect::Effect;
use super::event::Event;
use super::state::{ArenaContext, ArenaState, Cycle, RunId, StopReason, TurnPhase, TurnSnapshot};
use crate::settings::{ConversationSettings, StartRequest};
use crate::store::{MessageId, Persona};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ArenaState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ArenaState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// State unchanged, nothing to do
    pub fn unchanged(state: &ArenaState) -> Self {
        Self::new(state.clone())
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A conversation is already running")]
    AlreadyRunning,
    #[error("No conversation is running")]
    NotRunning,
    #[error("An OpenAI API key is required for real generation")]
    MissingCredential,
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)] // One arm per state and event pair
pub fn transition(
    state: &ArenaState,
    context: &ArenaContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    // Run-scoped events from a stopped or superseded run are dropped
    if let Some(event_run) = event.run() {
        if state.run() != Some(event_run) {
            return Ok(TransitionResult::unchanged(state));
        }
    }

    match (state, event) {
        // ============================================================
        // Start / stop
        // ============================================================
        (ArenaState::Idle, Event::Start { run, request }) => start(context, run, *request),

        (ArenaState::Running { .. }, Event::Start { .. }) => Err(TransitionError::AlreadyRunning),

        (ArenaState::Running { .. }, Event::Stop) => Ok(stop(StopReason::Manual)),

        (ArenaState::Idle, Event::Stop | Event::UserMessage { .. }) => {
            Err(TransitionError::NotRunning)
        }

        // ============================================================
        // Human interjection: appended, never redirects a turn
        // ============================================================
        (ArenaState::Running { .. }, Event::UserMessage { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            Ok(TransitionResult::unchanged(state).with_effect(Effect::AppendUserMessage { text }))
        }

        // ============================================================
        // Generation cycle
        // ============================================================
        (
            ArenaState::Running {
                settings,
                phase: TurnPhase::AwaitingOpening,
                ..
            },
            Event::OpeningDue { .. },
        ) => {
            let speaker = settings.first_speaker;
            Ok(generating(state, speaker, Cycle::Opening))
        }

        (
            ArenaState::Running {
                settings, phase, ..
            },
            Event::TurnDue { snapshot, .. },
        ) => turn_due(state, context, settings, phase, snapshot),

        (
            ArenaState::Running {
                phase: TurnPhase::Pacing { speaker },
                ..
            },
            Event::PacingElapsed {
                speaker: elapsed, ..
            },
        ) if *speaker == elapsed => Ok(generating(state, elapsed, Cycle::Turn)),

        (
            ArenaState::Running {
                opening_prompt,
                phase: TurnPhase::Generating { speaker, cycle },
                ..
            },
            Event::Generated {
                speaker: generated_by,
                content: text,
                fallback,
                ..
            },
        ) if *speaker == generated_by => Ok(generated(
            state,
            opening_prompt,
            *speaker,
            *cycle,
            text,
            fallback,
        )),

        (
            ArenaState::Running {
                phase:
                    TurnPhase::Typing {
                        speaker,
                        cycle,
                        pending_id: None,
                        content: text,
                    },
                ..
            },
            Event::PendingShown { id, .. },
        ) => Ok(TransitionResult::new(state.with_phase(TurnPhase::Typing {
            speaker: *speaker,
            cycle: *cycle,
            pending_id: Some(id.clone()),
            content: text.clone(),
        }))
        .with_effect(Effect::ScheduleTyping { id })),

        (
            ArenaState::Running {
                phase:
                    TurnPhase::Typing {
                        cycle,
                        pending_id: Some(pending),
                        content: text,
                        ..
                    },
                ..
            },
            Event::TypingElapsed { id, .. },
        ) if *pending == id => Ok(resolved(state, context, *cycle, id, text.clone())),

        // ============================================================
        // Stop conditions
        // ============================================================
        (ArenaState::Running { settings, .. }, Event::MessageCommitted { real_count, .. }) => {
            Ok(committed(state, settings, real_count))
        }

        (ArenaState::Running { settings, .. }, Event::ClockTick { elapsed_secs, .. }) => {
            Ok(clock_tick(state, settings, elapsed_secs))
        }

        // ============================================================
        // Everything else doesn't fit the current phase
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} not valid in {}",
            event.name(),
            describe(state)
        ))),
    }
}

fn start(
    context: &ArenaContext,
    run: RunId,
    request: StartRequest,
) -> Result<TransitionResult, TransitionError> {
    request
        .settings
        .validate()
        .map_err(TransitionError::InvalidSettings)?;

    let personas = request.personas();
    personas
        .validate()
        .map_err(TransitionError::InvalidSettings)?;

    if request.settings.use_real_generation && !request.credentials.has_openai_key() {
        return Err(TransitionError::MissingCredential);
    }

    let topic = request.settings.resolve_topic(request.topic.as_deref());
    let opening_prompt = request.settings.starter.opening_prompt(&topic);
    let notice = format!(
        "{} started: {}",
        request.settings.starter.title(),
        opening_prompt
    );

    Ok(TransitionResult::new(ArenaState::Running {
        run,
        settings: request.settings,
        opening_prompt,
        phase: TurnPhase::AwaitingOpening,
    })
    .with_effect(Effect::BeginRun {
        run,
        personas,
        credentials: request.credentials,
    })
    .with_effect(Effect::ScheduleOpening {
        delay: context.timing.opening_delay,
    })
    .with_effect(Effect::ScheduleTurn {
        delay: context.timing.initial_delay,
    })
    .with_effect(Effect::notify_info(notice))
    .with_effect(Effect::PublishState))
}

fn stop(reason: StopReason) -> TransitionResult {
    TransitionResult::new(ArenaState::Idle)
        .with_effect(Effect::EndRun { reason })
        .with_effect(Effect::notify_info(reason.describe()))
        .with_effect(Effect::PublishState)
}

fn generating(state: &ArenaState, speaker: Persona, cycle: Cycle) -> TransitionResult {
    TransitionResult::new(state.with_phase(TurnPhase::Generating { speaker, cycle }))
        .with_effect(Effect::Generate { speaker, cycle })
        .with_effect(Effect::PublishState)
}

fn turn_due(
    state: &ArenaState,
    context: &ArenaContext,
    settings: &ConversationSettings,
    phase: &TurnPhase,
    snapshot: TurnSnapshot,
) -> Result<TransitionResult, TransitionError> {
    if settings.message_limit_reached(snapshot.real_count) {
        return Ok(stop(StopReason::MessageCount));
    }

    let repoll = Effect::ScheduleTurn {
        delay: context.timing.repoll_delay,
    };

    if phase.opening_in_flight() {
        return Ok(TransitionResult::unchanged(state).with_effect(repoll));
    }

    match phase {
        TurnPhase::Waiting if snapshot.real_count == 0 => {
            Ok(TransitionResult::unchanged(state).with_effect(repoll))
        }
        TurnPhase::Waiting => {
            let speaker = snapshot
                .last_persona
                .map_or(settings.first_speaker, Persona::other);
            Ok(
                TransitionResult::new(state.with_phase(TurnPhase::Pacing { speaker }))
                    .with_effect(Effect::SchedulePacing { speaker })
                    .with_effect(Effect::PublishState),
            )
        }
        _ => Err(TransitionError::InvalidTransition(format!(
            "turn_due while a turn is in flight ({})",
            describe(state)
        ))),
    }
}

fn generated(
    state: &ArenaState,
    opening_prompt: &str,
    speaker: Persona,
    cycle: Cycle,
    text: String,
    fallback: Option<String>,
) -> TransitionResult {
    let text = if text.trim().is_empty() && cycle == Cycle::Opening {
        opening_prompt.to_string()
    } else {
        text
    };

    let mut result = TransitionResult::new(state.with_phase(TurnPhase::Typing {
        speaker,
        cycle,
        pending_id: None,
        content: text,
    }))
    .with_effect(Effect::ShowPending { speaker });

    if let Some(reason) = fallback {
        result = result.with_effect(Effect::notify_warning(format!(
            "Failed to get {speaker} response, using fallback: {reason}"
        )));
    }
    result.with_effect(Effect::PublishState)
}

fn committed(
    state: &ArenaState,
    settings: &ConversationSettings,
    real_count: usize,
) -> TransitionResult {
    if settings.message_limit_reached(real_count) {
        stop(StopReason::MessageCount)
    } else {
        TransitionResult::unchanged(state)
    }
}

fn clock_tick(
    state: &ArenaState,
    settings: &ConversationSettings,
    elapsed_secs: u64,
) -> TransitionResult {
    let publish = Effect::PublishElapsed { elapsed_secs };
    if settings.time_limit_reached(elapsed_secs) {
        stop(StopReason::ElapsedTime).with_effects([publish])
    } else {
        TransitionResult::unchanged(state).with_effect(publish)
    }
}

fn resolved(
    state: &ArenaState,
    context: &ArenaContext,
    cycle: Cycle,
    id: MessageId,
    text: String,
) -> TransitionResult {
    let result = TransitionResult::new(state.with_phase(TurnPhase::Waiting))
        .with_effect(Effect::ResolvePending { id, content: text });

    // The opening does not arm a follow-up; the initial continuation timer
    // is already counting.
    let result = match cycle {
        Cycle::Turn => result.with_effect(Effect::ScheduleTurn {
            delay: context.timing.follow_up_delay,
        }),
        Cycle::Opening => result,
    };
    result.with_effect(Effect::PublishState)
}

fn describe(state: &ArenaState) -> String {
    match state {
        ArenaState::Idle => "idle".to_string(),
        ArenaState::Running { phase, .. } => match phase {
            TurnPhase::AwaitingOpening => "awaiting_opening".to_string(),
            TurnPhase::Waiting => "waiting".to_string(),
            TurnPhase::Pacing { speaker } => format!("pacing({speaker})"),
            TurnPhase::Generating { speaker, .. } => format!("generating({speaker})"),
            TurnPhase::Typing { speaker, .. } => format!("typing({speaker})"),
        },
    }
}
