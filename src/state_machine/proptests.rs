//! Property-based tests for the state machine
//!
//! A small in-memory driver plays the runtime's part: it executes effects
//! against a real store and fires armed timers in an arbitrary order. The
//! invariants must hold at every step.

use super::*;
use crate::generator::mock_response;
use crate::settings::{ConversationSettings, StartRequest, Starter, StopCondition};
use crate::store::{ConversationStore, MessageId, Persona, Sender};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_persona() -> impl Strategy<Value = Persona> {
    prop_oneof![Just(Persona::PersonaA), Just(Persona::PersonaB)]
}

fn arb_starter() -> impl Strategy<Value = Starter> {
    proptest::sample::select(Starter::ALL.to_vec())
}

fn arb_stop_condition() -> impl Strategy<Value = StopCondition> {
    prop_oneof![
        Just(StopCondition::Manual),
        Just(StopCondition::MessageCount),
        Just(StopCondition::ElapsedTime),
    ]
}

fn arb_settings() -> impl Strategy<Value = ConversationSettings> {
    (
        arb_starter(),
        arb_stop_condition(),
        1u32..12,
        1u32..3,
        arb_persona(),
    )
        .prop_map(
            |(starter, stop_condition, message_limit, time_limit_minutes, first_speaker)| {
                ConversationSettings {
                    starter,
                    stop_condition,
                    message_limit,
                    time_limit_minutes,
                    first_speaker,
                    ..Default::default()
                }
            },
        )
}

#[derive(Debug, Clone)]
enum Action {
    /// Fire the armed timer or pending result at this index (modulo count)
    Fire(usize),
    User(String),
    /// Advance the elapsed clock by this many seconds
    Tick(u64),
    Stop,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        8 => any::<usize>().prop_map(Action::Fire),
        2 => "[a-z ]{0,12}".prop_map(Action::User),
        1 => (1u64..40).prop_map(Action::Tick),
        1 => Just(Action::Stop),
    ]
}

// ============================================================================
// Driver
// ============================================================================

#[derive(Debug, Clone)]
enum Armed {
    Opening,
    Turn,
    Pacing(Persona),
    Typing(MessageId),
    Generated(Persona, String),
}

struct Driver {
    state: ArenaState,
    context: ArenaContext,
    store: ConversationStore,
    armed: Vec<Armed>,
    run: RunId,
    elapsed: u64,
    invalid: Vec<TransitionError>,
}

impl Driver {
    fn start(settings: ConversationSettings) -> Self {
        let mut driver = Self {
            state: ArenaState::Idle,
            context: ArenaContext::default(),
            store: ConversationStore::new(),
            armed: Vec::new(),
            run: RunId(1),
            elapsed: 0,
            invalid: Vec::new(),
        };
        driver.apply(Event::Start {
            run: driver.run,
            request: Box::new(StartRequest {
                settings,
                ..Default::default()
            }),
        });
        driver
    }

    fn snapshot(&self) -> TurnSnapshot {
        let real = self.store.real_messages();
        TurnSnapshot {
            real_count: real.len(),
            last_persona: real.iter().rev().find_map(|m| m.persona()),
        }
    }

    fn apply(&mut self, event: Event) {
        let mut queue = std::collections::VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            match transition(&self.state, &self.context, event) {
                Ok(result) => {
                    self.state = result.new_state;
                    for effect in result.effects {
                        if let Some(next) = self.execute(effect) {
                            queue.push_back(next);
                        }
                    }
                }
                Err(e) => self.invalid.push(e),
            }
        }
    }

    fn execute(&mut self, effect: Effect) -> Option<Event> {
        let run = self.run;
        match effect {
            Effect::BeginRun { .. } => {
                self.store.reset();
                self.store.begin();
                self.armed.clear();
                None
            }
            Effect::EndRun { .. } => {
                self.store.stop();
                self.armed.clear();
                None
            }
            Effect::ScheduleOpening { .. } => {
                self.armed.push(Armed::Opening);
                None
            }
            Effect::ScheduleTurn { .. } => {
                self.armed.push(Armed::Turn);
                None
            }
            Effect::SchedulePacing { speaker } => {
                self.armed.push(Armed::Pacing(speaker));
                None
            }
            Effect::Generate { speaker, cycle } => {
                let context = match cycle {
                    Cycle::Opening => String::new(),
                    Cycle::Turn => self
                        .store
                        .real_messages()
                        .last()
                        .map(|m| m.content.clone())
                        .unwrap_or_default(),
                };
                self.armed
                    .push(Armed::Generated(speaker, mock_response(speaker, &context)));
                None
            }
            Effect::ShowPending { speaker } => {
                let id = self
                    .store
                    .append_pending(speaker)
                    .expect("placeholder insert must succeed while running");
                Some(Event::PendingShown { run, id })
            }
            Effect::ScheduleTyping { id } => {
                self.armed.push(Armed::Typing(id));
                None
            }
            Effect::ResolvePending { id, content } => {
                self.store.resolve_pending(&id, content).ok()?;
                Some(Event::MessageCommitted {
                    run,
                    real_count: self.store.real_count(),
                })
            }
            Effect::AppendUserMessage { text } => {
                self.store.append_final(Sender::Human, text).ok()?;
                Some(Event::MessageCommitted {
                    run,
                    real_count: self.store.real_count(),
                })
            }
            Effect::Notify(_) | Effect::PublishState | Effect::PublishElapsed { .. } => None,
        }
    }

    fn step(&mut self, action: Action) {
        let run = self.run;
        match action {
            Action::Fire(index) => {
                if self.armed.is_empty() {
                    return;
                }
                let armed = self.armed.remove(index % self.armed.len());
                let event = match armed {
                    Armed::Opening => Event::OpeningDue { run },
                    Armed::Turn => Event::TurnDue {
                        run,
                        snapshot: self.snapshot(),
                    },
                    Armed::Pacing(speaker) => Event::PacingElapsed { run, speaker },
                    Armed::Typing(id) => Event::TypingElapsed { run, id },
                    Armed::Generated(speaker, content) => Event::Generated {
                        run,
                        speaker,
                        content,
                        fallback: None,
                    },
                };
                self.apply(event);
            }
            Action::User(text) => {
                self.apply(Event::UserMessage { text });
            }
            Action::Tick(secs) => {
                self.elapsed += secs;
                self.apply(Event::ClockTick {
                    run,
                    elapsed_secs: self.elapsed,
                });
            }
            Action::Stop => self.apply(Event::Stop),
        }
    }
}

fn persona_senders(store: &ConversationStore) -> Vec<Persona> {
    store
        .real_messages()
        .iter()
        .filter_map(|m| m.persona())
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Persona messages alternate, whatever the timer order and interjections
    #[test]
    fn prop_personas_alternate(
        settings in arb_settings(),
        actions in proptest::collection::vec(arb_action(), 0..150),
    ) {
        let first = settings.first_speaker;
        let mut driver = Driver::start(settings);
        for action in actions {
            driver.step(action);
            let senders = persona_senders(&driver.store);
            if let Some(head) = senders.first() {
                prop_assert_eq!(*head, first);
            }
            for pair in senders.windows(2) {
                prop_assert_ne!(pair[0], pair[1]);
            }
        }
    }

    /// Never more than one placeholder per persona, and only one cycle at a time
    #[test]
    fn prop_single_pending_per_persona(
        settings in arb_settings(),
        actions in proptest::collection::vec(arb_action(), 0..150),
    ) {
        let mut driver = Driver::start(settings);
        for action in actions {
            driver.step(action);
            let messages = driver.store.messages();
            for persona in Persona::ALL {
                let pending = messages
                    .iter()
                    .filter(|m| m.pending && m.persona() == Some(persona))
                    .count();
                prop_assert!(pending <= 1);
            }
            let total_pending = messages.iter().filter(|m| m.pending).count();
            prop_assert!(total_pending <= 1);

            let turn_timers = driver.armed.iter().filter(|a| matches!(a, Armed::Turn)).count();
            prop_assert!(turn_timers <= 1);
        }
    }

    /// The message limit stops the run at the first count that reaches it
    #[test]
    fn prop_message_limit_is_exact(
        limit in 1u32..10,
        first in arb_persona(),
        actions in proptest::collection::vec(arb_action(), 0..200),
    ) {
        let settings = ConversationSettings {
            stop_condition: StopCondition::MessageCount,
            message_limit: limit,
            first_speaker: first,
            ..Default::default()
        };
        let mut driver = Driver::start(settings);
        let mut stopped_at = None;

        for action in actions {
            let was_running = driver.state.is_running();
            driver.step(action);
            let count = driver.store.real_count();

            if count >= limit as usize {
                prop_assert!(!driver.state.is_running());
            }
            if was_running && !driver.state.is_running() && stopped_at.is_none() {
                stopped_at = Some(count);
            }
            if let Some(at) = stopped_at {
                prop_assert_eq!(count, at);
            }
        }
        if let Some(at) = stopped_at {
            prop_assert!(at <= limit as usize);
        }
    }

    /// Once stopped, nothing lands and nothing stays armed
    #[test]
    fn prop_stop_is_final(
        settings in arb_settings(),
        before in proptest::collection::vec(arb_action(), 0..60),
        after in proptest::collection::vec(arb_action(), 0..60),
    ) {
        let mut driver = Driver::start(settings);
        for action in before {
            driver.step(action);
        }
        driver.step(Action::Stop);

        prop_assert_eq!(&driver.state, &ArenaState::Idle);
        prop_assert!(driver.armed.is_empty());
        prop_assert!(!driver.store.is_active());
        let frozen = driver.store.real_messages();

        for action in after {
            if matches!(action, Action::Stop) {
                continue;
            }
            driver.step(action);
            prop_assert_eq!(driver.store.real_messages(), frozen.clone());
            prop_assert!(driver.store.messages().iter().all(|m| !m.pending));
        }
    }

    /// The scheduler's own timers never produce invalid transitions
    #[test]
    fn prop_no_invalid_transitions_from_timers(
        settings in arb_settings(),
        actions in proptest::collection::vec(arb_action(), 0..150),
    ) {
        let mut driver = Driver::start(settings);
        for action in actions {
            driver.step(action);
        }
        for err in &driver.invalid {
            prop_assert!(
                matches!(
                    err,
                    TransitionError::NotRunning | TransitionError::EmptyMessage
                ),
                "unexpected error: {err}"
            );
        }
    }

    /// Stale events from another run never change state
    #[test]
    fn prop_stale_run_ignored(
        settings in arb_settings(),
        speaker in arb_persona(),
        secs in 0u64..10_000,
    ) {
        let driver = Driver::start(settings);
        let stale = RunId(driver.run.0 + 7);
        for event in [
            Event::OpeningDue { run: stale },
            Event::PacingElapsed { run: stale, speaker },
            Event::ClockTick { run: stale, elapsed_secs: secs },
            Event::MessageCommitted { run: stale, real_count: 1_000 },
        ] {
            let result = transition(&driver.state, &driver.context, event).unwrap();
            prop_assert_eq!(&result.new_state, &driver.state);
            prop_assert!(result.effects.is_empty());
        }
    }
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_pineapple_first_cycle_in_timer_order() {
    let settings = ConversationSettings {
        starter: Starter::Topic,
        topic: Some("Is pineapple on pizza acceptable?".to_string()),
        first_speaker: Persona::PersonaA,
        ..Default::default()
    };
    let mut driver = Driver::start(settings);

    // Opening fires, generates, shows a placeholder, resolves
    driver.step(Action::Fire(0)); // opening timer
    let generated = driver
        .armed
        .iter()
        .position(|a| matches!(a, Armed::Generated(..)))
        .unwrap();
    driver.step(Action::Fire(generated));
    let typing = driver
        .armed
        .iter()
        .position(|a| matches!(a, Armed::Typing(_)))
        .unwrap();
    driver.step(Action::Fire(typing));
    assert_eq!(driver.store.real_count(), 1);

    // Initial continuation, pacing, generation, typing
    for _ in 0..4 {
        assert_eq!(driver.armed.len(), 1);
        driver.step(Action::Fire(0));
    }

    assert_eq!(
        persona_senders(&driver.store),
        vec![Persona::PersonaA, Persona::PersonaB]
    );
    assert!(driver.invalid.is_empty());
}
