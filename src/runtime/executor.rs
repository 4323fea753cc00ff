//! Arena runtime executor

use super::{ArenaEvent, ArenaHandle, Command, Envelope, Timer};
use crate::generator::ResponseGenerator;
use crate::llm::LlmService;
use crate::settings::{format_elapsed, Credentials, PersonaPair};
use crate::state_machine::{
    transition, ArenaContext, ArenaState, Cycle, Effect, Event, Notice, NoticeLevel, RunId,
    TransitionError, TurnPhase, TurnSnapshot,
};
use crate::store::{ConversationStore, Message, Persona, Sender};
use crate::typing::TypingSimulator;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

const MAILBOX_CAPACITY: usize = 64;
const BROADCAST_CAPACITY: usize = 256;

/// Resources that live exactly as long as one run
struct ActiveRun {
    run: RunId,
    personas: PersonaPair,
    credentials: Credentials,
    /// Cancels every timer, the clock, and pending generation results
    cancel: CancellationToken,
}

pub struct ArenaRuntime {
    context: ArenaContext,
    state: ArenaState,
    store: ConversationStore,
    generator: ResponseGenerator,
    typing: TypingSimulator,
    last_run: RunId,
    active: Option<ActiveRun>,
    rx: mpsc::Receiver<Envelope>,
    tx: mpsc::Sender<Envelope>,
    state_tx: watch::Sender<ArenaState>,
    broadcast_tx: broadcast::Sender<ArenaEvent>,
}

impl ArenaRuntime {
    /// Spawn the runtime actor and return a handle to it
    pub fn spawn(context: ArenaContext, llm: Arc<dyn LlmService>) -> ArenaHandle {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ArenaState::Idle);
        let store = ConversationStore::new();

        let runtime = Self {
            typing: TypingSimulator::new(context.timing.clone(), store.clone()),
            context,
            state: ArenaState::Idle,
            store: store.clone(),
            generator: ResponseGenerator::new(llm),
            last_run: RunId::default(),
            active: None,
            rx,
            tx: tx.clone(),
            state_tx,
            broadcast_tx: broadcast_tx.clone(),
        };
        tokio::spawn(runtime.run());

        ArenaHandle {
            tx,
            store,
            state_rx,
            broadcast_tx,
        }
    }

    async fn run(mut self) {
        tracing::info!("Starting arena runtime");

        while let Some(envelope) = self.rx.recv().await {
            self.handle(envelope);
        }

        tracing::info!("Arena runtime stopped");
    }

    fn handle(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Command { command, reply } => {
                let event = match command {
                    Command::Start(request) => {
                        self.last_run = self.last_run.next();
                        Event::Start {
                            run: self.last_run,
                            request,
                        }
                    }
                    Command::Stop => Event::Stop,
                    Command::UserMessage(text) => Event::UserMessage { text },
                };
                let result = self.process_event(event);
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "Command rejected");
                }
                // Caller may have given up waiting
                let _ = reply.send(result);
            }
            Envelope::Wake { run, timer } => {
                if self.current_run() != Some(run) {
                    tracing::debug!(run = %run, ?timer, "Dropping wake-up from stale run");
                    return;
                }
                let event = match timer {
                    Timer::Opening => Event::OpeningDue { run },
                    Timer::Turn => Event::TurnDue {
                        run,
                        snapshot: self.turn_snapshot(),
                    },
                    Timer::Pacing(speaker) => Event::PacingElapsed { run, speaker },
                    Timer::Typing(id) => Event::TypingElapsed { run, id },
                    Timer::Clock => Event::ClockTick {
                        run,
                        elapsed_secs: self.store.refresh_elapsed(),
                    },
                };
                self.process_internal(event);
            }
            Envelope::Internal(event) => self.process_internal(event),
        }
    }

    fn process_internal(&mut self, event: Event) {
        if let Err(e) = self.process_event(event) {
            tracing::error!(error = %e, "Error handling event");
            let _ = self.broadcast_tx.send(ArenaEvent::Error {
                message: e.to_string(),
            });
        }
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Effects may yield follow-up events; handle them in order
        let mut events_to_process = VecDeque::from([event]);

        while let Some(current_event) = events_to_process.pop_front() {
            let result = transition(&self.state, &self.context, current_event)?;
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect) {
                    events_to_process.push_back(generated_event);
                }
            }
        }

        Ok(())
    }

    fn current_run(&self) -> Option<RunId> {
        self.active.as_ref().map(|a| a.run)
    }

    fn turn_snapshot(&self) -> TurnSnapshot {
        let real = self.store.real_messages();
        TurnSnapshot {
            real_count: real.len(),
            last_persona: real.iter().rev().find_map(Message::persona),
        }
    }

    fn broadcast(&self, event: ArenaEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }

    /// Execute an effect and optionally return a follow-up event
    #[allow(clippy::too_many_lines)] // Effect handling is inherently complex
    fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::BeginRun {
                run,
                personas,
                credentials,
            } => {
                if let Some(previous) = self.active.take() {
                    previous.cancel.cancel();
                }
                self.store.reset();
                self.store.begin();

                let cancel = CancellationToken::new();
                self.spawn_clock(run, cancel.clone());
                self.active = Some(ActiveRun {
                    run,
                    personas,
                    credentials,
                    cancel,
                });

                tracing::info!(run = %run, "Run started");
                self.broadcast(ArenaEvent::Init {
                    snapshot: self.store.snapshot(),
                    state: self.state.clone(),
                });
                None
            }

            Effect::EndRun { reason } => {
                if let Some(active) = self.active.take() {
                    active.cancel.cancel();
                    tracing::info!(run = %active.run, ?reason, "Run ended");
                }
                for id in self.store.stop() {
                    self.broadcast(ArenaEvent::MessageRemoved { id });
                }
                self.broadcast(ArenaEvent::Stopped { reason });
                None
            }

            Effect::ScheduleOpening { delay } => {
                self.arm(Timer::Opening, delay);
                None
            }

            Effect::ScheduleTurn { delay } => {
                self.arm(Timer::Turn, delay);
                None
            }

            Effect::SchedulePacing { speaker } => {
                let delay = self.context.timing.pacing_delay();
                tracing::debug!(speaker = %speaker, delay_ms = %delay.as_millis(), "Pacing");
                self.arm(Timer::Pacing(speaker), delay);
                None
            }

            Effect::ScheduleTyping { id } => {
                let delay = self.typing.delay();
                self.arm(Timer::Typing(id), delay);
                None
            }

            Effect::Generate { speaker, cycle } => {
                self.spawn_generation(speaker, cycle);
                None
            }

            Effect::ShowPending { speaker } => {
                let run = self.current_run()?;
                match self.typing.begin(speaker) {
                    Ok(id) => {
                        if let Some(message) = self.store.message(&id) {
                            self.broadcast(ArenaEvent::Message {
                                message,
                                replaces: None,
                            });
                        }
                        Some(Event::PendingShown { run, id })
                    }
                    Err(e) => {
                        tracing::error!(speaker = %speaker, error = %e, "Failed to show placeholder");
                        self.broadcast(ArenaEvent::Notice {
                            notice: Notice {
                                level: NoticeLevel::Error,
                                text: format!("{speaker} could not start composing: {e}"),
                            },
                        });
                        None
                    }
                }
            }

            Effect::ResolvePending { id, content } => {
                let run = self.current_run()?;
                match self.typing.finish(&id, content) {
                    Ok(message) => {
                        self.broadcast(ArenaEvent::Message {
                            message,
                            replaces: Some(id),
                        });
                        Some(Event::MessageCommitted {
                            run,
                            real_count: self.store.real_count(),
                        })
                    }
                    Err(e) => {
                        tracing::debug!(id = %id, error = %e, "Dropped placeholder resolution");
                        None
                    }
                }
            }

            Effect::AppendUserMessage { text } => {
                let run = self.current_run()?;
                match self.store.append_final(Sender::Human, text) {
                    Ok(message) => {
                        self.broadcast(ArenaEvent::Message {
                            message,
                            replaces: None,
                        });
                        Some(Event::MessageCommitted {
                            run,
                            real_count: self.store.real_count(),
                        })
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to append user message");
                        None
                    }
                }
            }

            Effect::Notify(notice) => {
                tracing::info!(level = ?notice.level, text = %notice.text, "Notice");
                self.broadcast(ArenaEvent::Notice { notice });
                None
            }

            Effect::PublishState => {
                tracing::debug!(
                    running = self.state.is_running(),
                    speaker = ?self.state.phase().and_then(TurnPhase::active_speaker),
                    "Publishing state"
                );
                self.state_tx.send_replace(self.state.clone());
                self.broadcast(ArenaEvent::StateChange {
                    state: self.state.clone(),
                });
                None
            }

            Effect::PublishElapsed { elapsed_secs } => {
                self.broadcast(ArenaEvent::Elapsed {
                    elapsed_seconds: elapsed_secs,
                    display: format_elapsed(elapsed_secs),
                });
                None
            }
        }
    }

    /// Sleep for `delay`, then wake the actor, unless the run is cancelled first
    fn arm(&self, timer: Timer, delay: Duration) {
        let Some(active) = &self.active else {
            return;
        };
        let run = active.run;
        let cancel = active.cancel.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {}

                () = tokio::time::sleep(delay) => {
                    let _ = tx.send(Envelope::Wake { run, timer }).await;
                }
            }
        });
    }

    fn spawn_clock(&self, run: RunId, cancel: CancellationToken) {
        let period = self.context.timing.clock_tick;
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => break,

                    _ = interval.tick() => {
                        let wake = Envelope::Wake { run, timer: Timer::Clock };
                        if tx.send(wake).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Run the generator in the background; its result is dropped if the run ends first
    fn spawn_generation(&self, speaker: Persona, cycle: Cycle) {
        let (Some(active), Some(settings)) = (&self.active, self.state.settings()) else {
            return;
        };

        let history = match cycle {
            Cycle::Opening => Vec::new(),
            Cycle::Turn => self.store.real_messages(),
        };
        let run = active.run;
        let cancel = active.cancel.clone();
        let config = active.personas.get(speaker).clone();
        let credentials = active.credentials.clone();
        let settings = settings.clone();
        let generator = self.generator.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tracing::debug!(speaker = %speaker, ?cycle, "Generating (background)");
            let generation = generator
                .generate(speaker, &history, &settings, &config, &credentials)
                .await;

            if cancel.is_cancelled() {
                tracing::debug!(run = %run, speaker = %speaker, "Dropping generation for ended run");
                return;
            }

            let _ = tx
                .send(Envelope::Internal(Event::Generated {
                    run,
                    speaker,
                    content: generation.content,
                    fallback: generation.fallback,
                }))
                .await;
        });
    }
}
