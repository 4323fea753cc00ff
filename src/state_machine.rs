//! Turn scheduler state machine
//!
//! Elm-style: a pure `transition` maps state and event to a new state plus
//! effects, and the runtime executes the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Notice, NoticeLevel};
pub use event::Event;
pub use state::{ArenaContext, ArenaState, Cycle, RunId, StopReason, TurnPhase, TurnSnapshot};
pub use transition::{transition, TransitionError};
