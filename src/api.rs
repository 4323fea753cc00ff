//! HTTP API for the arena

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::ArenaHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub arena: ArenaHandle,
}

impl AppState {
    pub fn new(arena: ArenaHandle) -> Self {
        Self { arena }
    }
}
