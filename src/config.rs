//! Server configuration and turn timing

use rand::Rng;
use std::ops::Range;
use std::time::Duration;

/// Server settings read from the environment at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("ARENA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);
        Self { port }
    }
}

/// Delays that pace a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTiming {
    /// From start until the opening generation
    pub opening_delay: Duration,
    /// From start until the first continuation step
    pub initial_delay: Duration,
    /// Retry interval while there is nothing to respond to yet
    pub repoll_delay: Duration,
    /// "Thinking" pause before a persona generates, in milliseconds
    pub pacing_ms: Range<u64>,
    /// "Composing" pause before a placeholder resolves, in milliseconds
    pub typing_ms: Range<u64>,
    /// From a resolution until the next continuation step
    pub follow_up_delay: Duration,
    pub clock_tick: Duration,
}

impl Default for TurnTiming {
    fn default() -> Self {
        Self {
            opening_delay: Duration::from_secs(1),
            initial_delay: Duration::from_secs(4),
            repoll_delay: Duration::from_secs(2),
            pacing_ms: 3000..7000,
            typing_ms: 1500..3500,
            follow_up_delay: Duration::from_secs(1),
            clock_tick: Duration::from_secs(1),
        }
    }
}

impl TurnTiming {
    pub fn pacing_delay(&self) -> Duration {
        draw(&self.pacing_ms)
    }

    pub fn typing_delay(&self) -> Duration {
        draw(&self.typing_ms)
    }
}

fn draw(range: &Range<u64>) -> Duration {
    if range.is_empty() {
        return Duration::from_millis(range.start);
    }
    Duration::from_millis(rand::thread_rng().gen_range(range.clone()))
}
