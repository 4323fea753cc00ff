//! Chat arena - two AI personas in conversation
//!
//! A Rust backend driving a turn-taking state machine between two
//! personas, with an HTTP and SSE surface for the browser.

mod api;
mod config;
mod export;
mod generator;
mod llm;
mod runtime;
mod settings;
mod state_machine;
mod store;
mod typing;

use api::{create_router, AppState};
use config::{ServerConfig, TurnTiming};
use llm::{LlmConfig, LoggingService, OpenAIService};
use runtime::ArenaRuntime;
use state_machine::ArenaContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_arena=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let server_config = ServerConfig::from_env();
    let llm_config = LlmConfig::from_env();
    tracing::info!(endpoint = %llm_config.endpoint(), "LLM endpoint configured");

    let openai = OpenAIService::new(&llm_config)?;
    let llm = Arc::new(LoggingService::new(Arc::new(openai)));

    // Start the arena actor
    let arena = ArenaRuntime::spawn(ArenaContext::new(TurnTiming::default()), llm);
    let state = AppState::new(arena);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Chat arena listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
