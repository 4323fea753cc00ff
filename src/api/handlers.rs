//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ArenaResponse, ErrorResponse, ExportQuery, PersonaInfo, PresetsResponse, StartResponse,
    StarterInfo, StopResponse, UserMessageRequest, UserMessageResponse,
};
use super::AppState;
use crate::export::{export_file_name, render_transcript, ExportOptions};
use crate::runtime::ArenaError;
use crate::settings::{
    ConversationSettings, PersonaConfig, StartRequest, Starter, MODEL_CHOICES, PRESET_TOPICS,
    ROLEPLAY_SCENARIOS,
};
use crate::state_machine::TransitionError;
use crate::store::Persona;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Arena view and controls
        .route("/api/arena", get(get_arena))
        .route("/api/arena/start", post(start_arena))
        .route("/api/arena/stop", post(stop_arena))
        .route("/api/arena/messages", post(post_message))
        // SSE streaming
        .route("/api/arena/stream", get(stream_arena))
        .route("/api/arena/export", get(export_arena))
        // Settings panel data
        .route("/api/presets", get(get_presets))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Arena
// ============================================================

async fn get_arena(State(state): State<AppState>) -> Json<ArenaResponse> {
    Json(ArenaResponse {
        snapshot: state.arena.snapshot(),
        state: state.arena.state(),
    })
}

async fn start_arena(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, AppError> {
    tracing::info!(
        starter = ?req.settings.starter,
        real = req.settings.use_real_generation,
        "Start requested"
    );
    state.arena.start(req).await?;
    Ok(Json(StartResponse { started: true }))
}

async fn stop_arena(State(state): State<AppState>) -> Result<Json<StopResponse>, AppError> {
    let stopped = state.arena.stop().await?;
    Ok(Json(StopResponse { stopped }))
}

async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<UserMessageRequest>,
) -> Result<Json<UserMessageResponse>, AppError> {
    state.arena.submit_user_message(req.text).await?;
    Ok(Json(UserMessageResponse { accepted: true }))
}

async fn stream_arena(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before taking the snapshot so nothing falls in between
    let broadcast_rx = state.arena.subscribe();
    let init_event = state.arena.init_event();
    sse_stream(init_event, broadcast_rx)
}

async fn export_arena(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> impl IntoResponse {
    let options = ExportOptions {
        include_human: query.include_human,
    };
    let transcript = match query.persona {
        Some(persona) => render_transcript(&state.arena.messages_from(persona), options),
        None => state.arena.export(options),
    };
    let file_name = export_file_name(chrono::Utc::now().date_naive());

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        transcript,
    )
}

// ============================================================
// Presets
// ============================================================

async fn get_presets() -> Json<PresetsResponse> {
    Json(PresetsResponse {
        topics: PRESET_TOPICS.iter().map(ToString::to_string).collect(),
        roleplay_scenarios: ROLEPLAY_SCENARIOS.iter().map(ToString::to_string).collect(),
        starters: Starter::ALL
            .into_iter()
            .map(|s| StarterInfo {
                id: s,
                title: s.title().to_string(),
            })
            .collect(),
        models: MODEL_CHOICES.iter().map(ToString::to_string).collect(),
        personas: Persona::ALL
            .into_iter()
            .map(|p| PersonaInfo {
                id: p,
                label: p.label().to_string(),
                tagline: p.tagline().to_string(),
                defaults: PersonaConfig::default_for(p),
            })
            .collect(),
        default_settings: ConversationSettings::default(),
    })
}

async fn get_version() -> &'static str {
    concat!("chat-arena ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    /// Real generation requested without a key
    CredentialsRequired(String),
    Unavailable(String),
}

impl From<ArenaError> for AppError {
    fn from(e: ArenaError) -> Self {
        let message = e.to_string();
        match e {
            ArenaError::Rejected(TransitionError::MissingCredential) => {
                AppError::CredentialsRequired(message)
            }
            ArenaError::Rejected(
                TransitionError::AlreadyRunning
                | TransitionError::NotRunning
                | TransitionError::InvalidTransition(_),
            ) => AppError::Conflict(message),
            ArenaError::Rejected(
                TransitionError::EmptyMessage | TransitionError::InvalidSettings(_),
            ) => AppError::BadRequest(message),
            ArenaError::Unavailable => AppError::Unavailable(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            AppError::CredentialsRequired(msg) => (
                StatusCode::PRECONDITION_FAILED,
                ErrorResponse::reprompt(msg),
            ),
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorResponse::new(msg))
            }
        };

        (status, Json(body)).into_response()
    }
}
