//! API request and response types

use crate::settings::{ConversationSettings, PersonaConfig, Starter};
use crate::state_machine::ArenaState;
use crate::store::{Persona, StoreSnapshot};
use serde::{Deserialize, Serialize};

/// Current arena view
#[derive(Debug, Serialize)]
pub struct ArenaResponse {
    #[serde(flatten)]
    pub snapshot: StoreSnapshot,
    pub state: ArenaState,
}

/// Response for start action
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub started: bool,
}

/// Response for stop action
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Request to interject a human message
#[derive(Debug, Deserialize)]
pub struct UserMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct UserMessageResponse {
    pub accepted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub include_human: bool,
    /// Restrict the transcript to one persona
    pub persona: Option<Persona>,
}

/// One selectable starter kind
#[derive(Debug, Serialize)]
pub struct StarterInfo {
    pub id: Starter,
    pub title: String,
}

/// Display metadata and default config for a persona
#[derive(Debug, Serialize)]
pub struct PersonaInfo {
    pub id: Persona,
    pub label: String,
    pub tagline: String,
    pub defaults: PersonaConfig,
}

/// Everything the settings panel needs
#[derive(Debug, Serialize)]
pub struct PresetsResponse {
    pub topics: Vec<String>,
    pub roleplay_scenarios: Vec<String>,
    pub starters: Vec<StarterInfo>,
    pub models: Vec<String>,
    pub personas: Vec<PersonaInfo>,
    pub default_settings: ConversationSettings,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Set when the caller should ask for credentials again
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reprompt_credentials: bool,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            reprompt_credentials: false,
        }
    }

    pub fn reprompt(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            reprompt_credentials: true,
        }
    }
}
