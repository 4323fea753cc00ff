//! Message and sender types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two automated speakers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    #[serde(alias = "ai-x")]
    PersonaA,
    #[serde(alias = "ai-gpt")]
    PersonaB,
}

impl Persona {
    pub const ALL: [Persona; 2] = [Persona::PersonaA, Persona::PersonaB];

    /// The persona that speaks after this one
    pub fn other(self) -> Self {
        match self {
            Persona::PersonaA => Persona::PersonaB,
            Persona::PersonaB => Persona::PersonaA,
        }
    }

    /// Display label used in the UI and in exported transcripts
    pub fn label(self) -> &'static str {
        match self {
            Persona::PersonaA => "AI-X",
            Persona::PersonaB => "AI-GPT",
        }
    }

    pub fn tagline(self) -> &'static str {
        match self {
            Persona::PersonaA => "Social Intelligence",
            Persona::PersonaB => "Reasoning Engine",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    PersonaA,
    PersonaB,
    Human,
}

impl Sender {
    /// The persona behind this sender, `None` for the human
    pub fn persona(self) -> Option<Persona> {
        match self {
            Sender::PersonaA => Some(Persona::PersonaA),
            Sender::PersonaB => Some(Persona::PersonaB),
            Sender::Human => None,
        }
    }
}

impl From<Persona> for Sender {
    fn from(persona: Persona) -> Self {
        match persona {
            Persona::PersonaA => Sender::PersonaA,
            Persona::PersonaB => Sender::PersonaB,
        }
    }
}

/// Opaque message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A message in the timeline.
///
/// `pending` messages are "composing" placeholders with empty content; they
/// never count as real messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub pending: bool,
}

impl Message {
    pub fn pending(persona: Persona) -> Self {
        Self {
            id: MessageId::new(),
            content: String::new(),
            sender: persona.into(),
            created_at: Utc::now(),
            pending: true,
        }
    }

    pub fn final_message(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
            sender,
            created_at: Utc::now(),
            pending: false,
        }
    }

    pub fn persona(&self) -> Option<Persona> {
        self.sender.persona()
    }
}
