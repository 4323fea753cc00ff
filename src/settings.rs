//! Conversation settings, persona configuration and presets

use crate::store::Persona;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topics offered by the UI; the first is the default
pub const PRESET_TOPICS: &[&str] = &[
    "Is pineapple on pizza acceptable?",
    "Will AI replace human creativity?",
    "Is social media good for society?",
    "Should we colonize Mars?",
    "Is remote work better than office work?",
    "Are video games art?",
    "Is privacy dead in the digital age?",
    "Should college be free?",
];

pub const ROLEPLAY_SCENARIOS: &[&str] = &[
    "Detective and suspect in a locked-room mystery",
    "Startup founder pitching to a skeptical investor",
    "Two astronauts stranded on a distant moon",
    "Time traveler meeting their younger self",
    "Chef and food critic on opening night",
];

/// Model choices the UI offers; any model id is accepted
pub const MODEL_CHOICES: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"];

/// How the conversation opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Starter {
    #[default]
    Topic,
    Freestyle,
    Roleplay,
    Story,
    Questions,
    Thinktank,
}

impl Starter {
    pub const ALL: [Starter; 6] = [
        Starter::Topic,
        Starter::Freestyle,
        Starter::Roleplay,
        Starter::Story,
        Starter::Questions,
        Starter::Thinktank,
    ];

    /// Opening line for this starter kind
    pub fn opening_prompt(self, topic: &str) -> String {
        match self {
            Starter::Topic => format!("Let's discuss: {topic}"),
            Starter::Freestyle => "Hello there! What's on your mind today?".to_string(),
            Starter::Roleplay => {
                "I'll be playing the role we discussed. What's your character's opening move?"
                    .to_string()
            }
            Starter::Story => "Once upon a time, in a world not so different from ours...".to_string(),
            Starter::Questions => "I have a curious question for you: What's the most important decision you've ever had to make?".to_string(),
            Starter::Thinktank => format!("Let's discuss: {topic}. What are your initial thoughts?"),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Starter::Topic => "Topic Debate",
            Starter::Freestyle => "Freestyle Chat",
            Starter::Roleplay => "Role Playing",
            Starter::Story => "Story Building",
            Starter::Questions => "Question Tennis",
            Starter::Thinktank => "Thinktank Mode",
        }
    }
}

/// Rule that ends an active run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    #[default]
    Manual,
    #[serde(alias = "messages")]
    MessageCount,
    #[serde(alias = "time")]
    ElapsedTime,
}

/// Settings for one run; immutable while it is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    pub starter: Starter,
    pub stop_condition: StopCondition,
    pub message_limit: u32,
    pub time_limit_minutes: u32,
    pub topic: Option<String>,
    pub first_speaker: Persona,
    pub use_real_generation: bool,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            starter: Starter::Topic,
            stop_condition: StopCondition::Manual,
            message_limit: 20,
            time_limit_minutes: 10,
            topic: Some(PRESET_TOPICS[0].to_string()),
            first_speaker: Persona::PersonaA,
            use_real_generation: false,
        }
    }
}

impl ConversationSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.message_limit == 0 {
            return Err("message_limit must be greater than zero".to_string());
        }
        if self.time_limit_minutes == 0 {
            return Err("time_limit_minutes must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Topic for the opening prompt: custom text, then settings, then the default preset
    pub fn resolve_topic(&self, custom: Option<&str>) -> String {
        custom
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| self.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()))
            .unwrap_or(PRESET_TOPICS[0])
            .to_string()
    }

    pub fn message_limit_reached(&self, real_count: usize) -> bool {
        self.stop_condition == StopCondition::MessageCount
            && real_count >= self.message_limit as usize
    }

    pub fn time_limit_reached(&self, elapsed_seconds: u64) -> bool {
        self.stop_condition == StopCondition::ElapsedTime
            && elapsed_seconds >= u64::from(self.time_limit_minutes) * 60
    }
}

/// Model parameters for one persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub model_id: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl PersonaConfig {
    pub fn default_for(persona: Persona) -> Self {
        match persona {
            Persona::PersonaA => Self {
                model_id: "gpt-4o-mini".to_string(),
                system_prompt: "You are AI-X, a social intelligence AI that analyzes trends, social media patterns, and public discourse. You have a dynamic, data-driven personality and often reference current social trends and online conversations.".to_string(),
                temperature: 0.8,
                max_output_tokens: 200,
            },
            Persona::PersonaB => Self {
                model_id: "gpt-4o".to_string(),
                system_prompt: "You are AI-GPT, a reasoning engine that approaches problems with deep philosophical thinking. You enjoy exploring the complexity of ideas, ethical frameworks, and connecting topics to broader questions about human nature and society.".to_string(),
                temperature: 0.7,
                max_output_tokens: 200,
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model_id.trim().is_empty() {
            return Err("model_id must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            ));
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Configuration for both personas of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaPair {
    pub persona_a: PersonaConfig,
    pub persona_b: PersonaConfig,
}

impl Default for PersonaPair {
    fn default() -> Self {
        Self {
            persona_a: PersonaConfig::default_for(Persona::PersonaA),
            persona_b: PersonaConfig::default_for(Persona::PersonaB),
        }
    }
}

impl PersonaPair {
    pub fn get(&self, persona: Persona) -> &PersonaConfig {
        match persona {
            Persona::PersonaA => &self.persona_a,
            Persona::PersonaB => &self.persona_b,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for persona in Persona::ALL {
            self.get(persona)
                .validate()
                .map_err(|e| format!("{}: {e}", persona.label()))?;
        }
        Ok(())
    }
}

/// API keys supplied by the presentation layer
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub openai_key: String,
    /// Accepted for forward compatibility; not used by any provider yet
    pub x_api_key: String,
}

impl Credentials {
    #[cfg(test)]
    pub fn openai(key: impl Into<String>) -> Self {
        Self {
            openai_key: key.into(),
            x_api_key: String::new(),
        }
    }

    pub fn has_openai_key(&self) -> bool {
        !self.openai_key.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_key", &redact(&self.openai_key))
            .field("x_api_key", &redact(&self.x_api_key))
            .finish()
    }
}

/// Everything needed to begin a run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    pub settings: ConversationSettings,
    /// Custom topic; overrides `settings.topic` when non-blank
    pub topic: Option<String>,
    pub credentials: Credentials,
    pub persona_a: Option<PersonaConfig>,
    pub persona_b: Option<PersonaConfig>,
}

impl StartRequest {
    pub fn personas(&self) -> PersonaPair {
        PersonaPair {
            persona_a: self
                .persona_a
                .clone()
                .unwrap_or_else(|| PersonaConfig::default_for(Persona::PersonaA)),
            persona_b: self
                .persona_b
                .clone()
                .unwrap_or_else(|| PersonaConfig::default_for(Persona::PersonaB)),
        }
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// Elapsed run time as `m:ss`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
