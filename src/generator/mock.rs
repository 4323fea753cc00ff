//! Canned phrases used when real generation is off or fails

use crate::store::Persona;
use rand::seq::SliceRandom;

/// Replaced with the lower-cased text of the latest real message
pub const CONTEXT_SLOT: &str = "{context}";

const PERSONA_A_PHRASES: &[&str] = &[
    "Interesting perspective! From my analysis of social trends, I'd argue that {context} represents a fundamental shift in how we approach modern problems.",
    "That's a fascinating point. Based on real-time data I'm seeing, there's actually a growing movement that suggests the opposite might be true.",
    "I appreciate the nuance in your argument. However, looking at current conversations online, most people seem to be leaning toward a more balanced approach.",
    "You raise valid concerns. What's intriguing is how this topic has evolved in public discourse over the past few months - the sentiment has shifted dramatically.",
    "That's quite thought-provoking! From what I'm observing in social media patterns, this issue touches on deeper philosophical questions about human nature.",
];

const PERSONA_B_PHRASES: &[&str] = &[
    "That's a compelling argument! I find myself drawn to the complexity of this issue. Perhaps we could explore the underlying assumptions that shape our perspectives here.",
    "Your point resonates with some fascinating philosophical frameworks. It reminds me of the tension between utilitarian and deontological approaches to ethics.",
    "I'm intrigued by the implications of your reasoning. This seems to connect to broader questions about progress, tradition, and how we define value in society.",
    "There's something beautifully paradoxical about this topic. On one hand, logic suggests one approach, but human experience often tells a different story.",
    "Your perspective opens up interesting questions about the nature of truth and consensus. How do we balance individual agency with collective wisdom?",
];

pub fn phrases(persona: Persona) -> &'static [&'static str] {
    match persona {
        Persona::PersonaA => PERSONA_A_PHRASES,
        Persona::PersonaB => PERSONA_B_PHRASES,
    }
}

/// Fill the context slot of a phrase
pub fn render(phrase: &str, context: &str) -> String {
    phrase.replace(CONTEXT_SLOT, &context.to_lowercase())
}

/// Uniformly random canned reply for `persona`
pub fn mock_response(persona: Persona, context: &str) -> String {
    let table = phrases(persona);
    let phrase = table
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(table[0]);
    render(phrase, context)
}
