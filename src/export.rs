//! Plain-text transcript export

use crate::store::{Message, Sender};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Also export human interjections, labelled `Human`
    pub include_human: bool,
}

fn label(sender: Sender) -> &'static str {
    match sender.persona() {
        Some(persona) => persona.label(),
        None => "Human",
    }
}

/// Render real messages as `Label: content` blocks separated by a blank line
pub fn render_transcript(messages: &[Message], options: ExportOptions) -> String {
    messages
        .iter()
        .filter(|m| !m.pending)
        .filter(|m| options.include_human || m.sender != Sender::Human)
        .map(|m| format!("{}: {}", label(m.sender), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("ai-conversation-{}.txt", date.format("%Y-%m-%d"))
}
