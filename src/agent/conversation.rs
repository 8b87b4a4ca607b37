//! Conversation assembly: persona prompt plus a trimmed history window.

use serde::{Deserialize, Serialize};

use super::llm::ChatMessage;

/// Only the most recent turns are replayed to the model; older context is
/// dropped rather than summarized.
const HISTORY_LIMIT: usize = 6;

pub const SYSTEM_PROMPT: &str = "You are DOLMA, a friendly and intelligent personal assistant. \
Always respond helpfully and conversationally, even for repeated questions. \
You can manage the user's Google Calendar and personal goals through tools. \
Before any calendar or goal change, gather the details, show the preview the tool \
returns, and only call the tool again with confirm=true once the user explicitly agrees.";

/// One prior turn as the frontend sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: String,
    #[serde(default)]
    pub text: String,
}

/// Build the message list for a chat turn: persona, the last few
/// user/assistant turns, then the new user message.
pub fn build_messages(history: &[TurnMessage], user_message: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];

    let trimmed: Vec<&TurnMessage> = history
        .iter()
        .filter(|m| m.role == "user" || m.role == "assistant")
        .collect();
    let skip = trimmed.len().saturating_sub(HISTORY_LIMIT);
    for turn in trimmed.into_iter().skip(skip) {
        messages.push(ChatMessage {
            role: turn.role.clone(),
            content: Some(turn.text.clone()),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    messages.push(ChatMessage::user(user_message));
    messages
}
