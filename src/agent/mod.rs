//! Assistant core: chat turn handling, tool dispatch, and the
//! preview/confirm protocol for calendar and goal mutations.

pub mod conversation;
pub mod dispatch;
pub mod events;
pub mod goals;
pub mod llm;
pub mod resolve;
pub mod tools;

pub use conversation::TurnMessage;
pub use dispatch::{Dispatcher, SessionState};

use thiserror::Error;
use tracing::warn;

use crate::calendar::CalendarError;
use crate::goals::GoalError;
use crate::types::{Reply, ReplyItem};

use llm::{ChatClient, ChatMessage};

/// Errors produced by tool handlers. Every variant is recovered at the
/// dispatch boundary and turned into a user-facing reply; none of them
/// crash the request.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Missing or malformed argument; the message is the clarifying
    /// question shown to the user.
    #[error("{0}")]
    InvalidInput(String),
    /// Unknown goal or event; carries a description of what was searched.
    #[error("couldn't find {0}")]
    NotFound(String),
    /// Multiple goal matches; carries "title (shortid)" candidates.
    #[error("ambiguous reference ({} candidates)", .0.len())]
    Ambiguous(Vec<String>),
    #[error("upstream call failed: {0}")]
    UpstreamUnavailable(String),
    #[error("calendar is not connected")]
    NotConnected,
}

impl From<GoalError> for HandlerError {
    fn from(err: GoalError) -> Self {
        match err {
            GoalError::InvalidInput(msg) => HandlerError::InvalidInput(msg),
            GoalError::NotFound(id) => HandlerError::NotFound(format!("a goal with id '{}'", id)),
            GoalError::InvalidStatus(status) => HandlerError::InvalidInput(format!(
                "'{}' isn't a valid goal status. Use active, completed, or archived.",
                status
            )),
            GoalError::Io(e) => HandlerError::UpstreamUnavailable(e.to_string()),
            GoalError::Serialization(e) => HandlerError::UpstreamUnavailable(e.to_string()),
        }
    }
}

impl From<CalendarError> for HandlerError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::NotConnected | CalendarError::Token(_) => HandlerError::NotConnected,
            other => HandlerError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Turn a handler error into the outward reply.
pub fn error_reply(err: &HandlerError) -> Reply {
    match err {
        HandlerError::InvalidInput(question) => Reply::text(question.clone()),
        HandlerError::NotFound(what) => {
            Reply::text(format!("I couldn't find {}. Could you clarify?", what))
        }
        HandlerError::Ambiguous(candidates) => {
            let listing: Vec<String> = candidates.iter().map(|c| format!("- {}", c)).collect();
            let items = candidates
                .iter()
                .map(|c| ReplyItem::new("Goal", c.clone()))
                .collect();
            Reply {
                reply: "I found a few goals matching that. Which one did you mean?".to_string(),
                reply_md: Some(listing.join("\n")),
                items: Some(items),
                ..Reply::default()
            }
        }
        HandlerError::UpstreamUnavailable(detail) => {
            warn!(detail = %detail, "upstream failure surfaced to user");
            Reply::text("Sorry, something went wrong on my end. Please try again in a moment.")
        }
        HandlerError::NotConnected => Reply::text(
            "Your Google Calendar isn't connected yet. Connect it from the app settings, then ask me again.",
        ),
    }
}

/// Replies so short the model almost certainly stalled; the turn is re-run
/// once with a nudge to elaborate.
fn is_minimal_reply(text: &str) -> bool {
    matches!(text.trim(), "" | "..." | "\u{2026}" | "Ok" | "Okay")
}

/// The assistant: one chat-completion call per turn, tool calls routed
/// through the dispatcher, plain text otherwise.
pub struct Assistant {
    llm: ChatClient,
    dispatcher: Dispatcher,
    model: String,
    regen_model: String,
    max_tokens: u32,
}

impl Assistant {
    pub fn new(
        llm: ChatClient,
        dispatcher: Dispatcher,
        model: impl Into<String>,
        regen_model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            llm,
            dispatcher,
            model: model.into(),
            regen_model: regen_model.into(),
            max_tokens: max_tokens.max(1),
        }
    }

    /// Handle one inbound chat turn. Never fails; upstream problems become
    /// apologetic replies.
    pub async fn handle_turn(
        &self,
        message: &str,
        history: &[TurnMessage],
        session: &mut SessionState,
    ) -> Reply {
        let messages = conversation::build_messages(history, message);

        let completion = match self
            .llm
            .complete_with_tools(
                &self.model,
                messages.clone(),
                tools::assistant_tools(),
                Some(self.max_tokens),
            )
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                return error_reply(&HandlerError::UpstreamUnavailable(e.to_string()));
            }
        };

        if completion.has_tool_calls() {
            if let Some(reply) = self
                .dispatcher
                .dispatch(&completion.tool_calls, session)
                .await
            {
                return reply;
            }
        }

        let mut reply_text = completion.content_text();
        if is_minimal_reply(&reply_text) {
            // One retry with a nudge; a second stall falls through to the
            // generic apology below.
            let mut retry = messages;
            retry.push(ChatMessage::user("Please elaborate."));
            if let Ok(regenerated) = self
                .llm
                .complete(&self.regen_model, retry, Some(self.max_tokens))
                .await
            {
                if !is_minimal_reply(&regenerated) {
                    reply_text = regenerated;
                }
            }
        }
        if is_minimal_reply(&reply_text) {
            reply_text =
                "Sorry, I don't have a good answer for that one. Could you rephrase?".to_string();
        }
        Reply::text(reply_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_reply_detection() {
        assert!(is_minimal_reply(""));
        assert!(is_minimal_reply("   "));
        assert!(is_minimal_reply("..."));
        assert!(is_minimal_reply("Okay"));
        assert!(!is_minimal_reply("Sure, done."));
    }

    #[test]
    fn test_error_reply_not_found() {
        let reply = error_reply(&HandlerError::NotFound("a goal matching 'gym'".to_string()));
        assert!(reply.reply.contains("couldn't find a goal matching 'gym'"));
    }

    #[test]
    fn test_error_reply_ambiguous_lists_candidates() {
        let reply = error_reply(&HandlerError::Ambiguous(vec![
            "Read 12 books (abc12345)".to_string(),
            "Read more often (def67890)".to_string(),
        ]));
        let md = reply.reply_md.unwrap();
        assert!(md.contains("Read 12 books (abc12345)"));
        assert!(md.contains("Read more often (def67890)"));
        assert_eq!(reply.items.unwrap().len(), 2);
    }

    #[test]
    fn test_goal_error_mapping() {
        let err: HandlerError = GoalError::InvalidStatus("paused".to_string()).into();
        assert!(matches!(err, HandlerError::InvalidInput(_)));

        let err: HandlerError = GoalError::NotFound("xyz".to_string()).into();
        assert!(matches!(err, HandlerError::NotFound(_)));
    }

    #[test]
    fn test_calendar_error_mapping() {
        let err: HandlerError = CalendarError::NotConnected.into();
        assert!(matches!(err, HandlerError::NotConnected));

        let err: HandlerError = CalendarError::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, HandlerError::UpstreamUnavailable(_)));
    }
}
