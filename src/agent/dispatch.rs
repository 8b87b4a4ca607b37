//! Tool-call routing.
//!
//! Each tool call from the model is parsed into a typed argument variant
//! and dispatched to exactly one handler. At most one handler produces a
//! reply per turn; the first one that does wins, and the caller falls back
//! to the plain chat reply when none did.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::calendar::{CalendarGateway, Reminder};
use crate::goals::GoalStore;
use crate::timefmt::TimeFormatter;
use crate::types::Reply;

use super::llm::ToolCall;
use super::error_reply;

pub(crate) const CLARIFY_REPLY: &str =
    "I didn't quite catch the details of that request. Could you rephrase it?";

/// Per-conversation state owned by the caller. Holds the pending event
/// drafts between a create preview and its confirm turn; nothing here is
/// persisted.
#[derive(Debug, Default)]
pub struct SessionState {
    pub pending_events: Option<Vec<crate::calendar::EventDraft>>,
}

/// A number that may arrive as a JSON number or a numeric string,
/// depending on the model.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Numberish {
    Num(f64),
    Text(String),
}

impl Numberish {
    /// Best-effort conversion; empty or unparseable text yields None.
    pub fn coerce(&self) -> Option<f64> {
        match self {
            Numberish::Num(n) => Some(*n),
            Numberish::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse().ok()
                }
            }
        }
    }
}

/// One item of a multi-event create payload; validated into an
/// [`crate::calendar::EventDraft`] by the handler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventDraftArgs {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateEventArgs {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub attendees: Option<Vec<String>>,
    pub recurrence: Option<Vec<String>>,
    pub reminders: Option<Vec<Reminder>>,
    /// Batch form; when present it supersedes the top-level single-event
    /// fields.
    pub events: Option<Vec<EventDraftArgs>>,
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FindEventsArgs {
    pub query: Option<String>,
    pub timeframe: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateEventArgs {
    pub query: Option<String>,
    pub timeframe: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteEventArgs {
    pub query: Option<String>,
    pub timeframe: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateGoalArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<String>,
    pub target_value: Option<Numberish>,
    pub target_unit: Option<String>,
    pub target_period: Option<String>,
    pub progress_value: Option<Numberish>,
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateGoalArgs {
    pub goal_id: Option<String>,
    pub goal_title: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<String>,
    pub target_value: Option<Numberish>,
    pub target_unit: Option<String>,
    pub target_period: Option<String>,
    pub progress: Option<Numberish>,
    pub progress_value: Option<Numberish>,
    pub status: Option<String>,
    pub note: Option<String>,
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListGoalsArgs {
    pub status: Option<String>,
}

/// Typed arguments, one variant per tool in the fixed set.
#[derive(Debug)]
pub enum ToolArgs {
    CreateEvent(CreateEventArgs),
    FindEvents(FindEventsArgs),
    UpdateEvent(UpdateEventArgs),
    DeleteEvent(DeleteEventArgs),
    CreateGoal(CreateGoalArgs),
    UpdateGoal(UpdateGoalArgs),
    ListGoals(ListGoalsArgs),
}

impl ToolArgs {
    /// Parse a tool call's declared arguments. Returns `Ok(None)` for tool
    /// names outside the fixed set; `Err` means the arguments were not a
    /// valid JSON object of the expected shape.
    pub fn parse(name: &str, arguments: &str) -> Result<Option<Self>, serde_json::Error> {
        use serde::de::Error as _;

        let raw = arguments.trim();
        let value: Value = if raw.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw)?
        };
        if !value.is_object() {
            return Err(serde_json::Error::custom("tool arguments must be an object"));
        }

        let parsed = match name {
            "create_event" => ToolArgs::CreateEvent(serde_json::from_value(value)?),
            "find_events" => ToolArgs::FindEvents(serde_json::from_value(value)?),
            "update_event" => ToolArgs::UpdateEvent(serde_json::from_value(value)?),
            "delete_event" => ToolArgs::DeleteEvent(serde_json::from_value(value)?),
            "create_goal" => ToolArgs::CreateGoal(serde_json::from_value(value)?),
            "update_goal" => ToolArgs::UpdateGoal(serde_json::from_value(value)?),
            "list_goals" => ToolArgs::ListGoals(serde_json::from_value(value)?),
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }

    /// Whether this tool needs the calendar connection check.
    pub fn touches_calendar(&self) -> bool {
        matches!(
            self,
            ToolArgs::CreateEvent(_)
                | ToolArgs::FindEvents(_)
                | ToolArgs::UpdateEvent(_)
                | ToolArgs::DeleteEvent(_)
        )
    }
}

/// Routes parsed tool calls to their handlers. Handlers live in
/// [`super::events`] and [`super::goals`].
pub struct Dispatcher {
    pub(crate) gateway: Arc<dyn CalendarGateway>,
    pub(crate) goals: Arc<GoalStore>,
    pub(crate) fmt: TimeFormatter,
    pub(crate) max_results: u32,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn CalendarGateway>,
        goals: Arc<GoalStore>,
        fmt: TimeFormatter,
        max_results: u32,
    ) -> Self {
        Self {
            gateway,
            goals,
            fmt,
            max_results: max_results.max(1),
        }
    }

    /// Walk the turn's tool calls in order and return the first reply one
    /// of them produces. `None` means no recognized tool call fired and the
    /// caller should use the plain chat reply.
    pub async fn dispatch(
        &self,
        calls: &[ToolCall],
        session: &mut SessionState,
    ) -> Option<Reply> {
        for call in calls {
            let name = call.function.name.as_str();
            let args = match ToolArgs::parse(name, &call.function.arguments) {
                Ok(Some(args)) => args,
                Ok(None) => {
                    debug!(tool = name, "skipping unrecognized tool call");
                    continue;
                }
                Err(e) => {
                    warn!(tool = name, error = %e, "malformed tool arguments");
                    return Some(Reply::text(CLARIFY_REPLY));
                }
            };

            if args.touches_calendar() && !self.gateway.is_connected().await {
                return Some(error_reply(&super::HandlerError::NotConnected));
            }

            debug!(tool = name, "dispatching tool call");
            let result = match args {
                ToolArgs::CreateEvent(args) => self.handle_create_event(args, session).await,
                ToolArgs::FindEvents(args) => self.handle_find_events(args).await,
                ToolArgs::UpdateEvent(args) => self.handle_update_event(args).await,
                ToolArgs::DeleteEvent(args) => self.handle_delete_event(args).await,
                ToolArgs::CreateGoal(args) => self.handle_create_goal(args).await,
                ToolArgs::UpdateGoal(args) => self.handle_update_goal(args).await,
                ToolArgs::ListGoals(args) => self.handle_list_goals(args).await,
            };
            return Some(result.unwrap_or_else(|e| error_reply(&e)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unknown_tool_is_none() {
        assert!(ToolArgs::parse("send_rocket", "{}").unwrap().is_none());
    }

    #[test]
    fn test_parse_empty_arguments_as_object() {
        let parsed = ToolArgs::parse("list_goals", "").unwrap().unwrap();
        assert!(matches!(parsed, ToolArgs::ListGoals(_)));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(ToolArgs::parse("list_goals", "[1, 2]").is_err());
        assert!(ToolArgs::parse("list_goals", "not json").is_err());
    }

    #[test]
    fn test_parse_create_goal_with_string_numbers() {
        let parsed = ToolArgs::parse(
            "create_goal",
            r#"{"title": "Read 12 books", "target_value": "12", "progress_value": 3}"#,
        )
        .unwrap()
        .unwrap();
        let ToolArgs::CreateGoal(args) = parsed else {
            panic!("wrong variant");
        };
        assert_eq!(args.target_value.unwrap().coerce(), Some(12.0));
        assert_eq!(args.progress_value.unwrap().coerce(), Some(3.0));
        assert!(!args.confirm);
    }

    #[test]
    fn test_numberish_coercion() {
        assert_eq!(Numberish::Num(2.5).coerce(), Some(2.5));
        assert_eq!(Numberish::Text(" 7 ".to_string()).coerce(), Some(7.0));
        assert_eq!(Numberish::Text("".to_string()).coerce(), None);
        assert_eq!(Numberish::Text("seven".to_string()).coerce(), None);
    }

    #[test]
    fn test_touches_calendar() {
        let event = ToolArgs::parse("delete_event", "{}").unwrap().unwrap();
        assert!(event.touches_calendar());
        let goal = ToolArgs::parse("list_goals", "{}").unwrap().unwrap();
        assert!(!goal.touches_calendar());
    }
}
