//! Tool definitions exposed to the model.
//!
//! Every mutating tool carries a `confirm` boolean; the model is told to
//! call with `confirm=true` only after the user has seen a preview and
//! explicitly agreed.

use serde_json::json;

use super::llm::ToolDefinition;

/// The fixed set of tools offered on every chat turn.
pub fn assistant_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            "create_event",
            "Create one or more Google Calendar events. Ask the user for missing \
             details, show a preview, and only call with confirm=true after they agree.",
            json!({
                "type": "object",
                "properties": {
                    "summary": {"type": "string", "description": "Event title"},
                    "description": {"type": "string"},
                    "start_time": {
                        "type": "string",
                        "description": "ISO8601 datetime with timezone and year (RFC3339). MUST include year and offset, e.g. 2025-11-22T14:00:00+11:00"
                    },
                    "end_time": {
                        "type": "string",
                        "description": "ISO8601 datetime with timezone and year (RFC3339). MUST include year and offset, e.g. 2025-11-22T16:00:00+11:00"
                    },
                    "location": {"type": "string"},
                    "attendees": {"type": "array", "items": {"type": "string"}, "description": "Emails"},
                    "recurrence": {"type": "array", "items": {"type": "string"}, "description": "e.g. ['RRULE:FREQ=WEEKLY;COUNT=5']"},
                    "reminders": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {"method": {"type": "string"}, "minutes": {"type": "integer"}},
                            "required": ["method", "minutes"]
                        }
                    },
                    "events": {
                        "type": "array",
                        "description": "Multiple events to create in one step; each item takes the same fields as the top level.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "summary": {"type": "string"},
                                "description": {"type": "string"},
                                "start_time": {"type": "string"},
                                "end_time": {"type": "string"},
                                "location": {"type": "string"}
                            },
                            "required": ["summary", "start_time", "end_time"]
                        }
                    },
                    "confirm": {"type": "boolean", "description": "Call with true only after user explicitly agrees"}
                },
                "required": []
            }),
        ),
        ToolDefinition::function(
            "find_events",
            "Find calendar events matching a free-text query within a time window.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Keywords from the event title, e.g. 'gym' or 'dentist and physio'."
                    },
                    "timeframe": {
                        "type": "string",
                        "enum": ["today", "tomorrow", "this_week", "next_week"],
                        "description": "Named window; omit to use start/end or a default window."
                    },
                    "start": {"type": "string", "description": "Window start, ISO8601."},
                    "end": {"type": "string", "description": "Window end, ISO8601."},
                    "max_results": {"type": "integer", "description": "Cap on events fetched."}
                },
                "required": []
            }),
        ),
        ToolDefinition::function(
            "update_event",
            "Update matching calendar events. Locate them with query/timeframe, pass the \
             new field values, preview first, and call with confirm=true only after the user agrees.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Keywords to locate the event(s) to change."},
                    "timeframe": {
                        "type": "string",
                        "enum": ["today", "tomorrow", "this_week", "next_week"]
                    },
                    "start": {"type": "string", "description": "Search window start, ISO8601."},
                    "end": {"type": "string", "description": "Search window end, ISO8601."},
                    "summary": {"type": "string", "description": "New event title."},
                    "description": {"type": "string", "description": "New description."},
                    "location": {"type": "string", "description": "New location."},
                    "start_time": {"type": "string", "description": "New start, RFC3339 with offset."},
                    "end_time": {"type": "string", "description": "New end, RFC3339 with offset."},
                    "confirm": {"type": "boolean", "description": "Call with true only after user explicitly agrees"}
                },
                "required": []
            }),
        ),
        ToolDefinition::function(
            "delete_event",
            "Delete matching calendar events. Always preview the matches and call with \
             confirm=true only after the user explicitly agrees.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Keywords to locate the event(s) to delete."},
                    "timeframe": {
                        "type": "string",
                        "enum": ["today", "tomorrow", "this_week", "next_week"]
                    },
                    "start": {"type": "string", "description": "Search window start, ISO8601."},
                    "end": {"type": "string", "description": "Search window end, ISO8601."},
                    "confirm": {"type": "boolean", "description": "Call with true only after user explicitly agrees"}
                },
                "required": []
            }),
        ),
        ToolDefinition::function(
            "create_goal",
            "Create a new personal goal for the user. Present a preview before calling with confirm=true.",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Short goal title."},
                    "description": {"type": "string", "description": "Optional detail about the goal."},
                    "target_date": {
                        "type": "string",
                        "description": "Optional target completion date in ISO8601 (e.g. 2025-09-12)."
                    },
                    "target_value": {
                        "type": "number",
                        "description": "Optional numeric target total (e.g. 70 for 70 km, 120 for pages)."
                    },
                    "target_unit": {
                        "type": "string",
                        "description": "Unit for the goal target (e.g. km, pages, $, minutes)."
                    },
                    "target_period": {
                        "type": "string",
                        "description": "Optional cadence or context like 'this week' or 'by Saturday'."
                    },
                    "progress_value": {
                        "type": "number",
                        "description": "Optional starting progress expressed in the same unit as the target."
                    },
                    "confirm": {
                        "type": "boolean",
                        "description": "Set true only after the user approves the goal."
                    }
                },
                "required": ["title"]
            }),
        ),
        ToolDefinition::function(
            "update_goal",
            "Update an existing goal's progress, details, or status. Confirm with the user before making changes.",
            json!({
                "type": "object",
                "properties": {
                    "goal_id": {"type": "string", "description": "Identifier of the goal to update."},
                    "goal_title": {
                        "type": "string",
                        "description": "Use when the goal ID is unknown; provide the goal title or a distinctive part of it."
                    },
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "target_date": {
                        "type": "string",
                        "description": "New target date in ISO8601 (e.g. 2025-10-01)."
                    },
                    "progress": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": 100,
                        "description": "Progress percentage from 0 to 100."
                    },
                    "progress_value": {
                        "type": "number",
                        "description": "Amount of progress completed so far in the goal's unit."
                    },
                    "status": {
                        "type": "string",
                        "enum": ["active", "completed", "archived"],
                        "description": "New goal status."
                    },
                    "target_value": {
                        "type": "number",
                        "description": "Update the goal's total target amount."
                    },
                    "target_unit": {
                        "type": "string",
                        "description": "Update the goal's unit (e.g. km, pages, $)."
                    },
                    "target_period": {
                        "type": "string",
                        "description": "Update the cadence/context like 'this week'."
                    },
                    "note": {
                        "type": "string",
                        "description": "Optional note or milestone update to add to the goal history."
                    },
                    "confirm": {
                        "type": "boolean",
                        "description": "Set true only after the user confirms the update."
                    }
                },
                "required": []
            }),
        ),
        ToolDefinition::function(
            "list_goals",
            "Retrieve the user's goals for summary or review.",
            json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["active", "completed", "archived"],
                        "description": "Optional filter for goal status."
                    }
                }
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tools_present() {
        let names: Vec<String> = assistant_tools()
            .iter()
            .map(|t| t.function.name.clone())
            .collect();
        assert_eq!(
            names,
            vec![
                "create_event",
                "find_events",
                "update_event",
                "delete_event",
                "create_goal",
                "update_goal",
                "list_goals"
            ]
        );
    }

    #[test]
    fn test_mutating_tools_carry_confirm() {
        for tool in assistant_tools() {
            let mutating = !matches!(tool.function.name.as_str(), "find_events" | "list_goals");
            let has_confirm = tool.function.parameters["properties"]
                .get("confirm")
                .is_some();
            assert_eq!(mutating, has_confirm, "tool {}", tool.function.name);
        }
    }
}
