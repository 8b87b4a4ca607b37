//! Calendar event handlers: create, find, update, delete.
//!
//! Every mutating handler follows the same two-phase shape: without
//! `confirm` it renders a preview and never touches the gateway's mutating
//! operations; with `confirm=true` it re-derives the target set and applies
//! the mutation, reporting a success count for batches.

use chrono::NaiveDate;
use tracing::warn;

use crate::calendar::{Event, EventChanges, EventDraft};
use crate::types::{Reply, ReplyItem};

use super::dispatch::{
    CreateEventArgs, DeleteEventArgs, Dispatcher, EventDraftArgs, FindEventsArgs, SessionState,
    UpdateEventArgs,
};
use super::resolve::{find_matching_events, resolve_window};
use super::HandlerError;

impl Dispatcher {
    pub(crate) async fn handle_create_event(
        &self,
        args: CreateEventArgs,
        session: &mut SessionState,
    ) -> Result<Reply, HandlerError> {
        let drafts = self.drafts_from_args(&args)?;

        if !args.confirm {
            let Some(drafts) = drafts else {
                return Err(HandlerError::InvalidInput(
                    "What event would you like to add? I need a title plus a start and end time."
                        .to_string(),
                ));
            };
            let items: Vec<ReplyItem> = drafts
                .iter()
                .map(|d| ReplyItem::new(d.summary.clone(), self.draft_span(d)))
                .collect();
            let md: Vec<String> = drafts
                .iter()
                .map(|d| format!("- **{}** - {}", d.summary, self.draft_span(d)))
                .collect();
            let count = drafts.len();
            session.pending_events = Some(drafts);
            return Ok(Reply {
                reply: if count == 1 {
                    "Here's the event I'll add to your calendar. Shall I go ahead?".to_string()
                } else {
                    format!(
                        "Here are the {} events I'll add to your calendar. Shall I go ahead?",
                        count
                    )
                },
                reply_md: Some(md.join("\n")),
                cta: Some("Add to calendar".to_string()),
                items: Some(items),
                ..Reply::default()
            });
        }

        // Confirm: a fresh payload in this call supersedes the stash.
        let drafts = match drafts {
            Some(drafts) => drafts,
            None => session.pending_events.take().ok_or_else(|| {
                HandlerError::InvalidInput(
                    "There's no pending event to confirm. Tell me what you'd like to add."
                        .to_string(),
                )
            })?,
        };
        session.pending_events = None;

        let mut created_ids = Vec::new();
        for draft in &drafts {
            match self.gateway.create_event(draft).await {
                Ok(event) => created_ids.push(event.id),
                Err(e) => warn!(summary = %draft.summary, error = %e, "event create failed"),
            }
        }
        if created_ids.is_empty() {
            return Ok(Reply::text(
                "I couldn't add that to your calendar just now. Please try again in a moment.",
            ));
        }
        Ok(Reply {
            reply: format!(
                "Added {} event{} to your calendar.",
                created_ids.len(),
                if created_ids.len() == 1 { "" } else { "s" }
            ),
            event_ids: Some(created_ids),
            ..Reply::default()
        })
    }

    pub(crate) async fn handle_find_events(
        &self,
        args: FindEventsArgs,
    ) -> Result<Reply, HandlerError> {
        let window = resolve_window(
            args.timeframe.as_deref(),
            args.start.as_deref(),
            args.end.as_deref(),
            &self.fmt,
        )?;
        let max_results = args.max_results.unwrap_or(self.max_results).clamp(1, 250);
        let events = find_matching_events(
            self.gateway.as_ref(),
            args.query.as_deref(),
            window,
            max_results,
        )
        .await?;

        if events.is_empty() {
            return Ok(Reply::text(format!(
                "I couldn't find {}.",
                search_description(args.query.as_deref())
            )));
        }

        let md: Vec<String> = events
            .iter()
            .map(|e| format!("- **{}** - {}", e.summary, self.event_span(e)))
            .collect();
        Ok(Reply {
            reply: format!(
                "Found {} event{}.",
                events.len(),
                if events.len() == 1 { "" } else { "s" }
            ),
            reply_md: Some(md.join("\n")),
            events: Some(events),
            ..Reply::default()
        })
    }

    pub(crate) async fn handle_update_event(
        &self,
        args: UpdateEventArgs,
    ) -> Result<Reply, HandlerError> {
        let changes = EventChanges {
            summary: clean(args.summary),
            description: args.description,
            location: args.location,
            start_time: clean(args.start_time),
            end_time: clean(args.end_time),
        };
        if changes.is_empty() {
            return Err(HandlerError::InvalidInput(
                "What would you like to change about the event?".to_string(),
            ));
        }
        for raw in [changes.start_time.as_deref(), changes.end_time.as_deref()]
            .into_iter()
            .flatten()
        {
            self.parse_event_time(raw)?;
        }

        let window = resolve_window(
            args.timeframe.as_deref(),
            args.start.as_deref(),
            args.end.as_deref(),
            &self.fmt,
        )?;
        let matched = find_matching_events(
            self.gateway.as_ref(),
            args.query.as_deref(),
            window,
            self.max_results,
        )
        .await?;
        if matched.is_empty() {
            return Err(HandlerError::NotFound(search_description(
                args.query.as_deref(),
            )));
        }

        if !args.confirm {
            let md: Vec<String> = matched
                .iter()
                .map(|e| format!("- **{}** - {}", e.summary, self.event_span(e)))
                .collect();
            return Ok(Reply {
                reply: format!(
                    "I'll update {} event{} with these changes. Apply them?",
                    matched.len(),
                    if matched.len() == 1 { "" } else { "s" }
                ),
                reply_md: Some(md.join("\n")),
                cta: Some("Apply changes".to_string()),
                items: Some(self.change_items(&changes)),
                ..Reply::default()
            });
        }

        let mut updated_ids = Vec::new();
        for event in &matched {
            match self.gateway.update_event(&event.id, &changes).await {
                Ok(updated) => updated_ids.push(updated.id),
                Err(e) => warn!(event_id = %event.id, error = %e, "event update failed"),
            }
        }
        if updated_ids.is_empty() {
            return Ok(Reply::text(
                "I couldn't update those events just now. Please try again in a moment.",
            ));
        }
        Ok(Reply {
            reply: format!(
                "Updated {} event{}.",
                updated_ids.len(),
                if updated_ids.len() == 1 { "" } else { "s" }
            ),
            event_ids: Some(updated_ids),
            ..Reply::default()
        })
    }

    pub(crate) async fn handle_delete_event(
        &self,
        args: DeleteEventArgs,
    ) -> Result<Reply, HandlerError> {
        let window = resolve_window(
            args.timeframe.as_deref(),
            args.start.as_deref(),
            args.end.as_deref(),
            &self.fmt,
        )?;
        let matched = find_matching_events(
            self.gateway.as_ref(),
            args.query.as_deref(),
            window,
            self.max_results,
        )
        .await?;
        if matched.is_empty() {
            return Err(HandlerError::NotFound(search_description(
                args.query.as_deref(),
            )));
        }

        if !args.confirm {
            let items: Vec<ReplyItem> = matched
                .iter()
                .map(|e| ReplyItem::new(e.summary.clone(), self.event_span(e)))
                .collect();
            let md: Vec<String> = matched
                .iter()
                .map(|e| format!("- **{}** - {}", e.summary, self.event_span(e)))
                .collect();
            return Ok(Reply {
                reply: format!(
                    "This will delete {} event{}. Are you sure?",
                    matched.len(),
                    if matched.len() == 1 { "" } else { "s" }
                ),
                reply_md: Some(md.join("\n")),
                cta: Some("Delete".to_string()),
                items: Some(items),
                ..Reply::default()
            });
        }

        let mut deleted_ids = Vec::new();
        for event in &matched {
            match self.gateway.delete_event(&event.id).await {
                Ok(()) => deleted_ids.push(event.id.clone()),
                Err(e) => warn!(event_id = %event.id, error = %e, "event delete failed"),
            }
        }
        if deleted_ids.is_empty() {
            return Ok(Reply::text(
                "I couldn't delete those events just now. Please try again in a moment.",
            ));
        }
        Ok(Reply {
            reply: format!(
                "Deleted {} event{}.",
                deleted_ids.len(),
                if deleted_ids.len() == 1 { "" } else { "s" }
            ),
            event_ids: Some(deleted_ids),
            ..Reply::default()
        })
    }

    /// Build validated drafts from the arguments, or `None` when the call
    /// carried no event payload at all (a bare confirm).
    fn drafts_from_args(
        &self,
        args: &CreateEventArgs,
    ) -> Result<Option<Vec<EventDraft>>, HandlerError> {
        if let Some(items) = args.events.as_ref().filter(|items| !items.is_empty()) {
            let drafts = items
                .iter()
                .map(|item| self.validate_draft(item))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Some(drafts));
        }

        if args.summary.is_none() && args.start_time.is_none() && args.end_time.is_none() {
            return Ok(None);
        }
        let single = EventDraftArgs {
            summary: args.summary.clone(),
            description: args.description.clone(),
            start_time: args.start_time.clone(),
            end_time: args.end_time.clone(),
            location: args.location.clone(),
        };
        let mut draft = self.validate_draft(&single)?;
        draft.attendees = args.attendees.clone().unwrap_or_default();
        draft.recurrence = args.recurrence.clone().unwrap_or_default();
        draft.reminders = args.reminders.clone().unwrap_or_default();
        Ok(Some(vec![draft]))
    }

    fn validate_draft(&self, item: &EventDraftArgs) -> Result<EventDraft, HandlerError> {
        let summary = item
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                HandlerError::InvalidInput("What should the event be called?".to_string())
            })?;
        let (Some(start_time), Some(end_time)) = (item.start_time.as_deref(), item.end_time.as_deref())
        else {
            return Err(HandlerError::InvalidInput(format!(
                "When should '{}' start and end? I need full dates and times.",
                summary
            )));
        };
        self.parse_event_time(start_time)?;
        self.parse_event_time(end_time)?;
        Ok(EventDraft {
            summary: summary.to_string(),
            description: item.description.clone(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            location: item.location.clone(),
            attendees: Vec::new(),
            recurrence: Vec::new(),
            reminders: Vec::new(),
        })
    }

    fn parse_event_time(&self, raw: &str) -> Result<chrono::DateTime<chrono::Utc>, HandlerError> {
        self.fmt.parse_point(raw).map_err(|_| {
            HandlerError::InvalidInput(format!(
                "I couldn't read the time '{}'. Please give it like 2025-11-22T14:00:00+11:00.",
                raw
            ))
        })
    }

    /// Human-readable span for a draft's validated times.
    fn draft_span(&self, draft: &EventDraft) -> String {
        match (
            self.fmt.parse_point(&draft.start_time),
            self.fmt.parse_point(&draft.end_time),
        ) {
            (Ok(start), Ok(end)) => self.fmt.format_time_range(start, end),
            _ => format!("{} - {}", draft.start_time, draft.end_time),
        }
    }

    /// Human-readable span for an existing event, including all-day ones.
    fn event_span(&self, event: &Event) -> String {
        if let (Some(start), Some(end)) = (event.start.instant(), event.end.instant()) {
            return self.fmt.format_time_range(start, end);
        }
        match event.start.date.as_deref() {
            Some(date) => match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(day) => format!("{} (all day)", day.format("%a %-d %b %Y")),
                Err(_) => format!("{} (all day)", date),
            },
            None => "time unknown".to_string(),
        }
    }

    fn change_items(&self, changes: &EventChanges) -> Vec<ReplyItem> {
        let mut items = Vec::new();
        if let Some(summary) = &changes.summary {
            items.push(ReplyItem::new("Title", summary.clone()));
        }
        if let Some(start) = &changes.start_time {
            items.push(ReplyItem::new("Starts", self.time_item_value(start)));
        }
        if let Some(end) = &changes.end_time {
            items.push(ReplyItem::new("Ends", self.time_item_value(end)));
        }
        if let Some(location) = &changes.location {
            items.push(ReplyItem::new("Location", location.clone()));
        }
        if let Some(description) = &changes.description {
            items.push(ReplyItem::new("Description", description.clone()));
        }
        items
    }

    fn time_item_value(&self, raw: &str) -> String {
        match self.fmt.parse_point(raw) {
            Ok(instant) => format!(
                "{}, {}",
                self.fmt.format_date_only(instant),
                self.fmt.to_zoned(instant).format("%-I:%M %p")
            ),
            Err(_) => raw.to_string(),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn search_description(query: Option<&str>) -> String {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => format!("any events matching '{}' in that window", query),
        None => "any events in that window".to_string(),
    }
}
