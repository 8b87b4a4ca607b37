//! Goal handlers: create, update, list.
//!
//! Same two-phase shape as the event handlers: previews never touch the
//! store's mutating operations.

use crate::goals::{trim_float, GoalChanges, GoalStatus, NewGoal};
use crate::types::{Reply, ReplyItem};

use super::dispatch::{CreateGoalArgs, Dispatcher, ListGoalsArgs, Numberish, UpdateGoalArgs};
use super::resolve::resolve_goal;
use super::HandlerError;

impl Dispatcher {
    pub(crate) async fn handle_create_goal(
        &self,
        args: CreateGoalArgs,
    ) -> Result<Reply, HandlerError> {
        let title = args
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                HandlerError::InvalidInput("What should I call this goal?".to_string())
            })?;
        let target_value = args
            .target_value
            .as_ref()
            .and_then(Numberish::coerce)
            .filter(|v| *v > 0.0);
        let progress_value = args.progress_value.as_ref().and_then(Numberish::coerce);

        if !args.confirm {
            let mut items = vec![ReplyItem::new("Title", title)];
            if let Some(target) = target_value {
                let mut value = trim_float(target);
                if let Some(unit) = args.target_unit.as_deref().filter(|u| !u.trim().is_empty()) {
                    value = format!("{} {}", value, unit.trim());
                }
                if let Some(period) = args.target_period.as_deref().filter(|p| !p.trim().is_empty())
                {
                    value = format!("{} ({})", value, period.trim());
                }
                items.push(ReplyItem::new("Target", value));
            }
            if let Some(date) = args.target_date.as_deref().filter(|d| !d.trim().is_empty()) {
                items.push(ReplyItem::new("Target date", date.trim()));
            }
            if let Some(progress) = progress_value {
                items.push(ReplyItem::new("Starting progress", trim_float(progress)));
            }
            if let Some(description) = args
                .description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
            {
                items.push(ReplyItem::new("Notes", description.trim()));
            }
            let md: Vec<String> = items
                .iter()
                .map(|item| format!("- {}: {}", item.label, item.value))
                .collect();
            return Ok(Reply {
                reply: format!("Here's the goal I'll save: '{}'. Sound good?", title),
                reply_md: Some(md.join("\n")),
                cta: Some("Save goal".to_string()),
                items: Some(items),
                ..Reply::default()
            });
        }

        let goal = self.goals.create(NewGoal {
            title: title.to_string(),
            description: args.description,
            target_date: args.target_date,
            target_value,
            target_unit: args.target_unit,
            target_period: args.target_period,
            progress_value,
        })?;

        let reply = if goal.target_value.is_some() && goal.progress_value.is_some() {
            format!(
                "Saved your goal: '{}'. You're at {} already.",
                goal.title,
                goal.progress_summary()
            )
        } else {
            format!("Saved your goal: '{}'.", goal.title)
        };
        Ok(Reply {
            reply,
            goals: Some(vec![goal]),
            ..Reply::default()
        })
    }

    pub(crate) async fn handle_update_goal(
        &self,
        args: UpdateGoalArgs,
    ) -> Result<Reply, HandlerError> {
        let goal = resolve_goal(
            self.goals.as_ref(),
            args.goal_id.as_deref(),
            args.goal_title.as_deref(),
        )?;

        // Catch a bad status before the preview, not at apply time.
        if let Some(status) = args.status.as_deref() {
            status
                .parse::<GoalStatus>()
                .map_err(HandlerError::from)?;
        }

        let mut changes = GoalChanges::default();
        let mut items = Vec::new();

        if let Some(title) = args.title.filter(|t| !t.trim().is_empty()) {
            items.push(ReplyItem::new("New title", title.trim()));
            changes.title = Some(title);
        }
        if let Some(description) = args.description {
            items.push(ReplyItem::new("Description", description.clone()));
            changes.description = Some(description);
        }
        if let Some(date) = args.target_date {
            items.push(ReplyItem::new("Target date", date.clone()));
            changes.target_date = Some(date);
        }
        if let Some(target) = args.target_value.as_ref() {
            let coerced = target.coerce().filter(|v| *v > 0.0);
            items.push(ReplyItem::new(
                "Target",
                coerced.map(trim_float).unwrap_or_else(|| "cleared".to_string()),
            ));
            changes.target_value = Some(coerced);
        }
        if let Some(unit) = args.target_unit {
            items.push(ReplyItem::new("Unit", unit.clone()));
            changes.target_unit = Some(unit);
        }
        if let Some(period) = args.target_period {
            items.push(ReplyItem::new("Cadence", period.clone()));
            changes.target_period = Some(period);
        }
        if let Some(progress) = args.progress.as_ref() {
            let pct = progress.coerce().ok_or_else(|| {
                HandlerError::InvalidInput(
                    "Progress must be a number from 0 to 100.".to_string(),
                )
            })?;
            let pct = pct.round() as i64;
            items.push(ReplyItem::new("Progress", format!("{}%", pct.clamp(0, 100))));
            changes.progress = Some(pct);
        }
        if let Some(progress_value) = args.progress_value.as_ref() {
            let value = progress_value.coerce().ok_or_else(|| {
                HandlerError::InvalidInput("Progress value must be numeric.".to_string())
            })?;
            let unit = goal.target_unit.as_deref().unwrap_or("");
            let rendered = if unit.is_empty() {
                trim_float(value)
            } else {
                format!("{} {}", trim_float(value), unit)
            };
            items.push(ReplyItem::new("Progress so far", rendered));
            changes.progress_value = Some(value);
        }
        if let Some(status) = args.status {
            items.push(ReplyItem::new("Status", status.clone()));
            changes.status = Some(status);
        }
        if let Some(note) = args.note.filter(|n| !n.trim().is_empty()) {
            items.push(ReplyItem::new("Note", note.trim()));
            changes.note = Some(note);
        }

        if items.is_empty() {
            return Err(HandlerError::InvalidInput(format!(
                "What would you like to update on '{}'?",
                goal.title
            )));
        }

        if !args.confirm {
            let md: Vec<String> = items
                .iter()
                .map(|item| format!("- {}: {}", item.label, item.value))
                .collect();
            return Ok(Reply {
                reply: format!("Here's what I'll update on '{}'. Apply it?", goal.title),
                reply_md: Some(md.join("\n")),
                cta: Some("Update goal".to_string()),
                items: Some(items),
                ..Reply::default()
            });
        }

        let updated = self.goals.update(&goal.id, changes)?;
        let reply = format!(
            "Updated '{}'. Now at {}, {}.",
            updated.title,
            updated.progress_summary(),
            updated.status
        );
        Ok(Reply {
            reply,
            goals: Some(vec![updated]),
            ..Reply::default()
        })
    }

    pub(crate) async fn handle_list_goals(
        &self,
        args: ListGoalsArgs,
    ) -> Result<Reply, HandlerError> {
        let status = args
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let goals = self.goals.list(status);

        if goals.is_empty() {
            let reply = match status {
                Some(filter) => format!("You don't have any {} goals right now.", filter),
                None => "You don't have any goals yet. Want to set one?".to_string(),
            };
            return Ok(Reply::text(reply));
        }

        let md: Vec<String> = goals
            .iter()
            .map(|g| format!("- {} - {} [{}]", g.title, g.progress_summary(), g.status))
            .collect();
        Ok(Reply {
            reply: format!(
                "You have {} goal{}.",
                goals.len(),
                if goals.len() == 1 { "" } else { "s" }
            ),
            reply_md: Some(md.join("\n")),
            goals: Some(goals),
            ..Reply::default()
        })
    }
}
