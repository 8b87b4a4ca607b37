//! Calendar gateway interface and event types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from calendar operations.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar is not connected")]
    NotConnected,
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calendar API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("calendar token: {0}")]
    Token(String),
}

/// A start/end value in the calendar's own shape: either a timed instant
/// (`dateTime`) or an all-day date (`date`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// The timed instant, when this is not an all-day value.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        let raw = self.date_time.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A calendar event as returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Event reminder override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub method: String,
    pub minutes: u32,
}

/// A fully specified event payload, ready to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// RFC3339 start, e.g. "2025-11-22T14:00:00+11:00".
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminders: Vec<Reminder>,
}

/// Sparse field changes for an existing event.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.location.is_none()
    }
}

/// Find/create/update/delete against the external calendar. All calls are
/// network operations with their own timeouts; none of them may be made
/// while holding the goal store lock.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Whether an authorized calendar connection is available.
    async fn is_connected(&self) -> bool;

    async fn find_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<Event>, CalendarError>;

    async fn create_event(&self, draft: &EventDraft) -> Result<Event, CalendarError>;

    async fn update_event(&self, id: &str, changes: &EventChanges)
        -> Result<Event, CalendarError>;

    async fn delete_event(&self, id: &str) -> Result<(), CalendarError>;
}
