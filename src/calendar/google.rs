//! Google Calendar gateway.
//!
//! Consumes an already-authorized user token file (the OAuth consent flow
//! itself happens elsewhere) and talks to the Calendar v3 REST API with a
//! bounded-timeout client. Expired access tokens are refreshed in place and
//! the file rewritten, so a long-lived deployment stays connected.

use std::fs;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::gateway::{CalendarError, CalendarGateway, Event, EventChanges, EventDraft};

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Authorized-user token file contents, as written by the consent flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    #[serde(alias = "access_token")]
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl StoredToken {
    /// Usable without a refresh. A missing expiry is treated as valid, an
    /// expiry within the next minute as expired.
    fn is_fresh(&self) -> bool {
        if self.token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) => expiry > Utc::now() + Duration::seconds(60),
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
}

/// Google-backed [`CalendarGateway`].
pub struct GoogleCalendar {
    http: Client,
    token_path: PathBuf,
    /// Reference timezone attached to floating (offset-less) event times.
    timezone: String,
}

impl GoogleCalendar {
    pub fn new(token_path: impl Into<PathBuf>, timezone: impl Into<String>) -> Result<Self, CalendarError> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            token_path: token_path.into(),
            timezone: timezone.into(),
        })
    }

    fn load_token(&self) -> Result<StoredToken, CalendarError> {
        let contents = fs::read_to_string(&self.token_path)
            .map_err(|_| CalendarError::NotConnected)?;
        serde_json::from_str(&contents)
            .map_err(|e| CalendarError::Token(format!("unreadable token file: {}", e)))
    }

    fn save_token(&self, token: &StoredToken) {
        match serde_json::to_string_pretty(token) {
            Ok(contents) => {
                if let Err(e) = fs::write(&self.token_path, contents) {
                    warn!(error = %e, "failed to persist refreshed calendar token");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize calendar token"),
        }
    }

    async fn refresh(&self, mut token: StoredToken) -> Result<StoredToken, CalendarError> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| CalendarError::Token("no refresh token; please reconnect Google".to_string()))?;
        let client_id = token
            .client_id
            .clone()
            .ok_or_else(|| CalendarError::Token("token file has no client_id".to_string()))?;
        let client_secret = token
            .client_secret
            .clone()
            .ok_or_else(|| CalendarError::Token("token file has no client_secret".to_string()))?;

        debug!("refreshing Google Calendar access token");
        let response = self
            .http
            .post(&token.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;
        let refreshed: RefreshResponse = response.json().await?;

        token.token = refreshed.access_token;
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        self.save_token(&token);
        info!("Google Calendar token refreshed");
        Ok(token)
    }

    async fn access_token(&self) -> Result<String, CalendarError> {
        let token = self.load_token()?;
        if token.is_fresh() {
            return Ok(token.token);
        }
        let token = self.refresh(token).await?;
        Ok(token.token)
    }

    /// Google accepts an offset-less dateTime only alongside a timeZone
    /// field; pass the reference timezone for those.
    fn event_time_value(&self, raw: &str) -> Value {
        if DateTime::parse_from_rfc3339(raw).is_ok() {
            json!({ "dateTime": raw })
        } else {
            json!({ "dateTime": raw, "timeZone": self.timezone })
        }
    }

    fn draft_body(&self, draft: &EventDraft) -> Value {
        let mut body = json!({
            "summary": draft.summary,
            "start": self.event_time_value(&draft.start_time),
            "end": self.event_time_value(&draft.end_time),
        });
        let obj = body.as_object_mut().expect("body is an object");
        if let Some(description) = &draft.description {
            obj.insert("description".to_string(), json!(description));
        }
        if let Some(location) = &draft.location {
            obj.insert("location".to_string(), json!(location));
        }
        if !draft.attendees.is_empty() {
            let attendees: Vec<Value> = draft
                .attendees
                .iter()
                .map(|email| json!({ "email": email }))
                .collect();
            obj.insert("attendees".to_string(), Value::Array(attendees));
        }
        if !draft.recurrence.is_empty() {
            obj.insert("recurrence".to_string(), json!(draft.recurrence));
        }
        if !draft.reminders.is_empty() {
            obj.insert(
                "reminders".to_string(),
                json!({ "useDefault": false, "overrides": draft.reminders }),
            );
        }
        body
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(CalendarError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CalendarGateway for GoogleCalendar {
    async fn is_connected(&self) -> bool {
        let Ok(token) = self.load_token() else {
            return false;
        };
        if token.is_fresh() {
            return true;
        }
        self.refresh(token).await.is_ok()
    }

    async fn find_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<Event>, CalendarError> {
        let access_token = self.access_token().await?;
        let response = self
            .http
            .get(EVENTS_URL)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", start.to_rfc3339().as_str()),
                ("timeMax", end.to_rfc3339().as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", max_results.to_string().as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;
        let list: EventList = response.json().await?;
        Ok(list.items)
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Event, CalendarError> {
        let access_token = self.access_token().await?;
        let response = self
            .http
            .post(EVENTS_URL)
            .bearer_auth(access_token)
            .json(&self.draft_body(draft))
            .send()
            .await?;
        let response = check_status(response).await?;
        let event: Event = response.json().await?;
        info!(event_id = %event.id, summary = %event.summary, "created calendar event");
        Ok(event)
    }

    async fn update_event(
        &self,
        id: &str,
        changes: &EventChanges,
    ) -> Result<Event, CalendarError> {
        let access_token = self.access_token().await?;
        let mut body = serde_json::Map::new();
        if let Some(summary) = &changes.summary {
            body.insert("summary".to_string(), json!(summary));
        }
        if let Some(description) = &changes.description {
            body.insert("description".to_string(), json!(description));
        }
        if let Some(location) = &changes.location {
            body.insert("location".to_string(), json!(location));
        }
        if let Some(start_time) = &changes.start_time {
            body.insert("start".to_string(), self.event_time_value(start_time));
        }
        if let Some(end_time) = &changes.end_time {
            body.insert("end".to_string(), self.event_time_value(end_time));
        }

        let response = self
            .http
            .patch(format!("{}/{}", EVENTS_URL, id))
            .bearer_auth(access_token)
            .json(&Value::Object(body))
            .send()
            .await?;
        let response = check_status(response).await?;
        let event: Event = response.json().await?;
        info!(event_id = %id, "updated calendar event");
        Ok(event)
    }

    async fn delete_event(&self, id: &str) -> Result<(), CalendarError> {
        let access_token = self.access_token().await?;
        let response = self
            .http
            .delete(format!("{}/{}", EVENTS_URL, id))
            .bearer_auth(access_token)
            .send()
            .await?;
        check_status(response).await?;
        info!(event_id = %id, "deleted calendar event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_token_file_is_not_connected() {
        let dir = tempdir().unwrap();
        let gw = GoogleCalendar::new(dir.path().join("token.json"), "UTC").unwrap();
        assert!(matches!(gw.load_token(), Err(CalendarError::NotConnected)));
    }

    #[test]
    fn test_token_freshness() {
        let fresh = StoredToken {
            token: "abc".to_string(),
            refresh_token: None,
            token_uri: default_token_uri(),
            client_id: None,
            client_secret: None,
            expiry: Some(Utc::now() + Duration::hours(1)),
        };
        assert!(fresh.is_fresh());

        let expired = StoredToken {
            expiry: Some(Utc::now() - Duration::hours(1)),
            ..fresh.clone()
        };
        assert!(!expired.is_fresh());

        let no_expiry = StoredToken {
            expiry: None,
            ..fresh
        };
        assert!(no_expiry.is_fresh());
    }

    #[test]
    fn test_floating_times_get_reference_timezone() {
        let dir = tempdir().unwrap();
        let gw = GoogleCalendar::new(dir.path().join("token.json"), "Australia/Sydney").unwrap();

        let with_offset = gw.event_time_value("2025-11-22T14:00:00+11:00");
        assert!(with_offset.get("timeZone").is_none());

        let floating = gw.event_time_value("2025-11-22T14:00:00");
        assert_eq!(
            floating.get("timeZone").and_then(Value::as_str),
            Some("Australia/Sydney")
        );
    }

    #[test]
    fn test_draft_body_skips_absent_fields() {
        let dir = tempdir().unwrap();
        let gw = GoogleCalendar::new(dir.path().join("token.json"), "UTC").unwrap();
        let draft = EventDraft {
            summary: "Dentist".to_string(),
            description: None,
            start_time: "2025-11-22T14:00:00+11:00".to_string(),
            end_time: "2025-11-22T15:00:00+11:00".to_string(),
            location: None,
            attendees: Vec::new(),
            recurrence: Vec::new(),
            reminders: Vec::new(),
        };
        let body = gw.draft_body(&draft);
        assert_eq!(body.get("summary").and_then(Value::as_str), Some("Dentist"));
        assert!(body.get("description").is_none());
        assert!(body.get("attendees").is_none());
        assert!(body.get("reminders").is_none());
    }
}
