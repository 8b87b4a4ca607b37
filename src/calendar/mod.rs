//! Calendar integration.
//!
//! [`gateway::CalendarGateway`] is the interface the assistant talks to;
//! [`google::GoogleCalendar`] is the Google-backed implementation. The
//! remote calendar is the system of record, this crate never stores events.

pub mod gateway;
pub mod google;

pub use gateway::{
    CalendarError, CalendarGateway, Event, EventChanges, EventDraft, EventTime, Reminder,
};
pub use google::GoogleCalendar;
