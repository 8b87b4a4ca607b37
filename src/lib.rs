//! DOLMA - Personal Assistant Backend Library
//!
//! A conversational assistant backend that:
//! - routes LLM function calls to calendar and goal handlers
//! - enforces a strict preview/confirm protocol before any mutation
//! - resolves free-text references to concrete events and goals
//! - keeps a small JSON-file goal store with derived progress
//!
//! # Example
//!
//! ```ignore
//! use dolma::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     dolma::server::start(config).await
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod timefmt;
pub mod goals;
pub mod calendar;
pub mod types;
pub mod agent;
pub mod config;
pub mod server;
pub mod cli;

// Re-export commonly used types for convenience
pub use agent::{error_reply, Assistant, Dispatcher, HandlerError, SessionState};

pub use calendar::{CalendarGateway, Event, EventChanges, EventDraft, GoogleCalendar};

pub use config::Config;

pub use goals::{Goal, GoalStatus, GoalStore};

pub use types::{Reply, ReplyItem};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
