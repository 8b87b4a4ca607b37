//! Web server: the chat endpoint plus status probes.

pub mod http;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::llm::ChatClient;
use crate::agent::{Assistant, Dispatcher, SessionState};
use crate::calendar::{CalendarGateway, GoogleCalendar};
use crate::config::Config;
use crate::goals::GoalStore;
use crate::timefmt::TimeFormatter;

/// Sessions idle longer than this lose their pending preview state.
pub(crate) const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

pub(crate) struct SessionEntry {
    pub state: SessionState,
    pub touched: Instant,
}

/// Shared server state.
#[derive(Clone)]
pub struct ServerState {
    pub assistant: Arc<Assistant>,
    pub gateway: Arc<dyn CalendarGateway>,
    pub(crate) sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
}

/// Wire up the assistant and its collaborators from config.
pub fn build_state(config: &Config) -> Result<ServerState> {
    let fmt = TimeFormatter::from_name(&config.calendar.timezone)?;
    let gateway: Arc<dyn CalendarGateway> = Arc::new(GoogleCalendar::new(
        config.calendar.token_path()?,
        config.calendar.timezone.clone(),
    )?);
    let goals = Arc::new(GoalStore::new(config.goals.file()?)?);
    let dispatcher = Dispatcher::new(
        gateway.clone(),
        goals,
        fmt,
        config.calendar.max_results,
    );
    let llm = ChatClient::new(&config.llm.base_url, config.llm.api_key()?)?;
    let assistant = Assistant::new(
        llm,
        dispatcher,
        &config.llm.model,
        &config.llm.regen_model,
        config.llm.max_tokens,
    );

    Ok(ServerState {
        assistant: Arc::new(assistant),
        gateway,
        sessions: Arc::new(Mutex::new(HashMap::new())),
    })
}

/// Start the HTTP server and block until it exits.
pub async fn start(config: Config) -> Result<()> {
    let state = build_state(&config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/chat", post(http::chat_handler))
        .route("/api/status", get(http::status_handler))
        .route("/api/calendar/status", get(http::calendar_status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, app).await.context("Server error")
}
