// Dashboard HTTP API server
//
// REST endpoints for the snapshot and its sections, the two toggle mutations,
// canned chat, and a receive-only WebSocket push channel.

use crate::aggregator::Aggregator;
use crate::broadcast::ConnectionRegistry;
use crate::chat::{self, ChatRequest};
use crate::dashboard::DashboardConfig;
use crate::snapshot::Snapshot;
use crate::source::MetricsSource;
use crate::state::SharedSnapshot;
use crate::system::{RandomMetrics, VolatileMetrics};
use crate::HubError;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Dashboard server state
#[derive(Clone)]
struct DashboardState {
    snapshot: SharedSnapshot,
    aggregator: Arc<Aggregator>,
    connections: Arc<ConnectionRegistry>,
    metrics: Arc<dyn VolatileMetrics>,
    push_interval: Duration,
}

/// Dashboard HTTP server
pub struct DashboardServer {
    config: DashboardConfig,
    source: Arc<dyn MetricsSource>,
    snapshot: SharedSnapshot,
    metrics: Arc<dyn VolatileMetrics>,
    connections: Arc<ConnectionRegistry>,
}

impl DashboardServer {
    pub fn new(config: DashboardConfig, source: Arc<dyn MetricsSource>) -> Self {
        Self {
            config,
            source,
            snapshot: SharedSnapshot::default(),
            metrics: Arc::new(RandomMetrics::new()),
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }

    pub fn with_snapshot(mut self, snapshot: SharedSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn VolatileMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    pub fn connections(&self) -> Arc<ConnectionRegistry> {
        self.connections.clone()
    }

    /// Build the router with all dashboard routes
    pub fn router(&self) -> Router {
        let aggregator = Aggregator::new(self.source.clone(), self.snapshot.clone())
            .with_query_timeout(self.config.query_timeout);

        let state = DashboardState {
            snapshot: self.snapshot.clone(),
            aggregator: Arc::new(aggregator),
            connections: self.connections.clone(),
            metrics: self.metrics.clone(),
            push_interval: self.config.push_interval,
        };

        Router::new()
            .route("/", get(index_handler))
            .route("/ws", get(ws_handler))
            .route("/static/*asset", get(static_asset_handler))
            .route("/health", get(health_handler))
            .route("/api/stats", get(stats_handler))
            .route("/api/revenue", get(revenue_handler))
            .route("/api/emails", get(emails_handler))
            .route("/api/traffic", get(traffic_handler))
            .route("/api/automation", get(automation_handler))
            .route("/api/channels", get(channels_handler))
            .route("/api/system", get(system_handler))
            .route("/api/cron", get(cron_handler))
            .route("/api/sessions", get(sessions_handler))
            .route("/api/skills", get(skills_handler))
            .route("/api/logs", get(logs_handler))
            .route("/api/skills/:id/toggle", post(toggle_skill_handler))
            .route("/api/cron/:id/toggle", post(toggle_cron_handler))
            .route("/api/chat", post(chat_handler))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state)
    }

    /// Start the Dashboard server
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` resolves, then cancel every push task
    pub async fn serve_with_shutdown<F>(
        self,
        signal: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr();
        info!(
            target: "dashboard",
            addr = %addr,
            push_interval_secs = self.config.push_interval.as_secs(),
            "Starting Dashboard server"
        );

        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            target: "dashboard",
            url = %format!("http://{}", addr),
            "Dashboard server ready"
        );

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await;
        self.connections.shutdown();
        result?;

        info!(target: "dashboard", "Dashboard server stopped");
        Ok(())
    }
}

/// Errors surfaced to HTTP callers as `{"error": ...}`
#[derive(Debug)]
pub struct ApiError(HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = match &self.0 {
            HubError::SkillNotFound(_) => "Skill not found".to_string(),
            HubError::CronJobNotFound(_) => "Cron job not found".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Serve the main HTML page
const FALLBACK_INDEX: &str = r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>Hub</title></head><body><h1>Hub dashboard assets not found</h1></body></html>"#;

/// `GET /` serves the page, or upgrades when the browser opens the push socket
/// on the page origin.
async fn index_handler(
    State(state): State<DashboardState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, state))
            .into_response(),
        Err(_) => {
            let html =
                crate::dashboard::static_assets::get_text("index.html").unwrap_or(FALLBACK_INDEX);
            Html(html).into_response()
        }
    }
}

async fn ws_handler(State(state): State<DashboardState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Forward push frames to one socket until either side goes away
async fn handle_socket(mut socket: WebSocket, state: DashboardState) {
    let (id, mut rx) = state
        .connections
        .connect(
            state.snapshot.clone(),
            state.metrics.clone(),
            state.push_interval,
        )
        .await;

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(message) = outgoing else { break };
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if socket.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(target: "dashboard", error = %e, "Failed to serialize push frame");
                    }
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Receive-only channel
                Some(Ok(_)) => {}
            }
        }
    }

    state.connections.disconnect(id);
}

async fn static_asset_handler(Path(asset): Path<String>) -> impl IntoResponse {
    match crate::dashboard::static_assets::get(asset.as_str()) {
        Some(asset) => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = header::HeaderValue::from_str(asset.content_type) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            (StatusCode::OK, headers, asset.body).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn health_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "connections": state.connections.active_connections(),
    }))
}

/// Full snapshot, freshly aggregated (or the last known one on failure)
async fn stats_handler(State(state): State<DashboardState>) -> Json<Snapshot> {
    Json(state.aggregator.fetch_snapshot().await.into_snapshot())
}

// Section endpoints read the cached snapshot without aggregating

async fn section<T: Serialize>(
    state: &DashboardState,
    pick: impl FnOnce(&Snapshot) -> T,
) -> Json<T> {
    Json(state.snapshot.read(pick).await)
}

async fn revenue_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.revenue.clone()).await
}

async fn emails_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.emails.clone()).await
}

async fn traffic_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.traffic.clone()).await
}

async fn automation_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.automation.clone()).await
}

async fn channels_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.channels.clone()).await
}

async fn system_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.system.clone()).await
}

async fn cron_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.cron_jobs.clone()).await
}

async fn sessions_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.sessions.clone()).await
}

async fn skills_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.skills.clone()).await
}

async fn logs_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    section(&state, |s| s.logs.clone()).await
}

async fn toggle_skill_handler(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let skill = state.snapshot.toggle_skill(&id).await?;
    Ok(Json(json!({ "success": true, "skill": skill })))
}

async fn toggle_cron_handler(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job_id = parse_job_id(&id).ok_or_else(|| HubError::CronJobNotFound(id.clone()))?;
    let job = state.snapshot.toggle_cron_job(job_id).await?;
    Ok(Json(json!({ "success": true, "job": job })))
}

/// Leading-integer parse: optional whitespace and sign, then digits, rest ignored.
/// "3", "+3", "03" and "3abc" all name job 3; negative ids match nothing.
fn parse_job_id(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let value = rest[..end].parse::<u32>().ok()?;
    if negative && value != 0 {
        return None;
    }
    Some(value)
}

async fn chat_handler(body: Option<Json<ChatRequest>>) -> impl IntoResponse {
    let message = body.and_then(|Json(req)| req.message);
    debug!(target: "dashboard", message = ?message, "Chat message received");

    let reply = chat::reply(&mut rand::thread_rng(), chrono::Utc::now());
    Json(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_errors_map_to_404() {
        let response = ApiError::from(HubError::SkillNotFound("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::from(HubError::CronJobNotFound("9".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_errors_map_to_500() {
        for err in [
            HubError::DataSource("down".into()),
            HubError::Timeout(Duration::from_secs(5)),
        ] {
            assert!(!err.is_not_found());
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn job_ids_parse_leading_integer() {
        assert_eq!(parse_job_id("3"), Some(3));
        assert_eq!(parse_job_id("+3"), Some(3));
        assert_eq!(parse_job_id("03"), Some(3));
        assert_eq!(parse_job_id("3abc"), Some(3));
        assert_eq!(parse_job_id(" 3"), Some(3));
        assert_eq!(parse_job_id("-0"), Some(0));
    }

    #[test]
    fn job_ids_without_leading_digits_are_rejected() {
        for raw in ["", "abc", "-1", "+", "x3", "99999999999"] {
            assert_eq!(parse_job_id(raw), None, "{raw:?}");
        }
    }
}
