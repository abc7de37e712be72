//! HTTP and WebSocket surface of the coordinator.
//!
//! # API Endpoints
//!
//! - `GET /health`
//! - `GET /languages`: supported `{name, code}` pairs
//! - `POST /translate`: translate only
//! - `POST /selection`: translate and deliver to the page channel
//! - `GET /pronounce?text=&language=`: text-to-speech URL
//! - `GET /channels`: live channels
//! - `GET /metrics`
//! - `GET /connect/:peer?tab=&active=`: WebSocket bound to a session channel

use crate::channel::{ChannelEvent, CloseReason, SenderContext, TabId};
use crate::config::Config;
use crate::coordinator::{Coordinator, SelectionOutcome};
use crate::i18n::{Language, LanguageEntry, LanguageRegistry};
use crate::metrics::MetricsReport;
use crate::response::TranslationResult;
use crate::security;
use crate::translation::{TranslateError, TranslationParams};
use anyhow::Context;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub struct AppState {
    pub coordinator: Coordinator,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(coordinator: Coordinator, api_key: Option<String>) -> Self {
        Self {
            coordinator,
            api_key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn translate_error(e: TranslateError) -> ApiError {
    let status = match e {
        TranslateError::InvalidInput(_) | TranslateError::InvalidParams(_) => StatusCode::BAD_REQUEST,
        TranslateError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
    };
    api_error(status, e.to_string())
}

/// Body of `POST /translate` and `POST /selection`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateBody {
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub source_language: Option<Value>,
    #[serde(default)]
    pub target_language: Option<Value>,
}

impl TranslateBody {
    /// The text to translate; anything other than a JSON string is rejected.
    fn text(&self) -> Result<Option<&str>, TranslateError> {
        match &self.text {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text)),
            Some(other) => Err(TranslateError::InvalidInput(format!(
                "cannot translate data of type {}",
                json_type(other)
            ))),
        }
    }

    /// Language hints, or `None` when the body carries neither.
    ///
    /// A hint that is not a string counts as unknown and falls back to the
    /// default language.
    fn params(&self) -> Option<TranslationParams> {
        let source = self.source_language.as_ref().filter(|v| !v.is_null());
        let target = self.target_language.as_ref().filter(|v| !v.is_null());
        if source.is_none() && target.is_none() {
            return None;
        }
        Some(TranslationParams {
            source_language: language_hint(source),
            target_language: language_hint(target),
        })
    }
}

fn language_hint(hint: Option<&Value>) -> Option<String> {
    hint.and_then(Value::as_str).map(str::to_string)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Deserialize)]
pub struct PronounceQuery {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PronounceResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub tab: TabId,
    #[serde(default)]
    pub active: bool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(languages))
        .route("/translate", post(translate))
        .route("/selection", post(selection))
        .route("/pronounce", get(pronounce))
        .route("/channels", get(channels))
        .route("/metrics", get(metrics))
        .route("/connect/:peer", get(connect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &Config, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Coordinator listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Coordinator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn languages() -> Json<Vec<LanguageEntry>> {
    Json(LanguageRegistry::google().entries().to_vec())
}

async fn translate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TranslateBody>,
) -> ApiResult<TranslationResult> {
    authorize(&state, &headers)?;

    let text = body
        .text()
        .map_err(translate_error)?
        .ok_or_else(|| translate_error(TranslateError::InvalidInput("missing text".to_string())))?;
    let params = body
        .params()
        .unwrap_or_else(|| state.coordinator.preferences().clone());

    let result = state
        .coordinator
        .translate(text, &params)
        .await
        .map_err(translate_error)?;
    Ok(Json(result))
}

async fn selection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TranslateBody>,
) -> ApiResult<SelectionOutcome> {
    authorize(&state, &headers)?;

    let text = body.text().map_err(translate_error)?;
    let params = body.params();

    let outcome = state
        .coordinator
        .translate_selection(text, params.as_ref())
        .await
        .map_err(translate_error)?;
    Ok(Json(outcome))
}

async fn pronounce(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PronounceQuery>,
) -> ApiResult<PronounceResponse> {
    if query.text.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "text must not be empty"));
    }

    let language = query
        .language
        .as_deref()
        .and_then(Language::resolve)
        .filter(|language| !language.is_auto_detect())
        .unwrap_or(Language::ENGLISH);

    let url = state
        .coordinator
        .translator()
        .pronunciation_url(&query.text, language);
    Ok(Json(PronounceResponse {
        url: url.to_string(),
    }))
}

async fn channels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.channels().live_channels())
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsReport> {
    Json(state.coordinator.metrics().report())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if security::is_authorized(headers, state.api_key.as_deref()) {
        Ok(())
    } else {
        warn!("Rejected request with missing or invalid API key");
        Err(api_error(StatusCode::UNAUTHORIZED, "invalid or missing API key"))
    }
}

/// Upgrade to a WebSocket bound to the channel for `peer`.
///
/// Inactive tabs are refused before the upgrade.
async fn connect(
    State(state): State<Arc<AppState>>,
    Path(peer): Path<String>,
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let context = SenderContext {
        tab_id: query.tab,
        active: query.active,
    };

    if let Err(e) = state.coordinator.channels().admit(&peer, &context) {
        debug!("{}", e);
        return api_error(StatusCode::FORBIDDEN, e.to_string()).into_response();
    }

    ws.on_upgrade(move |socket| run_channel(socket, state, peer, context))
}

fn close_frame(reason: &CloseReason) -> CloseFrame<'static> {
    let (code, reason) = match reason {
        CloseReason::Superseded => (close_code::NORMAL, "superseded".to_string()),
        CloseReason::Disconnected => (close_code::NORMAL, "disconnected".to_string()),
        CloseReason::TransportError(message) => (close_code::ERROR, message.clone()),
    };
    CloseFrame {
        code,
        reason: reason.into(),
    }
}

/// Pump one channel generation over a socket until either side closes it.
async fn run_channel(mut socket: WebSocket, state: Arc<AppState>, peer: String, context: SenderContext) {
    let channels = state.coordinator.channels();
    let mut channel = match channels.request_connect(&peer, context) {
        Ok(channel) => channel,
        Err(e) => {
            warn!("{}", e);
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: e.to_string().into(),
                })))
                .await;
            return;
        }
    };
    let id = channel.id().clone();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = channel.recv() => match event {
                Some(ChannelEvent::Message(message)) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(peer = %id.peer, "Failed to encode page message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        channels.report_error(&id, &e.to_string());
                        return;
                    }
                }
                Some(ChannelEvent::Closed(reason)) => {
                    debug!(peer = %id.peer, generation = id.generation, ?reason, "Closing socket");
                    let _ = sink.send(Message::Close(Some(close_frame(&reason)))).await;
                    return;
                }
                None => return,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Value>(&text) {
                    Ok(message) => {
                        state.coordinator.handle_page_message(&id, &message);
                    }
                    Err(e) => debug!(peer = %id.peer, "Ignoring non-JSON page message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    channels.disconnect_channel(&id);
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    channels.report_error(&id, &e.to_string());
                    return;
                }
            },
        }
    }
}
