use crate::application::ChatService;
use crate::domain::chat::{ChatReply, SendMessageRequest};
use crate::domain::ids::{parse_id, PROJECT_ID_PREFIX};
use crate::domain::ports::StreamChunk;
use crate::domain::types::{ChatMessage, Role};
use crate::domain::AppError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const ACCOUNT_HEADER: &str = "x-account-id";

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self { chat }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    #[serde(default)]
    pub session_history: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub now: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/projects/:project_id/chat", post(chat))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        now: Utc::now().to_rfc3339(),
    })
}

async fn chat(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<ChatQuery>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) =
        payload.map_err(|rejection| AppError::invalid_input(rejection.body_text()))?;
    let request = SendMessageRequest {
        project_id: parse_id(&project_id, PROJECT_ID_PREFIX).map_err(AppError::invalid_input)?,
        account_id: account_id(&headers)?,
        content: payload.content,
        history: history(payload.session_history)?,
    };
    tracing::info!(
        project_id = %request.project_id,
        stream = query.stream,
        "api chat request"
    );

    // Dropping the response (client gone) cancels the upstream call.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    if !query.stream {
        let reply: ChatReply = state.chat.send_message(request, cancel).await?;
        drop(guard);
        return Ok(Json(reply).into_response());
    }

    let chunks = state.chat.send_message_stream(request, cancel).await?;
    let events = ReceiverStream::new(chunks).map(move |chunk| {
        let _cancel_on_drop = &guard;
        Ok::<Event, Infallible>(chunk_to_event(chunk))
    });

    Ok(Sse::new(events)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keepalive"),
        )
        .into_response())
}

fn account_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let raw = headers
        .get(ACCOUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::invalid_input("x-account-id header is required"))?;
    Uuid::parse_str(raw).map_err(|_| AppError::invalid_input("x-account-id must be a UUID"))
}

fn history(messages: Vec<HistoryMessage>) -> Result<Vec<ChatMessage>, AppError> {
    messages
        .into_iter()
        .map(|message| {
            let role = Role::parse(&message.role).ok_or_else(|| {
                AppError::invalid_input(format!("unsupported role in session_history: {}", message.role))
            })?;
            Ok(ChatMessage {
                role,
                content: message.content,
            })
        })
        .collect()
}

fn chunk_to_event(chunk: StreamChunk) -> Event {
    if let Some(error) = chunk.error {
        return Event::default().event("error").data(sse_safe(&error.to_string()));
    }
    if chunk.done {
        return Event::default().event("done").data("[DONE]");
    }
    Event::default().data(sse_safe(&chunk.content))
}

/// SSE frames cannot carry carriage returns.
fn sse_safe(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
