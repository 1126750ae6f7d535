use crate::domain::error::StoreError;
use crate::domain::types::{ChatMessage, Project, Role, Task, TaskDraft, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Body of one chat-completion call. `stream` is overwritten by the gateway.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub top_p: f32,
    pub reasoning_effort: String,
    pub stream: bool,
}

/// Sampling parameters applied to every outbound completion request.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub top_p: f32,
    pub reasoning_effort: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "openai/gpt-oss-120b".to_string(),
            temperature: 1.0,
            max_completion_tokens: 8192,
            top_p: 1.0,
            reasoning_effort: "medium".to_string(),
        }
    }
}

impl ModelSettings {
    pub fn request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            messages,
            model: self.model.clone(),
            temperature: self.temperature,
            max_completion_tokens: self.max_completion_tokens,
            top_p: self.top_p,
            reasoning_effort: self.reasoning_effort.clone(),
            stream: false,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Usage,
}

impl CompletionResponse {
    /// Text of the first choice; `None` when it is missing, null or blank.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|content| !content.trim().is_empty())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletionChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: CompletionMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message as returned upstream. Providers send `"content": null`
/// for empty or tool-only turns.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionMessage {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Some(Role::Assistant),
            content: Some(content.into()),
        }
    }
}

/// Failure of one gateway exchange.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Client timeout or caller cancellation.
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("failed to decode upstream payload: {0}")]
    Decode(String),
    #[error("stream interrupted: {0}")]
    Stream(String),
}

impl GatewayError {
    pub fn cancelled() -> Self {
        Self::Timeout("request cancelled".to_string())
    }
}

/// One unit of streamed output. A chunk carrying an error is always terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
    pub error: Option<GatewayError>,
}

impl StreamChunk {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
            error: None,
        }
    }

    pub fn finished() -> Self {
        Self {
            content: String::new(),
            done: true,
            error: None,
        }
    }

    pub fn failed(error: GatewayError) -> Self {
        Self {
            content: String::new(),
            done: true,
            error: Some(error),
        }
    }
}

#[async_trait]
pub trait ModelPort: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionResponse, GatewayError>;

    /// Returns once response headers arrive; the body is decoded in the background.
    async fn send_stream(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamChunk>, GatewayError>;
}

#[async_trait]
pub trait TaskPort: Send + Sync {
    async fn create_task(&self, project_id: Uuid, draft: TaskDraft) -> Result<Task, StoreError>;
    async fn get_task(&self, id: Uuid) -> Result<Task, StoreError>;
    async fn update_task(&self, id: Uuid, draft: TaskDraft) -> Result<Task, StoreError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), StoreError>;
    async fn list_tasks(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError>;
}

#[async_trait]
pub trait ProjectPort: Send + Sync {
    async fn get_project(&self, id: Uuid) -> Result<Project, StoreError>;
}
