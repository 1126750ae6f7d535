//! Shared fixtures and mocks for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use smart_task_backend::application::ChatService;
use smart_task_backend::domain::ports::{
    CompletionChoice, CompletionMessage, CompletionRequest, CompletionResponse, GatewayError,
    ModelPort, ModelSettings, ProjectPort, StreamChunk, TaskPort,
};
use smart_task_backend::domain::types::{Project, Task, TaskDraft, Usage};
use smart_task_backend::domain::StoreError;
use smart_task_backend::infrastructure::store::InMemoryStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

/// ModelPort that replays pre-programmed outcomes, one per call.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<CompletionResponse, GatewayError>>>,
    streams: Mutex<VecDeque<Result<Vec<StreamChunk>, GatewayError>>>,
    /// Captured requests for assertions.
    pub captured: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: one buffered reply with the given assistant text.
    pub fn text(reply: &str) -> Self {
        Self::new().then_reply(Ok(completion(reply)))
    }

    pub fn failing(error: GatewayError) -> Self {
        Self::new().then_reply(Err(error))
    }

    pub fn then_reply(self, reply: Result<CompletionResponse, GatewayError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn then_stream(self, stream: Result<Vec<StreamChunk>, GatewayError>) -> Self {
        self.streams.lock().unwrap().push_back(stream);
        self
    }

    pub fn calls(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    pub fn last_request(&self) -> CompletionRequest {
        self.captured
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("model was not called")
    }
}

#[async_trait]
impl ModelPort for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send(
        &self,
        request: CompletionRequest,
        _cancel: CancellationToken,
    ) -> Result<CompletionResponse, GatewayError> {
        self.captured.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("scripted model exhausted".into())))
    }

    async fn send_stream(
        &self,
        request: CompletionRequest,
        _cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamChunk>, GatewayError> {
        self.captured.lock().unwrap().push(request);
        let chunks = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("scripted model exhausted".into())))?;
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.try_send(chunk).expect("channel sized for script");
        }
        Ok(rx)
    }
}

pub fn completion(content: &str) -> CompletionResponse {
    CompletionResponse {
        id: "chatcmpl-test".into(),
        object: "chat.completion".into(),
        created: 1_700_000_000,
        model: "test-model".into(),
        choices: vec![CompletionChoice {
            index: 0,
            message: CompletionMessage::assistant(content),
            finish_reason: Some("stop".into()),
        }],
        usage: Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
    }
}

// ---------------------------------------------------------------------------
// CountingTasks: TaskPort wrapper that records calls
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct CountingTasks {
    pub inner: InMemoryStore,
    pub creates: Arc<AtomicUsize>,
    pub gets: Arc<AtomicUsize>,
    pub updates: Arc<AtomicUsize>,
    pub deletes: Arc<AtomicUsize>,
    pub lists: Arc<AtomicUsize>,
}

impl CountingTasks {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskPort for CountingTasks {
    async fn create_task(&self, project_id: Uuid, draft: TaskDraft) -> Result<Task, StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_task(project_id, draft).await
    }

    async fn get_task(&self, id: Uuid) -> Result<Task, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_task(id).await
    }

    async fn update_task(&self, id: Uuid, draft: TaskDraft) -> Result<Task, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_task(id, draft).await
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_task(id).await
    }

    async fn list_tasks(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_tasks(project_id).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub struct Fixture {
    pub store: InMemoryStore,
    pub tasks: CountingTasks,
    pub project: Project,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(None).await
    }

    pub async fn with_config(config: Option<Value>) -> Self {
        let store = InMemoryStore::new();
        let project = Project {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            name: "Launch".into(),
            config,
        };
        store.seed_project(project.clone()).await;
        Self {
            tasks: CountingTasks::new(store.clone()),
            store,
            project,
        }
    }

    pub async fn add_task(&self, draft: TaskDraft) -> Task {
        self.store
            .create_task(self.project.id, draft)
            .await
            .expect("seed task")
    }

    pub fn service(&self, model: Arc<dyn ModelPort>) -> ChatService {
        let tasks: Arc<dyn TaskPort> = Arc::new(self.tasks.clone());
        let projects: Arc<dyn ProjectPort> = Arc::new(self.store.clone());
        ChatService::new(model, tasks, projects, ModelSettings::default())
    }
}

/// Drains a chunk receiver until it closes.
pub async fn collect_chunks(mut rx: mpsc::Receiver<StreamChunk>) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    while let Some(chunk) = rx.recv().await {
        chunks.push(chunk);
    }
    chunks
}
