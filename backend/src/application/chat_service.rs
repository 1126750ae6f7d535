use crate::application::classifier::{gateway_app_error, project_app_error};
use crate::application::confirmations;
use crate::application::dispatcher::ActionDispatcher;
use crate::application::interpreter::ResponseInterpreter;
use crate::application::prompt_builder::PromptBuilder;
use crate::domain::chat::{ChatReply, ReplyKind, SendMessageRequest, StructuredReply};
use crate::domain::config::AssistantConfig;
use crate::domain::ports::{ModelPort, ModelSettings, ProjectPort, StreamChunk, TaskPort};
use crate::domain::types::ChatMessage;
use crate::domain::AppError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Orchestration stages, recorded in logs as a request moves through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatStage {
    Validating,
    BuildingPrompt,
    AwaitingModel,
    Interpreting,
    Dispatching,
    Responding,
    Failed,
}

impl ChatStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::BuildingPrompt => "building_prompt",
            Self::AwaitingModel => "awaiting_model",
            Self::Interpreting => "interpreting",
            Self::Dispatching => "dispatching",
            Self::Responding => "responding",
            Self::Failed => "failed",
        }
    }
}

struct PreparedChat {
    config: AssistantConfig,
    messages: Vec<ChatMessage>,
}

#[derive(Clone)]
pub struct ChatService {
    model: Arc<dyn ModelPort>,
    tasks: Arc<dyn TaskPort>,
    projects: Arc<dyn ProjectPort>,
    settings: ModelSettings,
    prompts: PromptBuilder,
    interpreter: ResponseInterpreter,
    dispatcher: ActionDispatcher,
}

impl ChatService {
    pub fn new(
        model: Arc<dyn ModelPort>,
        tasks: Arc<dyn TaskPort>,
        projects: Arc<dyn ProjectPort>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            dispatcher: ActionDispatcher::new(tasks.clone()),
            model,
            tasks,
            projects,
            settings,
            prompts: PromptBuilder::new(),
            interpreter: ResponseInterpreter::new(),
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub async fn send_message(
        &self,
        request: SendMessageRequest,
        cancel: CancellationToken,
    ) -> Result<ChatReply, AppError> {
        let project_id = request.project_id;
        let prepared = self.prepare(&request).await.inspect_err(|error| failed(project_id, error))?;

        enter(ChatStage::AwaitingModel, project_id);
        let response = self
            .model
            .send(self.settings.request(prepared.messages), cancel)
            .await
            .map_err(|error| gateway_app_error(&error))
            .inspect_err(|error| failed(project_id, error))?;
        tracing::info!(
            project_id = %project_id,
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "model reply received"
        );

        let Some(text) = response.first_content() else {
            let error = AppError::internal("no response from AI");
            failed(project_id, &error);
            return Err(error);
        };

        enter(ChatStage::Interpreting, project_id);
        let reply = match self.interpreter.interpret(text) {
            None => ChatReply::text(text),
            Some(StructuredReply::Text { message }) => ChatReply::text(message),
            Some(StructuredReply::TaskList { message, tasks }) => ChatReply {
                kind: ReplyKind::TaskList,
                message,
                tasks: Some(tasks),
                task_actions: Vec::new(),
            },
            Some(StructuredReply::Action { call }) => {
                enter(ChatStage::Dispatching, project_id);
                let result = self.dispatcher.execute(project_id, &call).await;
                ChatReply {
                    kind: ReplyKind::Action,
                    message: confirmations::render(prepared.config.is_thai(), &call.name, &result),
                    tasks: None,
                    task_actions: result.action.into_iter().collect(),
                }
            }
        };

        enter(ChatStage::Responding, project_id);
        tracing::info!(
            project_id = %project_id,
            kind = ?reply.kind,
            task_actions = reply.task_actions.len(),
            reply_chars = reply.message.chars().count(),
            "chat reply ready"
        );
        Ok(reply)
    }

    /// Streamed replies are forwarded as-is; they are never interpreted as actions.
    pub async fn send_message_stream(
        &self,
        request: SendMessageRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamChunk>, AppError> {
        let project_id = request.project_id;
        let prepared = self.prepare(&request).await.inspect_err(|error| failed(project_id, error))?;

        enter(ChatStage::AwaitingModel, project_id);
        let chunks = self
            .model
            .send_stream(self.settings.request(prepared.messages), cancel)
            .await
            .map_err(|error| gateway_app_error(&error))
            .inspect_err(|error| failed(project_id, error))?;

        enter(ChatStage::Responding, project_id);
        Ok(chunks)
    }

    async fn prepare(&self, request: &SendMessageRequest) -> Result<PreparedChat, AppError> {
        enter(ChatStage::Validating, request.project_id);
        validate(request)?;
        tracing::info!(
            project_id = %request.project_id,
            history_len = request.history.len(),
            message_chars = request.content.chars().count(),
            "chat request accepted"
        );

        enter(ChatStage::BuildingPrompt, request.project_id);
        let project = self
            .projects
            .get_project(request.project_id)
            .await
            .map_err(|error| project_app_error(&error))?;
        if project.account_id != request.account_id {
            tracing::warn!(project_id = %project.id, "project requested by another account");
            return Err(AppError::project_not_found("project not found"));
        }

        let tasks = self.tasks.list_tasks(project.id).await.map_err(|error| {
            tracing::error!(project_id = %project.id, error = %error, "failed to list tasks");
            AppError::internal("failed to get tasks")
        })?;

        let config = AssistantConfig::from_project_config(project.config.as_ref());
        let system_prompt = self.prompts.build(&config, &tasks);
        tracing::debug!(
            project_id = %project.id,
            task_count = tasks.len(),
            prompt_chars = system_prompt.chars().count(),
            "system prompt built"
        );

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(request.history.iter().cloned());
        messages.push(ChatMessage::user(request.content.clone()));

        Ok(PreparedChat { config, messages })
    }
}

fn validate(request: &SendMessageRequest) -> Result<(), AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::invalid_input("message content is required"));
    }
    if request.project_id == Uuid::nil() {
        return Err(AppError::invalid_input("project ID is required"));
    }
    if request.account_id == Uuid::nil() {
        return Err(AppError::invalid_input("account ID is required"));
    }
    Ok(())
}

fn enter(stage: ChatStage, project_id: Uuid) {
    tracing::debug!(stage = stage.as_str(), project_id = %project_id, "chat stage");
}

fn failed(project_id: Uuid, error: &AppError) {
    tracing::warn!(
        stage = ChatStage::Failed.as_str(),
        project_id = %project_id,
        code = error.code_str(),
        error = %error.message(),
        "chat request failed"
    );
}
