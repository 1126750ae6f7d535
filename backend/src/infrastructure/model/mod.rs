pub mod sse;

use crate::domain::ports::{CompletionRequest, CompletionResponse, GatewayError, ModelPort, StreamChunk};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            Self::Status {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            Self::Transport(error.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// OpenAI-compatible chat-completion client (Groq by default).
pub struct GroqGateway {
    buffered: Client,
    streaming: Client,
    api_url: String,
    api_key: String,
}

impl GroqGateway {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        anyhow::ensure!(!api_key.trim().is_empty(), "GROQ_API_KEY is required");

        let buffered = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build buffered HTTP client")?;
        // Streams may outlive any fixed timeout; the caller's token bounds them.
        let streaming = Client::builder()
            .connect_timeout(timeout)
            .build()
            .context("failed to build streaming HTTP client")?;

        Ok(Self {
            buffered,
            streaming,
            api_url: api_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl ModelPort for GroqGateway {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn send(
        &self,
        mut request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionResponse, GatewayError> {
        request.stream = false;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending completion request"
        );

        let call = async {
            let response = self
                .buffered
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await?;
            let response = ensure_success(response).await?;
            let body = response.bytes().await?;
            serde_json::from_slice::<CompletionResponse>(&body)
                .map_err(|error| GatewayError::Decode(format!("invalid completion response: {error}")))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::cancelled()),
            result = call => result,
        }
    }

    async fn send_stream(
        &self,
        mut request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamChunk>, GatewayError> {
        request.stream = true;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "opening completion stream"
        );

        let open = async {
            let response = self
                .streaming
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .json(&request)
                .send()
                .await?;
            ensure_success(response).await
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GatewayError::cancelled()),
            response = open => response?,
        };
        Ok(sse::spawn_chunk_reader(response.bytes_stream(), cancel))
    }
}

async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

/// Prefers the structured `{"error": {"message": ...}}` body; falls back to the raw text.
pub fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => {
            tracing::debug!(
                kind = parsed.error.kind.as_deref().unwrap_or(""),
                code = parsed.error.code.as_deref().unwrap_or(""),
                "upstream api error"
            );
            parsed.error.message
        }
        _ => body.trim().to_string(),
    }
}
