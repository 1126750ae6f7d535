use crate::domain::ports::GatewayError;
use crate::domain::{AppError, ErrorCode, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamFailure {
    Timeout,
    RateLimited,
    AuthError,
    Unavailable,
}

impl UpstreamFailure {
    pub fn code(self) -> ErrorCode {
        match self {
            Self::Timeout => ErrorCode::UpstreamTimeout,
            Self::RateLimited => ErrorCode::UpstreamRateLimited,
            Self::AuthError => ErrorCode::UpstreamAuthError,
            Self::Unavailable => ErrorCode::UpstreamUnavailable,
        }
    }

    fn public_message(self) -> &'static str {
        match self {
            Self::Timeout => "AI response timed out",
            Self::RateLimited => "too many requests to the AI service",
            Self::AuthError => "AI service configuration error",
            Self::Unavailable => "AI service temporarily unavailable",
        }
    }
}

const STATUS_TABLE: [(u16, UpstreamFailure); 3] = [
    (429, UpstreamFailure::RateLimited),
    (401, UpstreamFailure::AuthError),
    (503, UpstreamFailure::Unavailable),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectFailure {
    NotFound,
    Internal,
}

/// Anything not listed falls back to `Unavailable`.
pub fn classify_gateway(error: &GatewayError) -> UpstreamFailure {
    match error {
        GatewayError::Timeout(_) => UpstreamFailure::Timeout,
        GatewayError::Status { status, .. } => STATUS_TABLE
            .iter()
            .find(|(code, _)| code == status)
            .map(|(_, kind)| *kind)
            .unwrap_or(UpstreamFailure::Unavailable),
        GatewayError::Transport(_) | GatewayError::Decode(_) | GatewayError::Stream(_) => {
            UpstreamFailure::Unavailable
        }
    }
}

pub fn classify_project(error: &StoreError) -> ProjectFailure {
    match error {
        StoreError::NotFound(_) => ProjectFailure::NotFound,
        StoreError::Invalid(_) | StoreError::Internal(_) => ProjectFailure::Internal,
    }
}

pub fn gateway_app_error(error: &GatewayError) -> AppError {
    let kind = classify_gateway(error);
    tracing::warn!(kind = ?kind, error = %error, "model gateway call failed");
    AppError::new(kind.code(), kind.public_message())
}

pub fn project_app_error(error: &StoreError) -> AppError {
    match classify_project(error) {
        ProjectFailure::NotFound => AppError::project_not_found("project not found"),
        ProjectFailure::Internal => {
            tracing::error!(error = %error, "project lookup failed");
            AppError::internal("failed to load project")
        }
    }
}
