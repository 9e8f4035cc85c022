//! Route-level error type; every service failure maps onto one HTTP status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    auth::AuthServiceError, ticket_pipeline::TicketPipelineError, tickets::TicketServiceError,
    vision::VisionError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("image analysis failed: {0}")]
    Analysis(VisionError),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Analysis(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            if let ApiError::Internal(source) = &self {
                error!(error = ?source, "request failed");
            }
        }
        let body = Json(ApiResponse::<()>::error(self.to_string()));
        (status, body).into_response()
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(e: AuthServiceError) -> Self {
        match e {
            AuthServiceError::InvalidInput(message) => ApiError::InvalidInput(message),
            AuthServiceError::InvalidCredentials | AuthServiceError::Token(_) => {
                ApiError::Auth(e.to_string())
            }
            AuthServiceError::NotFound => ApiError::NotFound("user not found".to_string()),
            AuthServiceError::Database(source) => ApiError::Internal(anyhow::Error::new(source)),
            AuthServiceError::Hash(message) => ApiError::Internal(anyhow::anyhow!(message)),
        }
    }
}

impl From<TicketServiceError> for ApiError {
    fn from(e: TicketServiceError) -> Self {
        match e {
            TicketServiceError::NotFound => ApiError::NotFound("ticket not found".to_string()),
            TicketServiceError::Forbidden(message) => ApiError::Forbidden(message),
            TicketServiceError::InvalidStatus(value) => ApiError::InvalidInput(format!(
                "invalid status '{value}': must be one of pending, in_progress, resolved, closed"
            )),
            TicketServiceError::Database(source) => ApiError::Internal(anyhow::Error::new(source)),
        }
    }
}

impl From<TicketPipelineError> for ApiError {
    fn from(e: TicketPipelineError) -> Self {
        match e {
            TicketPipelineError::InvalidImage(message) => ApiError::InvalidInput(message),
            TicketPipelineError::Analysis(source) => ApiError::Analysis(source),
            TicketPipelineError::Upload(source) => ApiError::Internal(anyhow::Error::new(source)),
            TicketPipelineError::Persistence(source) => {
                ApiError::Internal(anyhow::Error::new(source))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_expected_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                AuthServiceError::InvalidCredentials.into(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                TicketServiceError::Forbidden("nope".into()).into(),
                StatusCode::FORBIDDEN,
            ),
            (TicketServiceError::NotFound.into(), StatusCode::NOT_FOUND),
            (
                TicketServiceError::InvalidStatus("reopened".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                TicketPipelineError::Analysis(VisionError::Timeout).into(),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected);
        }
    }
}
