//! HTTP error mapping. Every failure renders as `{"message": ...}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::error::{AuthError, ChatError, DatabaseError, UploadError};

pub const SERVER_ERROR_TEXT: &str = "Server error";
pub const LLM_FAILURE_TEXT: &str = "Sorry, I ran into a problem answering that. Please try again.";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_TEXT)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "message": self.message })),
        )
            .into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        error!(error = %err, "Database failure");
        Self::internal()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken => {
                Self::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            AuthError::Hashing(_) => {
                error!(error = %err, "Password hashing failed");
                Self::internal()
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Empty => Self::bad_request("Uploaded file is empty."),
            UploadError::TooLarge { .. } => Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string()),
            UploadError::Io(_) => {
                error!(error = %err, "Upload write failed");
                Self::internal()
            }
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::AccessDenied => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            ChatError::Llm(e) => {
                error!(error = %e, "LLM request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, LLM_FAILURE_TEXT)
            }
            ChatError::Upload(e) => e.into(),
            ChatError::Database(e) => e.into(),
            ChatError::Report(e) => {
                error!(error = %e, "Report generation failed");
                Self::internal()
            }
        }
    }
}
