// web-server/src/error.rs
use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use common::VanguardError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] VanguardError),

    #[error("No client context; call POST /api/client first")]
    NoClient,

    #[error("Client context expired")]
    ClientExpired,

    #[error("Access denied")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.code(),
            ApiError::NoClient => "no_client",
            ApiError::ClientExpired => "client_expired",
            ApiError::Forbidden => "forbidden",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                VanguardError::Validation(_) | VanguardError::InvalidPhraseFormat { .. } => StatusCode::BAD_REQUEST,
                VanguardError::InvalidCredentials | VanguardError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
                VanguardError::WalletNotFound(_) => StatusCode::NOT_FOUND,
                VanguardError::PhraseMismatch => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NoClient | ApiError::ClientExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Infrastructure details stay in the log
        let message = match self {
            ApiError::Domain(e) if e.is_user_facing() => e.to_string(),
            ApiError::Domain(_) | ApiError::Internal(_) => {
                tracing::error!("{}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(status).json(json!({
            "error": message,
            "code": self.code(),
        }))
    }
}

impl From<BlockingError> for ApiError {
    fn from(e: BlockingError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<actix::MailboxError> for ApiError {
    fn from(e: actix::MailboxError) -> Self {
        ApiError::Internal(format!("client registry unavailable: {}", e))
    }
}
