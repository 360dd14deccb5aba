use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PasteError>;

#[derive(Error, Debug)]
pub enum PasteError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadInput(String),

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Every prefix of the digest, including the full digest, belongs to a
    /// different value. Only a genuine hash collision gets here.
    #[error("Key conflict: digest {digest} is already registered for another value")]
    Conflict { digest: String },

    #[error("Key derivation for {value} still contended after {attempts} attempts")]
    RetriesExhausted { value: String, attempts: usize },

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PasteError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PasteError::Unauthorized => StatusCode::UNAUTHORIZED,
            PasteError::BadInput(_) => StatusCode::BAD_REQUEST,
            PasteError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PasteError::NotFound(_) => StatusCode::NOT_FOUND,
            PasteError::Conflict { .. }
            | PasteError::RetriesExhausted { .. }
            | PasteError::Storage(_)
            | PasteError::Migration(_)
            | PasteError::Io(_)
            | PasteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for PasteError {
    fn from(err: tokio::task::JoinError) -> Self {
        PasteError::Internal(format!("Task join error: {}", err))
    }
}

impl IntoResponse for PasteError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            // Internals stay in the log, never in the response body
            tracing::error!("{}", self);
            let body = format!("{} Internal Server Error", status.as_u16());
            return (status, body).into_response();
        }
        let body = match &self {
            PasteError::Unauthorized => "401 Unauthorized".to_string(),
            PasteError::NotFound(_) => "404 Not Found".to_string(),
            PasteError::PayloadTooLarge { .. } => "413 Payload Too Large".to_string(),
            other => format!("400 {}", other),
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PasteError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            PasteError::PayloadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            PasteError::NotFound("abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PasteError::Conflict { digest: "00".into() }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
