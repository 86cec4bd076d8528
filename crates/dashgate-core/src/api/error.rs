use thiserror::Error;

use crate::auth::StoreError;
use crate::models::ErrorBody;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{message}")]
    InvalidCredentials { status: u16, message: String },

    #[error("{message}")]
    ServerRejected { status: u16, message: String },

    #[error("Authentication server unreachable: {0}")]
    Unreachable(String),

    #[error("Could not send login request: {0}")]
    RequestError(String),

    #[error("Invalid response from authentication server: {0}")]
    InvalidResponse(String),

    #[error("Failed to persist session: {0}")]
    Storage(#[from] StoreError),

    #[error("Login superseded by a newer attempt")]
    Superseded,
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.best_message())
            .unwrap_or_else(|| format!("login failed: status {}", status.as_u16()));

        match status.as_u16() {
            401 | 403 => AuthError::InvalidCredentials {
                status: status.as_u16(),
                message,
            },
            code => AuthError::ServerRejected {
                status: code,
                message,
            },
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            AuthError::RequestError(err.to_string())
        } else {
            AuthError::Unreachable(err.to_string())
        }
    }

    /// One-line text suitable for showing next to the login form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials { message, .. }
            | AuthError::ServerRejected { message, .. } => message.clone(),
            AuthError::Unreachable(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            AuthError::Superseded => "A newer login attempt replaced this one.".to_string(),
            AuthError::RequestError(reason) => format!("Login failed: {}", reason),
            other => format!("Login failed: {}", other),
        }
    }
}
