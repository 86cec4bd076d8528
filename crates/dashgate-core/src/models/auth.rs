//! Wire types for the login endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Credentials, UserProfile};

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a Credentials> for LoginRequest<'a> {
    fn from(creds: &'a Credentials) -> Self {
        Self {
            email: &creds.email,
            password: &creds.password,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Body of a non-2xx response. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorBody {
    /// The most specific message the server gave, if any.
    pub fn best_message(&self) -> Option<String> {
        let non_empty = |s: &Option<String>| s.as_ref().filter(|m| !m.trim().is_empty()).cloned();

        non_empty(&self.message)
            .or_else(|| non_empty(&self.error))
            .or_else(|| {
                self.errors.as_ref().and_then(|errors| {
                    errors.iter().find_map(|(field, msgs)| {
                        msgs.first().map(|m| format!("{}: {}", field, m))
                    })
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ErrorBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_best_message_prefers_message() {
        let body = parse(r#"{"message": "bad credentials", "error": "Unauthorized"}"#);
        assert_eq!(body.best_message().as_deref(), Some("bad credentials"));
    }

    #[test]
    fn test_best_message_falls_back_to_error() {
        let body = parse(r#"{"message": "", "error": "Unauthorized"}"#);
        assert_eq!(body.best_message().as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn test_best_message_falls_back_to_field_errors() {
        let body = parse(r#"{"errors": {"email": ["is invalid"]}}"#);
        assert_eq!(body.best_message().as_deref(), Some("email: is invalid"));
    }

    #[test]
    fn test_best_message_empty_body() {
        assert_eq!(parse("{}").best_message(), None);
    }

    #[test]
    fn test_login_request_serializes_credentials() {
        let creds = Credentials::new("a@b.com", "x");
        let json = serde_json::to_value(LoginRequest::from(&creds)).unwrap();
        assert_eq!(json, serde_json::json!({"email": "a@b.com", "password": "x"}));
    }
}
