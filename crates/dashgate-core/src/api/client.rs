//! Session client for the authentication endpoint.
//!
//! One `POST` per login attempt, bounded by a fixed timeout and never retried.
//! Logout is local only: the token is dropped from storage, not revoked.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client};
use tracing::{debug, info, warn};

use super::AuthError;
use crate::auth::{CredentialStore, StoreError};
use crate::config::Config;
use crate::models::{Credentials, LoginRequest, LoginResponse, UserProfile};

/// Login client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SessionClient {
    client: Client,
    login_url: String,
    timeout: Duration,
    store: Arc<CredentialStore>,
}

impl SessionClient {
    pub fn new(
        login_url: impl Into<String>,
        timeout: Duration,
        store: Arc<CredentialStore>,
    ) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::RequestError(e.to_string()))?;

        Ok(Self {
            client,
            login_url: login_url.into(),
            timeout,
            store,
        })
    }

    pub fn from_config(config: &Config, store: Arc<CredentialStore>) -> Result<Self, AuthError> {
        Self::new(config.login_url.clone(), config.request_timeout(), store)
    }

    /// Upper bound for one login attempt, body included.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Exchange credentials for a token and profile without persisting them.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        credentials
            .validate()
            .map_err(|reason| AuthError::RequestError(reason.to_string()))?;

        debug!(email = %credentials.email, url = %self.login_url, "Sending login request");

        let response = self
            .client
            .post(&self.login_url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest::from(credentials))
            .send()
            .await
            .map_err(AuthError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(AuthError::from_transport)?;
            debug!(status = status.as_u16(), body = %AuthError::truncate_body(&body), "Login rejected");
            return Err(AuthError::from_status(status, &body));
        }

        response.json::<LoginResponse>().await.map_err(|e| {
            if e.is_timeout() {
                AuthError::Unreachable(e.to_string())
            } else {
                AuthError::InvalidResponse(e.to_string())
            }
        })
    }

    /// Log in and persist the resulting session, replacing any prior one.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        let LoginResponse { token, user } = self.authenticate(credentials).await?;
        self.store.save_session(&token, &user)?;
        info!(user_id = %user.id, "Login successful");
        Ok(user)
    }

    /// Drop the stored session. No network call is made.
    pub fn logout(&self) -> Result<(), StoreError> {
        let result = self.store.clear_session();
        if let Err(ref e) = result {
            warn!(error = %e, "Failed to clear stored session");
        }
        result
    }

    pub fn bearer_token(&self) -> Option<String> {
        match self.store.token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    /// `Authorization: Bearer <token>` for other API calls, if a token is stored.
    pub fn auth_header(&self) -> Option<header::HeaderMap> {
        let token = self.bearer_token()?;
        let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).ok()?;
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value);
        Some(headers)
    }
}
