//! Login client for the dashboard's authentication endpoint.
//!
//! This module provides the `SessionClient`, which performs the single
//! credential exchange with the server, persists the resulting session
//! through the `CredentialStore`, and derives the bearer header other API
//! calls attach.

pub mod client;
pub mod error;

pub use client::SessionClient;
pub use error::AuthError;
