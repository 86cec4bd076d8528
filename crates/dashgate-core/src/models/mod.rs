//! Data models for the session subsystem.
//!
//! - `Credentials`: transient email/password pair for one login attempt
//! - `UserProfile`: the user snapshot returned at login and persisted
//! - Wire types for the login endpoint: `LoginRequest`, `LoginResponse`, `ErrorBody`

pub mod auth;
pub mod user;

pub use auth::{ErrorBody, LoginRequest, LoginResponse};
pub use user::{Credentials, UserProfile};
