//! Session manager for the dashgate analytics dashboard.
//!
//! The crate covers everything between a login form and the protected views:
//!
//! - [`auth`]: durable storage of the session token and user profile
//! - [`api`]: the login exchange with the remote authentication endpoint
//! - [`session`]: the tab-lifetime session context and the access gate
//! - [`models`]: credentials, user profile and wire types
//! - [`config`]: on-disk application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod session;

pub use api::{AuthError, SessionClient};
pub use auth::{CredentialStore, Storage, StoreError};
pub use config::Config;
pub use models::{Credentials, UserProfile};
pub use session::{AccessGate, GateDecision, Navigation, SessionContext, SessionState, SessionStatus};
