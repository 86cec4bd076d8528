//! Durable persistence for the session token and user profile.
//!
//! This module provides:
//! - `Storage`: the key/value backend trait, with file, OS keychain and
//!   in-memory implementations
//! - `CredentialStore`: the two-slot (token, user) store built on a backend
//!
//! Nothing here talks to the network; the store trusts what it holds until
//! the next login or logout.

pub mod error;
pub mod storage;
pub mod store;

pub use error::StoreError;
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, Storage};
pub use store::{CredentialStore, TOKEN_KEY, USER_KEY};
