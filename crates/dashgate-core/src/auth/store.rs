use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{Storage, StoreError};
use crate::models::UserProfile;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key for the JSON-serialized user profile
pub const USER_KEY: &str = "auth_user";

/// Two-slot store for the session token and the user profile.
///
/// Pair operations (`save_session`, `clear_session`, `is_authenticated`) run
/// under one lock, so no caller ever observes a token without its profile
/// mid-write.
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
    pair_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            pair_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The lock guards no data, so a poisoned lock is still usable
        self.pair_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Token =====

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock();
        self.storage.get(TOKEN_KEY)
    }

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.storage.set(TOKEN_KEY, token)
    }

    pub fn remove_token(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.storage.remove(TOKEN_KEY)
    }

    // ===== User =====

    /// Stored profile, or `None` when absent or not well-formed.
    /// Backend failures still surface as errors.
    pub fn user_checked(&self) -> Result<Option<UserProfile>, StoreError> {
        let _guard = self.lock();
        self.read_user()
    }

    /// Stored profile, or `None` when absent, malformed or unreadable.
    pub fn user(&self) -> Option<UserProfile> {
        match self.user_checked() {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user profile");
                None
            }
        }
    }

    pub fn set_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        let _guard = self.lock();
        self.storage.set(USER_KEY, &json)
    }

    pub fn remove_user(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.storage.remove(USER_KEY)
    }

    fn read_user(&self) -> Result<Option<UserProfile>, StoreError> {
        let Some(raw) = self.storage.get(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Stored user profile is malformed, treating as absent");
                Ok(None)
            }
        }
    }

    // ===== Pair =====

    /// True iff both a token and a well-formed profile are stored.
    /// Does not check the token with the server.
    pub fn is_authenticated(&self) -> bool {
        let _guard = self.lock();
        let token = self.storage.get(TOKEN_KEY);
        let user = self.read_user();
        match (token, user) {
            (Ok(Some(_)), Ok(Some(_))) => true,
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to read stored session");
                false
            }
            _ => false,
        }
    }

    /// Write token and profile together, replacing any prior session.
    pub fn save_session(&self, token: &str, user: &UserProfile) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        let _guard = self.lock();

        let previous_token = self.storage.get(TOKEN_KEY)?;
        self.storage.set(TOKEN_KEY, token)?;
        if let Err(e) = self.storage.set(USER_KEY, &json) {
            // Put the prior token back so the prior pair stays intact
            let rollback = match previous_token {
                Some(ref prev) => self.storage.set(TOKEN_KEY, prev),
                None => self.storage.remove(TOKEN_KEY),
            };
            if let Err(rollback) = rollback {
                warn!(error = %rollback, "Failed to roll back token after profile write failed");
            }
            return Err(e);
        }

        debug!(user_id = %user.id, "Session saved");
        Ok(())
    }

    /// Remove token and profile together. Both removals are attempted; the
    /// first failure is returned.
    pub fn clear_session(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        let token = self.storage.remove(TOKEN_KEY);
        let user = self.storage.remove(USER_KEY);
        debug!("Session cleared");
        token.and(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStorage;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn sample_user() -> UserProfile {
        UserProfile {
            id: "1".to_string(),
            email: "a@b.com".to_string(),
            username: "ab".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            phone_number: None,
            account_status: "active".to_string(),
            verified: true,
            roles: vec!["admin".to_string()],
        }
    }

    fn memory_store() -> (Arc<MemoryStorage>, CredentialStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(storage.clone());
        (storage, store)
    }

    /// Backend whose every operation fails.
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(std::io::Error::other("disk unplugged").into())
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk unplugged").into())
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk unplugged").into())
        }
    }

    /// Backend that accepts the token but refuses the profile once
    /// `reject_user` is set.
    struct RejectsUser {
        inner: MemoryStorage,
        reject_user: AtomicBool,
    }

    impl Default for RejectsUser {
        fn default() -> Self {
            Self {
                inner: MemoryStorage::new(),
                reject_user: AtomicBool::new(true),
            }
        }
    }

    impl Storage for RejectsUser {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if key == USER_KEY && self.reject_user.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("quota exceeded").into());
            }
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_save_and_clear_session() {
        let (_, store) = memory_store();
        let user = sample_user();

        store.save_session("t1", &user).unwrap();
        assert!(store.is_authenticated());
        assert_eq!(store.token().unwrap().as_deref(), Some("t1"));
        assert_eq!(store.user(), Some(user));

        store.clear_session().unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.user(), None);
    }

    #[test]
    fn test_new_session_overwrites_prior() {
        let (_, store) = memory_store();
        store.save_session("t1", &sample_user()).unwrap();

        let mut other = sample_user();
        other.id = "2".to_string();
        other.roles.clear();
        store.save_session("t2", &other).unwrap();

        assert_eq!(store.token().unwrap().as_deref(), Some("t2"));
        assert_eq!(store.user(), Some(other));
    }

    #[test]
    fn test_token_only_is_not_authenticated() {
        let (_, store) = memory_store();
        store.set_token("t1").unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_user_only_is_not_authenticated() {
        let (_, store) = memory_store();
        store.set_user(&sample_user()).unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_malformed_user_is_absent() {
        let (storage, store) = memory_store();
        storage.set(USER_KEY, "{not json").unwrap();
        storage.set(TOKEN_KEY, "t1").unwrap();

        assert_eq!(store.user(), None);
        assert!(matches!(store.user_checked(), Ok(None)));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_removes_are_idempotent() {
        let (_, store) = memory_store();
        store.remove_token().unwrap();
        store.remove_user().unwrap();
        store.clear_session().unwrap();
        store.clear_session().unwrap();
    }

    #[test]
    fn test_user_persisted_as_json() {
        let (storage, store) = memory_store();
        store.set_user(&sample_user()).unwrap();

        let raw = storage.get(USER_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["firstName"], "Ada");
    }

    #[test]
    fn test_backend_failure_reads_as_unauthenticated() {
        let store = CredentialStore::new(Arc::new(BrokenStorage));
        assert!(!store.is_authenticated());
        assert_eq!(store.user(), None);
        assert!(store.user_checked().is_err());
        assert!(store.clear_session().is_err());
    }

    #[test]
    fn test_failed_profile_write_rolls_back_token() {
        let storage = Arc::new(RejectsUser::default());
        let store = CredentialStore::new(storage.clone());

        assert!(store.save_session("t1", &sample_user()).is_err());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_failed_profile_write_keeps_prior_session() {
        let storage = Arc::new(RejectsUser::default());
        storage.reject_user.store(false, Ordering::SeqCst);
        let store = CredentialStore::new(storage.clone());
        let prior = sample_user();
        store.save_session("t0", &prior).unwrap();

        storage.reject_user.store(true, Ordering::SeqCst);
        let mut next = sample_user();
        next.id = "2".to_string();
        assert!(store.save_session("t1", &next).is_err());

        assert_eq!(store.token().unwrap().as_deref(), Some("t0"));
        assert_eq!(store.user(), Some(prior));
        assert!(store.is_authenticated());
    }
}
