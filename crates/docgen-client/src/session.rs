use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use docgen_types::models::User;

use crate::error::ClientError;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Durable string key-value storage for the client session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.dir.join(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        std::fs::write(self.dir.join(key), value)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.dir.join(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("session store lock poisoned"))
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.map()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.map()?.remove(key);
        Ok(())
    }
}

/// Bearer token plus the account it was issued for.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    token: String,
    user: User,
}

impl Session {
    pub fn new(token: String, user: User) -> Self {
        Self { token, user }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    pub fn persist(&self, store: &dyn SessionStore) -> Result<(), ClientError> {
        let user = serde_json::to_string(&self.user)
            .map_err(|e| ClientError::Storage(io::Error::other(e)))?;
        store.set(TOKEN_KEY, &self.token)?;
        store.set(USER_KEY, &user)?;
        Ok(())
    }

    /// Load a stored session. A cached user that no longer parses wipes the
    /// stored session and yields `None`.
    pub fn restore(store: &dyn SessionStore) -> Result<Option<Self>, ClientError> {
        let (Some(token), Some(raw_user)) = (store.get(TOKEN_KEY)?, store.get(USER_KEY)?) else {
            return Ok(None);
        };

        match serde_json::from_str::<User>(&raw_user) {
            Ok(user) if !token.is_empty() => {
                info!("Restored session for {}", user.email);
                Ok(Some(Self { token, user }))
            }
            Ok(_) => {
                Self::clear(store)?;
                Ok(None)
            }
            Err(e) => {
                warn!("Discarding unreadable stored session: {}", e);
                Self::clear(store)?;
                Ok(None)
            }
        }
    }

    pub fn clear(store: &dyn SessionStore) -> Result<(), ClientError> {
        store.remove(TOKEN_KEY)?;
        store.remove(USER_KEY)?;
        Ok(())
    }

    /// Destroy the session and its stored copy.
    pub fn logout(self, store: &dyn SessionStore) -> Result<(), ClientError> {
        info!("Logging out {}", self.user.email);
        Self::clear(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgen_types::models::Role;

    fn session() -> Session {
        Session::new(
            "tok-123".into(),
            User {
                id: uuid::Uuid::new_v4(),
                email: "ola@example.com".into(),
                username: Some("ola".into()),
                role: Role::User,
                is_active: true,
                documents_generated: 0,
                created_at: "2026-01-02T03:04:05Z".parse().unwrap(),
                last_login: None,
            },
        )
    }

    #[test]
    fn persist_and_restore() {
        let store = MemoryStore::new();
        assert_eq!(Session::restore(&store).unwrap(), None);

        let s = session();
        s.persist(&store).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-123"));
        assert_eq!(Session::restore(&store).unwrap(), Some(s));
    }

    #[test]
    fn corrupt_user_clears_both_keys() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "tok").unwrap();
        store.set(USER_KEY, "{not json").unwrap();

        assert_eq!(Session::restore(&store).unwrap(), None);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn logout_removes_token_and_user() {
        let store = MemoryStore::new();
        let s = session();
        s.persist(&store).unwrap();
        s.logout(&store).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("docgen_session_{}", uuid::Uuid::new_v4()));
        let s = session();
        s.persist(&FileStore::new(&dir).unwrap()).unwrap();

        let reopened = FileStore::new(&dir).unwrap();
        assert_eq!(Session::restore(&reopened).unwrap(), Some(s));
        Session::clear(&reopened).unwrap();
        Session::clear(&reopened).unwrap();
        assert_eq!(reopened.get(USER_KEY).unwrap(), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
