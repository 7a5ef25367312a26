//! Session credential storage.
//!
//! Workers write the credential after a successful sign-in or registration
//! and erase it when the stored one fails verification or on sign-out.
//! Nothing inside the coordinator reads it back; the HTTP gateway does.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Storage for the opaque session token
pub trait SessionStore: Send + Sync {
    /// Persist a freshly issued token, replacing any previous one
    fn store(&self, token: &str) -> Result<()>;

    /// Erase the stored token (no-op if none)
    fn clear(&self) -> Result<()>;

    /// Current token, if any
    fn token(&self) -> Option<String>;
}

/// In-memory store, for tests and short-lived processes
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already present
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn store(&self, token: &str) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;
        *guard = None;
        Ok(())
    }

    fn token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }
}

/// Token kept in a single file (`$ONBOARD_HOME/session.token` by default)
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured location
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::config()?.session_token_file.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.path, token)
            .with_context(|| format!("Failed to write session token: {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove session token: {}", self.path.display())
            }),
        }
    }

    fn token(&self) -> Option<String> {
        let token = std::fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemorySessionStore::new();
        assert_eq!(store.token(), None);

        store.store("abc").unwrap();
        assert_eq!(store.token(), Some("abc".to_string()));

        store.clear().unwrap();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_file_store_lifecycle() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("nested").join("session.token"));

        assert_eq!(store.token(), None);
        store.store("jwt-1").unwrap();
        assert_eq!(store.token(), Some("jwt-1".to_string()));

        store.store("jwt-2").unwrap();
        assert_eq!(store.token(), Some("jwt-2".to_string()));

        store.clear().unwrap();
        assert_eq!(store.token(), None);

        // Clearing twice is fine
        store.clear().unwrap();
    }
}
