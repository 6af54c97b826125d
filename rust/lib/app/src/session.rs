//! Session token storage.
//!
//! The token is opaque; validity is decided by the server. Backends are
//! swappable behind [`SessionStore`] so the auth orchestrator never knows
//! where the token lives.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Fixed key of the token slot.
pub const TOKEN_KEY: &str = "shortSNS_token";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

pub trait SessionStore: Send + Sync {
    fn save(&self, token: &str) -> Result<(), SessionError>;

    fn get(&self) -> Result<Option<String>, SessionError>;

    /// Clearing an empty slot is not an error.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Process-local slot. Used by tests and by embedders with their own
/// persistence.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { slot: Mutex::new(Some(token.into())) }
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn get(&self) -> Result<Option<String>, SessionError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON object on disk, `{"shortSNS_token": "..."}`. Unknown keys in an
/// existing file are preserved.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, serde_json::Value>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, slots: &BTreeMap<String, serde_json::Value>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(slots)?;
        write_private(&self.path, content.as_bytes())?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, token: &str) -> Result<(), SessionError> {
        let mut slots = self.load()?;
        slots.insert(TOKEN_KEY.to_string(), serde_json::Value::String(token.to_string()));
        self.store(&slots)
    }

    fn get(&self) -> Result<Option<String>, SessionError> {
        Ok(self
            .load()?
            .get(TOKEN_KEY)
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut slots = self.load()?;
        if slots.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.store(&slots)
    }
}

/// The token is a bearer credential: keep it owner-readable only.
#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}
