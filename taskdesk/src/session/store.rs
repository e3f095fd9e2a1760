//! Credential persistence.
//!
//! The session lives in two string entries, `token` and `user` (the user
//! record serialized as JSON), mirroring browser key-value storage. Both
//! entries are written together and removed together. A missing or
//! malformed entry reads as "no session" so that every consumer fails
//! closed to unauthenticated.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use taskdesk_proto::user::User;

/// Key of the raw token entry.
pub const TOKEN_KEY: &str = "token";
/// Key of the serialized user entry.
pub const USER_KEY: &str = "user";

/// Errors raised while writing credentials.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The credential file could not be written or removed.
    #[error("failed to write credentials at {path}: {source}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The user record could not be serialized.
    #[error("failed to encode user record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A stored session: token plus the cached user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Raw token sent in the `Authorization` header.
    pub token: String,
    /// User record cached at login or last profile fetch.
    pub user: User,
}

impl Credentials {
    /// Rebuilds a session from the two raw entries.
    ///
    /// Returns `None` unless the token is non-blank and the user entry
    /// parses.
    #[must_use]
    pub fn from_entries(token: Option<&str>, user: Option<&str>) -> Option<Self> {
        let token = token.filter(|t| !t.trim().is_empty())?;
        let user = match serde_json::from_str::<User>(user?) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "stored user record is malformed; treating session as absent");
                return None;
            }
        };
        Some(Self {
            token: token.to_string(),
            user,
        })
    }
}

/// Process-wide session persistence, injected into every consumer.
///
/// Writes are synchronous and write-through. Implementations must never
/// leave one entry updated without the other.
pub trait CredentialStore: Send + Sync {
    /// The stored session, or `None` if absent or unreadable.
    fn read(&self) -> Option<Credentials>;

    /// Overwrites both entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the session could not be persisted; in
    /// that case the previous entries are left untouched.
    fn save(&self, token: &str, user: &User) -> Result<(), StoreError>;

    /// Removes both entries. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage could not be modified.
    fn clear(&self) -> Result<(), StoreError>;

    /// Shortcut for the stored token.
    fn token(&self) -> Option<String> {
        self.read().map(|c| c.token)
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given raw entries, which need not be
    /// well-formed.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Raw value of one entry.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&self) -> Option<Credentials> {
        let entries = self.entries.lock();
        Credentials::from_entries(
            entries.get(TOKEN_KEY).map(String::as_str),
            entries.get(USER_KEY).map(String::as_str),
        )
    }

    fn save(&self, token: &str, user: &User) -> Result<(), StoreError> {
        let user = serde_json::to_string(user)?;
        let mut entries = self.entries.lock();
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        entries.insert(USER_KEY.to_string(), user);
        drop(entries);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.remove(TOKEN_KEY);
        entries.remove(USER_KEY);
        drop(entries);
        Ok(())
    }
}

/// File-backed store surviving restarts.
///
/// The file holds a JSON object of string entries. Saves go through a
/// temporary file in the same directory and an atomic rename, so a crash
/// mid-write leaves the previous session intact.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store at `path`; the file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the credential file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_entries(&self) -> Option<BTreeMap<String, String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read credential file");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "credential file is malformed");
                None
            }
        }
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&self) -> Option<Credentials> {
        let entries = self.load_entries()?;
        Credentials::from_entries(
            entries.get(TOKEN_KEY).map(String::as_str),
            entries.get(USER_KEY).map(String::as_str),
        )
    }

    fn save(&self, token: &str, user: &User) -> Result<(), StoreError> {
        let mut entries = BTreeMap::new();
        entries.insert(TOKEN_KEY, token.to_string());
        entries.insert(USER_KEY, serde_json::to_string(user)?);
        let contents = serde_json::to_vec_pretty(&entries)?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;

        // Temp files are created with 0600 permissions on unix.
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;
        tmp.write_all(&contents).map_err(|e| self.write_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;

        tracing::debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "credentials cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.write_error(e)),
        }
    }
}
