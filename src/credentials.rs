//! Durable storage for the bearer token and the user id it belongs to.
//!
//! Both values are written, read and removed together. A store with no backing
//! location behaves like one that has never seen a login.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::io::{self, Write};
use std::sync::Mutex;

pub const CREDENTIALS_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
        }
    }
}

pub trait CredentialStore: Send + Sync {
    fn save(&self, credentials: &Credentials);

    /// Returns both values or nothing.
    fn read(&self) -> Option<Credentials>;

    fn clear(&self);
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// JSON file holding the credentials with a shared expiry.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: Option<PathBuf>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A store with nowhere to write. Every read is absent.
    pub fn unavailable() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn save_at(&self, credentials: &Credentials, now: DateTime<Utc>) {
        let Some(path) = &self.path else {
            tracing::debug!("No credential storage available, not saving");
            return;
        };
        let stored = StoredCredentials {
            token: credentials.token.clone(),
            user_id: credentials.user_id.clone(),
            expires_at: now + Duration::days(CREDENTIALS_TTL_DAYS),
        };
        let json = match serde_json::to_string_pretty(&stored) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!("Failed to encode credentials: {}", err);
                return;
            }
        };
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                tracing::warn!("Failed to create {}: {}", parent.display(), err);
                return;
            }
        }
        if let Err(err) = write_private(path, json.as_bytes()) {
            tracing::warn!("Failed to save credentials to {}: {}", path.display(), err);
        }
    }

    fn read_at(&self, now: DateTime<Utc>) -> Option<Credentials> {
        let path = self.path.as_ref()?;
        let data = fs::read_to_string(path).ok()?;
        let stored: StoredCredentials = match serde_json::from_str(&data) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!("Ignoring unreadable credential file {}: {}", path.display(), err);
                return None;
            }
        };
        if stored.expires_at <= now {
            tracing::info!("Stored credentials expired at {}", stored.expires_at);
            self.clear();
            return None;
        }
        if stored.token.is_empty() || stored.user_id.is_empty() {
            return None;
        }
        Some(Credentials::new(stored.token, stored.user_id))
    }
}

/// Writes the file readable by its owner only. An existing file is narrowed too.
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, credentials: &Credentials) {
        self.save_at(credentials, Utc::now());
    }

    fn read(&self) -> Option<Credentials> {
        self.read_at(Utc::now())
    }

    fn clear(&self) {
        let Some(path) = &self.path else {
            return;
        };
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!("Failed to remove {}: {}", path.display(), err),
        }
    }
}

/// Process-local store, used by tests and by callers that never persist a login.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: Credentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, credentials: &Credentials) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(credentials.clone());
        }
    }

    fn read(&self) -> Option<Credentials> {
        self.inner.lock().ok().and_then(|slot| slot.clone())
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = None;
        }
    }
}
