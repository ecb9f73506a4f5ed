use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Storage key for the bearer token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the remember-me flag
pub const REMEMBER_ME_KEY: &str = "remember_me";

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Keychain service name for the keyring-backed store
const SERVICE_NAME: &str = "freewave-client";

/// Durable storage for the access token and the remember-me flag.
///
/// Exactly one token is live at a time: writing replaces it, `clear` removes
/// both keys. The remember-me flag is persisted but nothing branches on it.
pub trait TokenStore: Send + Sync {
    /// Currently persisted access token, if any.
    fn token(&self) -> Option<String>;

    /// Persist a new token, replacing any previous one.
    fn set_token(&self, token: &str) -> Result<()>;

    fn remember_me(&self) -> bool;

    fn set_remember_me(&self, remember: bool) -> Result<()>;

    /// Remove the token and the remember-me flag.
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    access_token: Option<String>,
    remember_me: bool,
    /// Last token write. Diagnostic only; no expiry is derived from it.
    saved_at: DateTime<Utc>,
}

impl Default for SessionFile {
    fn default() -> Self {
        Self {
            access_token: None,
            remember_me: false,
            saved_at: Utc::now(),
        }
    }
}

/// Token storage backed by a JSON file in the application data directory.
pub struct FileTokenStore {
    data_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    fn read(&self) -> Option<SessionFile> {
        let path = self.session_path();
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(error = %e, "discarding unreadable session file");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to read session file");
                None
            }
        }
    }

    fn write(&self, file: &SessionFile) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(file)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        self.read().and_then(|file| file.access_token)
    }

    fn set_token(&self, token: &str) -> Result<()> {
        let mut file = self.read().unwrap_or_default();
        file.access_token = Some(token.to_string());
        file.saved_at = Utc::now();
        self.write(&file)
    }

    fn remember_me(&self) -> bool {
        self.read().map(|file| file.remember_me).unwrap_or(false)
    }

    fn set_remember_me(&self, remember: bool) -> Result<()> {
        let mut file = self.read().unwrap_or_default();
        file.remember_me = remember;
        self.write(&file)
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// Token storage in the OS keychain.
///
/// Each fixed storage key maps to a keyring entry under the crate's service
/// name.
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    fn entry(key: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, key).context("Failed to create keyring entry")
    }
}

impl TokenStore for KeyringTokenStore {
    fn token(&self) -> Option<String> {
        Self::entry(ACCESS_TOKEN_KEY).ok()?.get_password().ok()
    }

    fn set_token(&self, token: &str) -> Result<()> {
        Self::entry(ACCESS_TOKEN_KEY)?
            .set_password(token)
            .context("Failed to store access token in keychain")
    }

    fn remember_me(&self) -> bool {
        Self::entry(REMEMBER_ME_KEY)
            .ok()
            .and_then(|entry| entry.get_password().ok())
            .map(|value| value == "true")
            .unwrap_or(false)
    }

    fn set_remember_me(&self, remember: bool) -> Result<()> {
        Self::entry(REMEMBER_ME_KEY)?
            .set_password(if remember { "true" } else { "false" })
            .context("Failed to store remember-me flag in keychain")
    }

    fn clear(&self) -> Result<()> {
        for key in [ACCESS_TOKEN_KEY, REMEMBER_ME_KEY] {
            match Self::entry(key)?.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    return Err(e).context("Failed to delete credential from keychain");
                }
            }
        }
        Ok(())
    }
}

/// In-memory token storage for tests and embedded hosts.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    token: Option<String>,
    remember_me: bool,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.inner.lock().ok()?.token.clone()
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.locked()?.token = Some(token.to_string());
        Ok(())
    }

    fn remember_me(&self) -> bool {
        self.inner
            .lock()
            .map(|state| state.remember_me)
            .unwrap_or(false)
    }

    fn set_remember_me(&self, remember: bool) -> Result<()> {
        self.locked()?.remember_me = remember;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.locked()?;
        state.token = None;
        state.remember_me = false;
        Ok(())
    }
}
