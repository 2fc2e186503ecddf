// Persisted session storage
// Three string fields (access token, refresh token, cached user profile)
// backed by a SQLite key-value table or an in-memory map

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::UserSummary;

/// The three persisted session fields. Nothing else is durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    User,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AccessToken => "access_token",
            StoreKey::RefreshToken => "refresh_token",
            StoreKey::User => "user",
        }
    }
}

/// Storage for the persisted session fields.
///
/// Implementations must tolerate concurrent access from multiple in-flight
/// requests; last writer wins on token updates.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: StoreKey) -> Result<Option<String>>;
    fn set(&self, key: StoreKey, value: &str) -> Result<()>;
    fn remove(&self, key: StoreKey) -> Result<()>;

    /// Removes all three fields. Used on logout and on irrecoverable
    /// authentication failure.
    fn clear(&self) -> Result<()>;
}

/// Reads the cached user profile, treating a missing, unreadable or
/// unparseable value as absent. A stale cache must never block startup.
pub fn load_cached_user(store: &dyn SessionStore) -> Option<UserSummary> {
    let raw = match store.get(StoreKey::User) {
        Ok(value) => value?,
        Err(err) => {
            tracing::warn!("Failed to read cached user profile: {:?}", err);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(err) => {
            tracing::debug!("Discarding unparseable cached user profile: {}", err);
            None
        }
    }
}

// ==================================================================================================
// SQLite-backed store
// ==================================================================================================

/// Session storage in a `session_kv` table of a SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the session database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open session database: {}", path.display()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .context("Failed to create session_kv table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Session database lock poisoned"))
    }
}

impl SessionStore for SqliteStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM session_kv WHERE key = ?",
            [key.as_str()],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read session field: {}", key.as_str()))
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO session_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key.as_str(), value],
        )
        .with_context(|| format!("Failed to write session field: {}", key.as_str()))?;
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM session_kv WHERE key = ?", [key.as_str()])
            .with_context(|| format!("Failed to remove session field: {}", key.as_str()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM session_kv", [])
            .context("Failed to clear session storage")?;
        Ok(())
    }
}

// ==================================================================================================
// In-memory store
// ==================================================================================================

/// Ephemeral session storage. Also the substitute used by tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<MutexGuard<'_, HashMap<StoreKey, String>>> {
        self.values
            .lock()
            .map_err(|_| anyhow!("Session store lock poisoned"))
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>> {
        Ok(self.values()?.get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<()> {
        self.values()?.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<()> {
        self.values()?.remove(&key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.values()?.clear();
        Ok(())
    }
}
