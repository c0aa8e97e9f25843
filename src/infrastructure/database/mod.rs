//! SQLite-backed user store (roles and bans)

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::application::errors::StorageError;
use crate::domain::entities::Role;
use crate::domain::traits::UserStore;

pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                jid TEXT PRIMARY KEY,
                role TEXT NOT NULL DEFAULT 'user',
                banned INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Internal("database lock poisoned".to_string()))
    }
}

impl UserStore for SqliteUserStore {
    fn role_of(&self, user_id: &str) -> Result<Option<Role>, StorageError> {
        let conn = self.lock()?;
        let role: Option<String> = conn
            .query_row(
                "SELECT role FROM users WHERE jid = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(role.and_then(|r| match r.parse() {
            Ok(role) => Some(role),
            Err(_) => {
                warn!(user = %user_id, role = %r, "unknown role in store, ignoring");
                None
            }
        }))
    }

    fn set_role(&self, user_id: &str, role: Role) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (jid, role) VALUES (?1, ?2)
             ON CONFLICT(jid) DO UPDATE SET role = ?2",
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    fn is_banned(&self, user_id: &str) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let banned: Option<i64> = conn
            .query_row(
                "SELECT banned FROM users WHERE jid = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(banned.unwrap_or(0) != 0)
    }

    fn set_banned(&self, user_id: &str, banned: bool) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (jid, banned) VALUES (?1, ?2)
             ON CONFLICT(jid) DO UPDATE SET banned = ?2",
            params![user_id, banned as i64],
        )?;
        Ok(())
    }
}

/// In-memory user store for tests and console mode
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, (Option<Role>, bool)>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn role_of(&self, user_id: &str) -> Result<Option<Role>, StorageError> {
        Ok(self
            .users
            .read()
            .ok()
            .and_then(|u| u.get(user_id).and_then(|(role, _)| *role)))
    }

    fn set_role(&self, user_id: &str, role: Role) -> Result<(), StorageError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StorageError::Internal("store lock poisoned".to_string()))?;
        users.entry(user_id.to_string()).or_default().0 = Some(role);
        Ok(())
    }

    fn is_banned(&self, user_id: &str) -> Result<bool, StorageError> {
        Ok(self
            .users
            .read()
            .ok()
            .map(|u| u.get(user_id).map(|(_, banned)| *banned).unwrap_or(false))
            .unwrap_or(false))
    }

    fn set_banned(&self, user_id: &str, banned: bool) -> Result<(), StorageError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StorageError::Internal("store lock poisoned".to_string()))?;
        users.entry(user_id.to_string()).or_default().1 = banned;
        Ok(())
    }
}
