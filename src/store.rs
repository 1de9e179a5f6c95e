//! Saved-form persistence.
//!
//! A small key-value layer over SQLite: the form fields live under fixed
//! keys in one store, the header rows in a second store that is always
//! cleared before being rewritten.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::dispatch::HeaderEntry;
use crate::error::AppError;

const FORM_STORE: &str = "form";
const HEADERS_STORE: &str = "headers";

const KEY_URL: &str = "url";
const KEY_BODY: &str = "body";
const KEY_TRUST_ALL: &str = "trust_all";

/// Form fields as persisted, with defaults for anything never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedForm {
    pub url: String,
    pub body: String,
    pub trust_all: bool,
}

/// Database wrapper for thread-safe access.
pub struct PrefsStore {
    conn: Mutex<Connection>,
}

impl PrefsStore {
    /// Opens (and if needed creates) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        Self::init(Connection::open(path)?)
    }

    /// In-memory store, used by tests and callers without a usable data
    /// directory.
    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, AppError> {
        // WAL keeps concurrent readers out of the writers' way
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS prefs (
                store TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
                PRIMARY KEY (store, key)
            )
            "#,
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Writes the three form fields under their fixed keys.
    pub fn save_form(&self, form: &SavedForm) -> Result<(), AppError> {
        let conn = self.lock()?;
        for (key, value) in [
            (KEY_URL, form.url.as_str()),
            (KEY_BODY, form.body.as_str()),
            (KEY_TRUST_ALL, if form.trust_all { "true" } else { "false" }),
        ] {
            Self::put(&conn, FORM_STORE, key, value)?;
        }
        Ok(())
    }

    /// Reads the form fields; missing keys fall back to empty/false.
    pub fn load_form(&self) -> Result<SavedForm, AppError> {
        let conn = self.lock()?;
        Ok(SavedForm {
            url: Self::get(&conn, FORM_STORE, KEY_URL)?.unwrap_or_default(),
            body: Self::get(&conn, FORM_STORE, KEY_BODY)?.unwrap_or_default(),
            trust_all: Self::get(&conn, FORM_STORE, KEY_TRUST_ALL)?.as_deref() == Some("true"),
        })
    }

    /// Replaces the whole header collection: the old rows are cleared
    /// first, and both steps commit together. Rows with an empty name are
    /// unused form slots and are not persisted.
    pub fn replace_headers(&self, rows: &[HeaderEntry]) -> Result<(), AppError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM prefs WHERE store = ?1", params![HEADERS_STORE])?;
        for row in rows {
            if row.name.is_empty() {
                continue;
            }
            tx.execute(
                r#"
                INSERT INTO prefs (store, key, value, updated_at)
                VALUES (?1, ?2, ?3, strftime('%s', 'now'))
                ON CONFLICT(store, key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = strftime('%s', 'now')
                "#,
                params![HEADERS_STORE, row.name, row.value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Loads the header collection in insertion order. A NULL value comes
    /// back as `None`.
    pub fn load_headers(&self) -> Result<Vec<(String, Option<String>)>, AppError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM prefs WHERE store = ?1 ORDER BY rowid")?;
        let rows = stmt
            .query_map(params![HEADERS_STORE], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn put(conn: &Connection, store: &str, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        conn.execute(
            r#"
            INSERT INTO prefs (store, key, value, updated_at)
            VALUES (?1, ?2, ?3, strftime('%s', 'now'))
            ON CONFLICT(store, key) DO UPDATE SET
                value = excluded.value,
                updated_at = strftime('%s', 'now')
            "#,
            params![store, key, value],
        )?;
        Ok(())
    }

    fn get(conn: &Connection, store: &str, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = conn.prepare("SELECT value FROM prefs WHERE store = ?1 AND key = ?2")?;
        match stmt.query_row(params![store, key], |row| row.get::<_, Option<String>>(0)) {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|err| AppError::Internal(format!("storage lock error: {err}")))
    }
}
