//! SQLite-backed state store.
//!
//! Table:
//! - `student_data`: user_id (unique, FK → users), calculator_data (JSON text)
//!
//! The document is opaque to the store: it is serialized to text on save and
//! deserialized on load, nothing in between inspects it.

use crate::error::ApiError;
use parking_lot::Mutex;
use std::path::Path;

/// SQLite-backed store for saved calculator documents.
pub struct DataStore {
    conn: Mutex<rusqlite::Connection>,
}

impl DataStore {
    /// Open the database at the given path and ensure the `student_data`
    /// table exists. Expects the `users` table to exist already (the
    /// credential store opens first at startup).
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = rusqlite::Connection::open(db_path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS student_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
                calculator_data TEXT NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Upsert the calculator document for a user. Overwrites any previous
    /// document — last write wins, no history is kept.
    pub fn save(&self, user_id: i64, data: &serde_json::Value) -> Result<(), ApiError> {
        let text = serde_json::to_string(data)
            .map_err(|e| ApiError::Validation(format!("Invalid data payload: {e}")))?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO student_data (user_id, calculator_data)
             VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                calculator_data = excluded.calculator_data",
            rusqlite::params![user_id, text],
        )?;
        Ok(())
    }

    /// Load the calculator document for a user. `None` means the user has
    /// never saved — a normal outcome, not an error.
    pub fn load(&self, user_id: i64) -> Result<Option<serde_json::Value>, ApiError> {
        let conn = self.conn.lock();
        let row: Result<String, _> = conn.query_row(
            "SELECT calculator_data FROM student_data WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        );

        match row {
            Ok(text) => {
                let value = serde_json::from_str(&text).map_err(|e| {
                    // A row we wrote ourselves should always parse; treat
                    // corruption as a storage failure.
                    tracing::error!("corrupt calculator_data for user {user_id}: {e}");
                    ApiError::Storage(rusqlite::Error::InvalidQuery)
                })?;
                Ok(Some(value))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ApiError::Storage(e)),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthStore;
    use serde_json::json;
    use tempfile::TempDir;

    /// Opens both stores on the same file so the FK target exists, and
    /// registers one user whose id the tests can save against.
    fn test_stores() -> (TempDir, DataStore, i64) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("cgpa.db");
        let auth = AuthStore::open(&db_path).unwrap();
        let user = auth.register("6108AB12", "Jane", "1234").unwrap();
        let data = DataStore::open(&db_path).unwrap();
        (tmp, data, user.id)
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_tmp, store, user_id) = test_stores();

        let doc = json!({"sem1": 8.5});
        store.save(user_id, &doc).unwrap();

        let loaded = store.load(user_id).unwrap();
        assert_eq!(loaded, Some(doc));
    }

    #[test]
    fn load_without_save_returns_none() {
        let (_tmp, store, user_id) = test_stores();

        assert_eq!(store.load(user_id).unwrap(), None);
    }

    #[test]
    fn second_save_overwrites_not_appends() {
        let (_tmp, store, user_id) = test_stores();

        store.save(user_id, &json!({"sem1": 8.5})).unwrap();
        store.save(user_id, &json!({"sem1": 9.0, "sem2": 7.5})).unwrap();

        let loaded = store.load(user_id).unwrap();
        assert_eq!(loaded, Some(json!({"sem1": 9.0, "sem2": 7.5})));
    }

    #[test]
    fn arbitrary_json_structures_survive() {
        let (_tmp, store, user_id) = test_stores();

        let doc = json!({
            "semesters": [
                {"name": "sem1", "gpa": 8.5, "credits": 22},
                {"name": "sem2", "gpa": null}
            ],
            "target": 9.1,
            "notes": "유지하자",
        });
        store.save(user_id, &doc).unwrap();
        assert_eq!(store.load(user_id).unwrap(), Some(doc));
    }
}
