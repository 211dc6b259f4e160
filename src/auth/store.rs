//! SQLite-backed credential store.
//!
//! Table:
//! - `users`: register_number (unique, uppercase), name, password_hash, salt, created_at

use crate::error::ApiError;
use parking_lot::Mutex;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Salt byte length for PIN hashing.
const SALT_BYTES: usize = 16;

/// Number of SHA-256 iterations for PIN stretching.
const HASH_ITERATIONS: u32 = 100_000;

/// A registered student account — everything login/registration returns.
/// The PIN hash never leaves the store.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub register_number: String,
}

/// SQLite-backed credential store.
pub struct AuthStore {
    conn: Mutex<rusqlite::Connection>,
}

impl AuthStore {
    /// Open (or create) the database at the given path and ensure the
    /// `users` table exists.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = rusqlite::Connection::open(db_path)?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                register_number TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Register a new student. Returns the stored account.
    ///
    /// The register number is trimmed and uppercased before storage, so
    /// lookups are case-insensitive. Duplicate register numbers surface as
    /// `Conflict` via the UNIQUE constraint — under concurrent registration
    /// exactly one insert wins.
    pub fn register(&self, register_number: &str, name: &str, pin: &str) -> Result<Account, ApiError> {
        let reg_no = register_number.trim().to_uppercase();
        let name = name.trim();
        // Presence check trims, but the PIN is hashed exactly as given so
        // login sees the same bytes.
        if reg_no.is_empty() || name.is_empty() || pin.trim().is_empty() {
            return Err(ApiError::Validation("All fields are required".into()));
        }

        let salt = generate_salt();
        let password_hash = hash_pin(pin, &salt);
        let now = epoch_secs();

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users (register_number, name, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![reg_no, name, password_hash, salt, now],
        );

        match result {
            Ok(_) => Ok(Account {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                register_number: reg_no,
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(ApiError::Conflict("Register Number already registered".into()))
            }
            Err(e) => Err(ApiError::Storage(e)),
        }
    }

    /// Authenticate by register number + PIN. Returns the account on success.
    ///
    /// Both failure modes — unknown register number and wrong PIN — return
    /// the same generic `Auth` error, and the unknown-user path performs a
    /// dummy hash so response timing doesn't reveal which one it was.
    pub fn login(&self, register_number: &str, pin: &str) -> Result<Account, ApiError> {
        let reg_no = register_number.trim().to_uppercase();

        let conn = self.conn.lock();
        let row: Result<(i64, String, String, String), _> = conn.query_row(
            "SELECT id, name, password_hash, salt FROM users WHERE register_number = ?1",
            rusqlite::params![reg_no],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        );

        match row {
            Ok((id, name, stored_hash, salt)) => {
                let attempt_hash = hash_pin(pin, &salt);
                if !constant_time_eq(stored_hash.as_bytes(), attempt_hash.as_bytes()) {
                    return Err(ApiError::Auth);
                }
                Ok(Account {
                    id,
                    name,
                    register_number: reg_no,
                })
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                // Dummy hash to prevent timing side-channel
                let _ = hash_pin(pin, "0000000000000000");
                Err(ApiError::Auth)
            }
            Err(e) => Err(ApiError::Storage(e)),
        }
    }

    /// Count registered users.
    pub fn user_count(&self) -> Result<u64, ApiError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// ── Cryptographic Helpers ───────────────────────────────────────────

/// Generate a random salt (hex-encoded).
fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a PIN with salt using iterated SHA-256.
fn hash_pin(pin: &str, salt: &str) -> String {
    let mut hash = Sha256::new();
    hash.update(salt.as_bytes());
    hash.update(pin.as_bytes());
    let mut result = hash.finalize();

    // Iterated hashing for key stretching
    for _ in 1..HASH_ITERATIONS {
        let mut h = Sha256::new();
        h.update(result);
        h.update(salt.as_bytes());
        result = h.finalize();
    }

    hex::encode(result)
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, AuthStore) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("cgpa.db");
        let store = AuthStore::open(&db_path).unwrap();
        (tmp, store)
    }

    #[test]
    fn register_and_login() {
        let (_tmp, store) = test_store();

        let account = store.register("6108AB12", "Jane", "1234").unwrap();
        assert!(account.id > 0);
        assert_eq!(account.register_number, "6108AB12");

        let logged_in = store.login("6108AB12", "1234").unwrap();
        assert_eq!(logged_in.id, account.id);
        assert_eq!(logged_in.name, "Jane");
    }

    #[test]
    fn register_normalizes_register_number_to_uppercase() {
        let (_tmp, store) = test_store();

        let account = store.register("  6108ab12 ", "Jane", "1234").unwrap();
        assert_eq!(account.register_number, "6108AB12");
    }

    #[test]
    fn login_is_case_insensitive_on_register_number() {
        let (_tmp, store) = test_store();

        let registered = store.register("6108AB12", "Jane", "1234").unwrap();
        let logged_in = store.login("6108ab12", "1234").unwrap();
        assert_eq!(logged_in.id, registered.id);
    }

    #[test]
    fn register_duplicate_register_number_fails() {
        let (_tmp, store) = test_store();

        store.register("6108AB12", "Jane", "1234").unwrap();
        let result = store.register("6108AB12", "John", "5678");
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[test]
    fn register_duplicate_differs_only_in_case_fails() {
        let (_tmp, store) = test_store();

        store.register("6108AB12", "Jane", "1234").unwrap();
        let result = store.register("6108ab12", "John", "5678");
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[test]
    fn register_empty_fields_fail() {
        let (_tmp, store) = test_store();

        assert!(matches!(
            store.register("", "Jane", "1234"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            store.register("6108AB12", "   ", "1234"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            store.register("6108AB12", "Jane", ""),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn login_wrong_pin_fails_generically() {
        let (_tmp, store) = test_store();

        store.register("6108AB12", "Jane", "1234").unwrap();
        let result = store.login("6108AB12", "9999");
        assert!(matches!(result, Err(ApiError::Auth)));
    }

    #[test]
    fn login_unknown_register_number_fails_with_same_error() {
        let (_tmp, store) = test_store();

        let result = store.login("0000ZZ00", "1234");
        assert!(matches!(result, Err(ApiError::Auth)));
    }

    #[test]
    fn user_count_tracks_registrations() {
        let (_tmp, store) = test_store();

        assert_eq!(store.user_count().unwrap(), 0);
        store.register("6108AB12", "Jane", "1234").unwrap();
        assert_eq!(store.user_count().unwrap(), 1);
        store.register("6108AB13", "John", "5678").unwrap();
        assert_eq!(store.user_count().unwrap(), 2);
    }

    #[test]
    fn pin_hash_is_deterministic_with_same_salt() {
        let h1 = hash_pin("1234", "fixed_salt_value");
        let h2 = hash_pin("1234", "fixed_salt_value");
        assert_eq!(h1, h2);
    }

    #[test]
    fn pin_hash_differs_with_different_salt() {
        let h1 = hash_pin("1234", "salt_a");
        let h2 = hash_pin("1234", "salt_b");
        assert_ne!(h1, h2);
    }

    #[test]
    fn pin_hash_does_not_contain_pin() {
        let hash = hash_pin("1234", "salt_a");
        assert!(!hash.contains("1234"));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
