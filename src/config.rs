//! Environment-driven configuration.
//!
//! Both `DATABASE_URL` and `SECRET_KEY` ship with insecure development
//! defaults; a production deployment must override them. `Config::load`
//! warns about every default it falls back to.

use std::path::PathBuf;

/// Fallback database when `DATABASE_URL` is unset (local development).
const DEFAULT_DATABASE: &str = "cgpa_calculator.db";

/// Fallback secret when `SECRET_KEY` is unset. Never deploy with this.
pub const DEFAULT_SECRET_KEY: &str = "super-secret-key";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
    /// Deployment secret. Sessions are out of scope so nothing derives from
    /// it yet, but it is loaded and checked so the default can't slip into
    /// production unnoticed.
    pub secret_key: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Self {
        let database_path = match std::env::var("DATABASE_URL") {
            Ok(url) => parse_database_url(&url),
            Err(_) => {
                tracing::warn!(
                    "DATABASE_URL not set — using local {DEFAULT_DATABASE} (development only)"
                );
                PathBuf::from(DEFAULT_DATABASE)
            }
        };

        let secret_key =
            std::env::var("SECRET_KEY").unwrap_or_else(|_| DEFAULT_SECRET_KEY.to_string());

        Self {
            database_path,
            secret_key,
        }
    }
}

/// Accepts `sqlite://path`, `sqlite:path`, or a bare filesystem path.
/// This build is SQLite-only; anything else is treated as a path.
fn parse_database_url(url: &str) -> PathBuf {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    PathBuf::from(path)
}
